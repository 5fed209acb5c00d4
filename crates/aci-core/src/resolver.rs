// ── Provider resolution ──
//
// The engine names a provider; something outside the core knows where that
// provider's endpoint and credentials live (a config file, a secret store).
// `ProviderResolver` is that seam. Every failure here ends up as
// `CoreError::Configuration`.

use std::collections::HashMap;
use std::future::Future;

use serde::Deserialize;
use thiserror::Error;

use aci_api::Credentials;

use crate::config::ProviderConfig;
use crate::error::CoreError;

/// Why a provider could not be resolved.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("provider '{name}' not found")]
    ProviderNotFound { name: String },

    #[error("no credentials for provider '{name}'")]
    CredentialsNotFound { name: String },

    #[error("invalid credentials secret: {reason}")]
    InvalidSecret { reason: String },

    #[error("{0}")]
    Other(String),
}

impl From<ResolveError> for CoreError {
    fn from(err: ResolveError) -> Self {
        CoreError::Configuration {
            message: err.to_string(),
        }
    }
}

/// Looks up endpoint configuration and credentials for a named provider.
pub trait ProviderResolver: Send + Sync {
    fn provider_config(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<ProviderConfig, ResolveError>> + Send;

    fn credentials(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Credentials, ResolveError>> + Send;
}

// ── In-memory resolver ───────────────────────────────────────────────

/// Resolver over a fixed set of providers.
#[derive(Debug, Default, Clone)]
pub struct StaticResolver {
    providers: HashMap<String, (ProviderConfig, Credentials)>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_provider(
        mut self,
        name: impl Into<String>,
        config: ProviderConfig,
        credentials: Credentials,
    ) -> Self {
        self.providers.insert(name.into(), (config, credentials));
        self
    }
}

impl ProviderResolver for StaticResolver {
    async fn provider_config(&self, name: &str) -> Result<ProviderConfig, ResolveError> {
        self.providers
            .get(name)
            .map(|(config, _)| config.clone())
            .ok_or_else(|| ResolveError::ProviderNotFound { name: name.into() })
    }

    async fn credentials(&self, name: &str) -> Result<Credentials, ResolveError> {
        self.providers
            .get(name)
            .map(|(_, creds)| creds.clone())
            .ok_or_else(|| ResolveError::CredentialsNotFound { name: name.into() })
    }
}

// ── Credential secrets ───────────────────────────────────────────────

#[derive(Deserialize)]
struct SecretBlob {
    username: String,
    password: String,
}

/// Parse a `{"username": "...", "password": "..."}` secret blob.
pub fn parse_credentials_secret(data: &[u8]) -> Result<Credentials, ResolveError> {
    let blob: SecretBlob =
        serde_json::from_slice(data).map_err(|e| ResolveError::InvalidSecret {
            reason: e.to_string(),
        })?;

    if blob.username.is_empty() {
        return Err(ResolveError::InvalidSecret {
            reason: "username is empty".into(),
        });
    }

    Ok(Credentials::new(blob.username, blob.password))
}
