// ── Connector ──
//
// Turns a provider name into a ready `EpgExternal`. Sessions are pooled per
// (provider config, username) so that repeated connects against the same
// fabric share one login. The key covers TLS mode and timeout, so two
// providers that differ in either never share a transport. A pooled session
// is only reused while its password still matches what the resolver returns.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info};

use aci_api::{ApicClient, SessionManager, Transport};

use crate::config::ProviderConfig;
use crate::error::CoreError;
use crate::external::EpgExternal;
use crate::resolver::ProviderResolver;

type PoolKey = (ProviderConfig, String);

/// Builds `EpgExternal` clients from resolved providers.
pub struct Connector<R> {
    resolver: R,
    sessions: DashMap<PoolKey, Arc<SessionManager>>,
}

impl<R: ProviderResolver> Connector<R> {
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            sessions: DashMap::new(),
        }
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Number of sessions currently pooled.
    pub fn pooled_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Resolve `provider` and return a client bound to its session.
    ///
    /// No remote call is made; login happens lazily on first use.
    pub async fn connect(&self, provider: &str) -> Result<EpgExternal, CoreError> {
        let config = self.resolver.provider_config(provider).await?;
        let credentials = self.resolver.credentials(provider).await?;

        let key = (config.clone(), credentials.username.clone());

        if let Some(existing) = self.sessions.get(&key) {
            if existing.credentials().same_as(&credentials) {
                debug!(provider, url = %config.url, "reusing pooled session");
                return Ok(EpgExternal::new(ApicClient::new(Arc::clone(&existing))));
            }
        }

        let transport =
            Transport::new(config.url.clone(), &config.transport_config()).map_err(|e| {
                CoreError::Configuration {
                    message: format!("cannot build client for '{provider}': {e}"),
                }
            })?;
        let session = Arc::new(SessionManager::new(transport, credentials));

        if config.skips_tls_verification() {
            info!(provider, url = %config.url, "TLS verification disabled for provider");
        }
        debug!(provider, url = %config.url, "pooling new session");
        self.sessions.insert(key, Arc::clone(&session));

        Ok(EpgExternal::new(ApicClient::new(session)))
    }

    /// Drop every pooled session.
    pub fn clear(&self) {
        self.sessions.clear();
    }
}
