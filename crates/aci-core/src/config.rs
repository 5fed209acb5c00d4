// ── Runtime provider configuration ──
//
// These types describe *how* to reach an APIC. They carry endpoint and
// connection tuning, but never touch disk. Callers (the CLI, a resolver
// backed by a secret store) construct a `ProviderConfig` and hand it in.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use aci_api::transport::{TlsMode, TransportConfig};

/// TLS verification strategy.
///
/// Certificate validation is on unless the caller explicitly opts out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed fabric controllers).
    DangerAcceptInvalid,
}

/// Endpoint configuration for one APIC.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderConfig {
    /// Controller base URL (e.g., `https://apic.example.net`).
    pub url: Url,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ProviderConfig {
    /// Strict TLS and a 30 second timeout.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Opt in to skipping certificate verification.
    pub fn insecure_skip_verify(mut self, skip: bool) -> Self {
        if skip {
            self.tls = TlsVerification::DangerAcceptInvalid;
        }
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn skips_tls_verification(&self) -> bool {
        self.tls == TlsVerification::DangerAcceptInvalid
    }

    pub(crate) fn transport_config(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.timeout,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn verification_is_on_by_default() {
        let config = ProviderConfig::new(Url::parse("https://apic.example.net").unwrap());
        assert!(!config.skips_tls_verification());
        assert!(!config.insecure_skip_verify(false).skips_tls_verification());
    }

    #[test]
    fn explicit_opt_out() {
        let config = ProviderConfig::new(Url::parse("https://apic.example.net").unwrap())
            .insecure_skip_verify(true);
        assert!(config.skips_tls_verification());
        assert!(matches!(
            config.transport_config().tls,
            TlsMode::DangerAcceptInvalid
        ));
    }
}
