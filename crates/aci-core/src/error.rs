// ── Core error types ──
//
// What the reconciliation engine sees. Classification is the whole point:
// the engine decides whether to requeue based on `CoreError::class()`.
// The `From<aci_api::Error>` impl translates transport-layer errors into
// these variants without losing fault codes.

use strum::{Display, IntoStaticStr};
use thiserror::Error;

use aci_api::ErrorKind;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    // ── Remote errors ────────────────────────────────────────────────
    #[error("Authentication expired: {message}")]
    AuthExpired { message: String },

    #[error("Managed object not found: {path}")]
    NotFound { path: String },

    #[error("APIC fault {code}: {text}")]
    ApiFault { code: String, text: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Transport error: {source}")]
    Transport {
        #[source]
        source: aci_api::Error,
    },

    #[error("Malformed response: {message}")]
    Serialization { message: String },
}

/// Classification consumed by the reconciliation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorClass {
    Configuration,
    NotFound,
    AuthExpired,
    ApiFault,
    Transport,
    Serialization,
}

impl CoreError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Configuration { .. } => ErrorClass::Configuration,
            Self::AuthExpired { .. } => ErrorClass::AuthExpired,
            Self::NotFound { .. } => ErrorClass::NotFound,
            Self::ApiFault { .. } => ErrorClass::ApiFault,
            Self::Cancelled | Self::Transport { .. } => ErrorClass::Transport,
            Self::Serialization { .. } => ErrorClass::Serialization,
        }
    }

    /// Returns `true` if retrying later may succeed without operator action.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { source } => source.is_transient(),
            _ => false,
        }
    }

    /// The configured timeout, if the request gave up waiting for the controller.
    pub fn timeout_secs(&self) -> Option<u64> {
        match self {
            Self::Transport {
                source: aci_api::Error::Timeout { timeout_secs },
            } => Some(*timeout_secs),
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<aci_api::Error> for CoreError {
    fn from(err: aci_api::Error) -> Self {
        match err {
            aci_api::Error::AuthExpired { message } => CoreError::AuthExpired { message },
            aci_api::Error::NotFound { path } => CoreError::NotFound { path },
            aci_api::Error::ApiFault { code, text } => CoreError::ApiFault { code, text },
            aci_api::Error::Cancelled => CoreError::Cancelled,
            aci_api::Error::Deserialization { message, .. } => {
                CoreError::Serialization { message }
            }
            aci_api::Error::Encode(e) => CoreError::Serialization {
                message: e.to_string(),
            },
            other => {
                debug_assert_eq!(other.kind(), ErrorKind::Transport);
                CoreError::Transport { source: other }
            }
        }
    }
}
