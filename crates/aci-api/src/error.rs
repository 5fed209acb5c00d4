use thiserror::Error;

/// Top-level error type for the `aci-api` crate.
///
/// Every failure mode of the APIC REST surface lands in one of these
/// variants. [`Error::kind`] collapses them into the five classes the
/// convergence layer reasons about.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login was rejected, the login response carried no usable token,
    /// or a renewed session was rejected again.
    #[error("Authentication expired: {message}")]
    AuthExpired { message: String },

    // ── Remote semantics ────────────────────────────────────────────
    /// The addressed managed object does not exist (HTTP 404).
    #[error("Managed object not found: {path}")]
    NotFound { path: String },

    /// Fault reported inline in the `imdata` envelope. APIC does this
    /// even on HTTP 200, so the body is always inspected.
    #[error("APIC fault {code}: {text}")]
    ApiFault { code: String, text: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success status without a fault body.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The caller cancelled the operation while a call was in flight.
    #[error("Request cancelled")]
    Cancelled,

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Data ────────────────────────────────────────────────────────
    /// Response body could not be decoded, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// Request payload could not be encoded.
    #[error("Failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AuthExpired,
    ApiFault,
    Transport,
    Serialization,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AuthExpired { .. } => ErrorKind::AuthExpired,
            Self::ApiFault { .. } => ErrorKind::ApiFault,
            Self::Transport(_)
            | Self::Status { .. }
            | Self::Timeout { .. }
            | Self::Cancelled
            | Self::InvalidUrl(_)
            | Self::Tls(_) => ErrorKind::Transport,
            Self::Deserialization { .. } | Self::Encode(_) => ErrorKind::Serialization,
        }
    }

    /// Returns `true` if the session could not be (re-)established.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthExpired { .. })
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// The APIC fault code, if this error carries one.
    pub fn fault_code(&self) -> Option<&str> {
        match self {
            Self::ApiFault { code, .. } => Some(code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_every_variant() {
        assert_eq!(
            Error::NotFound { path: "/x".into() }.kind(),
            ErrorKind::NotFound
        );
        assert_eq!(Error::Cancelled.kind(), ErrorKind::Transport);
        assert_eq!(
            Error::Status {
                status: 500,
                body: String::new()
            }
            .kind(),
            ErrorKind::Transport
        );
        assert_eq!(
            Error::Deserialization {
                message: "eof".into(),
                body: String::new()
            }
            .kind(),
            ErrorKind::Serialization
        );
    }

    #[test]
    fn fault_code_only_for_faults() {
        let fault = Error::ApiFault {
            code: "103".into(),
            text: "already exists".into(),
        };
        assert_eq!(fault.fault_code(), Some("103"));
        assert!(Error::Cancelled.fault_code().is_none());
    }

    #[test]
    fn server_errors_are_transient() {
        let err = Error::Status {
            status: 503,
            body: "busy".into(),
        };
        assert!(err.is_transient());
        assert!(
            !Error::Status {
                status: 400,
                body: String::new()
            }
            .is_transient()
        );
    }
}
