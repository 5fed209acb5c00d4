//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use aci_config::ConfigError;
use aci_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const API_FAULT: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const CANCELLED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the controller")]
    #[diagnostic(
        code(aci::connection_failed),
        help(
            "Check that the APIC is reachable from this host.\n\
             Self-signed certificate? Use --insecure (-k) or set ca_cert in your profile."
        )
    )]
    ConnectionFailed {
        #[source]
        source: CoreError,
    },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(aci::timeout),
        help("Increase timeout with --timeout or check controller responsiveness.")
    )]
    Timeout { seconds: u64 },

    #[error("Interrupted")]
    #[diagnostic(code(aci::cancelled))]
    Cancelled,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(aci::auth_failed),
        help(
            "Verify the username and password for this controller.\n\
             Run: aci config set-password --profile <name>"
        )
    )]
    AuthFailed { message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(aci::no_credentials),
        help(
            "Pass --username and --password, set ACI_USERNAME / ACI_PASSWORD,\n\
             or configure the profile in the config file."
        )
    )]
    NoCredentials { profile: String },

    // ── Remote ───────────────────────────────────────────────────────
    #[error("Not found: {path}")]
    #[diagnostic(code(aci::not_found))]
    NotFound { path: String },

    #[error("APIC fault ({code}): {text}")]
    #[diagnostic(code(aci::api_fault))]
    ApiFault { code: String, text: String },

    #[error("Unexpected response from controller: {message}")]
    #[diagnostic(
        code(aci::malformed_response),
        help("The URL may point at something other than an APIC REST endpoint.")
    )]
    MalformedResponse { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(aci::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(aci::profile_not_found),
        help("Available profiles: {available}")
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No controller configured")]
    #[diagnostic(
        code(aci::no_config),
        help(
            "Pass --controller (-c) or create a profile in the config file.\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(aci::config))]
    Configuration { message: String },

    #[error(transparent)]
    #[diagnostic(code(aci::config))]
    Config(Box<ConfigError>),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(aci::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(aci::json))]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    #[diagnostic(code(aci::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Cancelled => exit_code::CANCELLED,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::ApiFault { .. } => exit_code::API_FAULT,
            Self::Validation { .. }
            | Self::NonInteractiveRequiresYes { .. }
            | Self::ProfileNotFound { .. }
            | Self::NoConfig { .. }
            | Self::Configuration { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        if let Some(seconds) = err.timeout_secs() {
            return CliError::Timeout { seconds };
        }
        match err {
            CoreError::Configuration { message } => CliError::Configuration { message },
            CoreError::AuthExpired { message } => CliError::AuthFailed { message },
            CoreError::NotFound { path } => CliError::NotFound { path },
            CoreError::ApiFault { code, text } => CliError::ApiFault { code, text },
            CoreError::Cancelled => CliError::Cancelled,
            CoreError::Serialization { message } => CliError::MalformedResponse { message },
            transport @ CoreError::Transport { .. } => CliError::ConnectionFailed { source: transport },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                name,
                available: String::new(),
            },
            other => CliError::Config(Box::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_keeps_code_and_exit_code() {
        let err = CliError::from(CoreError::ApiFault {
            code: "400".into(),
            text: "bad request".into(),
        });
        assert_eq!(err.exit_code(), exit_code::API_FAULT);
        assert_eq!(err.to_string(), "APIC fault (400): bad request");
    }

    #[test]
    fn auth_and_config_exit_codes() {
        let auth = CliError::from(CoreError::AuthExpired {
            message: "rejected".into(),
        });
        assert_eq!(auth.exit_code(), exit_code::AUTH);

        let config = CliError::from(CoreError::Configuration {
            message: "provider 'x' not found".into(),
        });
        assert_eq!(config.exit_code(), exit_code::USAGE);

        assert_eq!(CliError::from(CoreError::Cancelled).exit_code(), exit_code::CANCELLED);
    }
}
