//! Profile configuration for ACI tooling.
//!
//! TOML profiles merged with `ACI_` environment overrides, credential
//! resolution (credentials file, env, keyring, plaintext), and translation
//! to `aci_core::ProviderConfig`. `Config` also implements
//! [`ProviderResolver`], so a profile name can be handed straight to a
//! `Connector`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use aci_core::{
    Credentials, ProviderConfig, ProviderResolver, ResolveError, TlsVerification,
    parse_credentials_secret,
};

const KEYRING_SERVICE: &str = "aci";
const PASSWORD_ENV: &str = "ACI_PASSWORD";
const USERNAME_ENV: &str = "ACI_USERNAME";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    UnknownProfile { name: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to read credentials file {path}: {reason}")]
    CredentialsFile { path: PathBuf, reason: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl From<ConfigError> for ResolveError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::UnknownProfile { name } => ResolveError::ProviderNotFound { name },
            ConfigError::NoCredentials { profile } => {
                ResolveError::CredentialsNotFound { name: profile }
            }
            ConfigError::CredentialsFile { reason, .. } => ResolveError::InvalidSecret { reason },
            other => ResolveError::Other(other.to_string()),
        }
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named controller profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Name of the profile to use when none is given.
    pub fn default_profile_name(&self) -> &str {
        self.default_profile.as_deref().unwrap_or("default")
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named APIC profile.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Controller base URL (e.g., "https://apic.example.net").
    pub controller: String,

    /// Login user.
    pub username: Option<String>,

    /// Password (plaintext, prefer keyring or a credentials file).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// JSON file holding `{"username": ..., "password": ...}`.
    pub credentials_file: Option<PathBuf>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Skip certificate verification.
    pub insecure: Option<bool>,

    /// Per-request timeout in seconds.
    pub timeout: Option<u64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("net", "aci-sync", "aci").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("aci");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config from `path` + environment.
///
/// Nested keys are addressed with a double underscore, e.g.
/// `ACI_PROFILES__LAB__CONTROLLER`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("ACI_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Store a profile's password in the system keyring.
pub fn store_keyring_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))?;
    entry.set_password(password)?;
    Ok(())
}

fn keyring_password(profile_name: &str) -> Option<String> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))
        .ok()?
        .get_password()
        .ok()
}

/// Read a `{"username", "password"}` credentials file.
pub fn read_credentials_file(path: &Path) -> Result<Credentials, ConfigError> {
    let data = std::fs::read(path).map_err(|e| ConfigError::CredentialsFile {
        path: path.to_owned(),
        reason: e.to_string(),
    })?;
    parse_credentials_secret(&data).map_err(|e| ConfigError::CredentialsFile {
        path: path.to_owned(),
        reason: e.to_string(),
    })
}

/// Resolve credentials for a profile.
///
/// Order: credentials file, `password_env`, `ACI_PASSWORD`, keyring,
/// plaintext. The username comes from the profile or `ACI_USERNAME`.
pub fn resolve_credentials(profile: &Profile, profile_name: &str) -> Result<Credentials, ConfigError> {
    resolve_credentials_with(
        profile,
        profile_name,
        |name| std::env::var(name).ok(),
        keyring_password,
    )
}

fn resolve_credentials_with(
    profile: &Profile,
    profile_name: &str,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl Fn(&str) -> Option<String>,
) -> Result<Credentials, ConfigError> {
    // 1. Credentials file carries both halves
    if let Some(ref path) = profile.credentials_file {
        debug!(profile = profile_name, path = %path.display(), "using credentials file");
        return read_credentials_file(path);
    }

    let username = profile
        .username
        .clone()
        .or_else(|| env(USERNAME_ENV))
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })?;

    // 2. Profile's password_env
    if let Some(pw) = profile.password_env.as_deref().and_then(&env) {
        return Ok(Credentials::new(username, pw));
    }

    // 3. Global env var
    if let Some(pw) = env(PASSWORD_ENV) {
        return Ok(Credentials::new(username, pw));
    }

    // 4. Keyring
    if let Some(pw) = keyring(profile_name) {
        return Ok(Credentials::new(username, pw));
    }

    // 5. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(Credentials::new(username, pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Build a `ProviderConfig` from a profile, falling back to `defaults`.
pub fn profile_to_provider_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<ProviderConfig, ConfigError> {
    let url: url::Url = profile
        .controller
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "controller".into(),
            reason: format!("invalid URL: {}", profile.controller),
        })?;

    let mut config = ProviderConfig::new(url).with_timeout(Duration::from_secs(
        profile.timeout.unwrap_or(defaults.timeout),
    ));

    if profile.insecure.unwrap_or(defaults.insecure) {
        config.tls = TlsVerification::DangerAcceptInvalid;
    } else if let Some(ref ca_path) = profile.ca_cert {
        config.tls = TlsVerification::CustomCa(ca_path.clone());
    }

    Ok(config)
}

// ── Resolver ────────────────────────────────────────────────────────

impl ProviderResolver for Config {
    async fn provider_config(&self, name: &str) -> Result<ProviderConfig, ResolveError> {
        let profile = self.profile(name)?;
        Ok(profile_to_provider_config(profile, &self.defaults)?)
    }

    async fn credentials(&self, name: &str) -> Result<Credentials, ResolveError> {
        let profile = self.profile(name)?;
        let creds = resolve_credentials(profile, name)?;
        if creds.password.expose_secret().is_empty() {
            return Err(ResolveError::InvalidSecret {
                reason: format!("empty password for profile '{name}'"),
            });
        }
        Ok(creds)
    }
}
