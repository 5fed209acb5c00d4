//! CLI configuration: thin wrapper around `aci_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--controller, --username, --password, --insecure, --timeout) and
//! produces a connected `EpgExternal` through the core `Connector`.

use std::time::Duration;

use aci_core::{
    Connector, Credentials, EpgExternal, ProviderConfig, StaticResolver, TlsVerification,
};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use aci_config::{Config, Profile, config_path, load_config_or_default, save_config};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .unwrap_or_else(|| config.default_profile_name().to_owned())
}

fn parse_url(raw: &str) -> Result<url::Url, CliError> {
    raw.parse().map_err(|_| CliError::Validation {
        field: "controller".into(),
        reason: format!("invalid URL: {raw}"),
    })
}

/// Translate a profile + global flags into provider config and credentials.
///
/// CLI flag overrides take priority over profile values.
pub fn resolve_profile(
    config: &Config,
    profile: &Profile,
    profile_name: &str,
    global: &GlobalOpts,
) -> Result<(ProviderConfig, Credentials), CliError> {
    let mut provider = aci_config::profile_to_provider_config(profile, &config.defaults)?;

    if let Some(ref url) = global.controller {
        provider.url = parse_url(url)?;
    }
    if global.insecure {
        provider.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        provider.timeout = Duration::from_secs(secs);
    }

    let credentials = match (&global.username, &global.password) {
        (Some(user), Some(pw)) => Credentials::new(user.clone(), pw.clone()),
        _ => {
            let mut creds = aci_config::resolve_credentials(profile, profile_name)?;
            if let Some(ref user) = global.username {
                creds.username.clone_from(user);
            }
            if let Some(ref pw) = global.password {
                creds = Credentials::new(creds.username, pw.clone());
            }
            creds
        }
    };

    Ok((provider, credentials))
}

/// Build provider config and credentials from flags alone.
fn resolve_flags(
    config: &Config,
    profile_name: &str,
    global: &GlobalOpts,
) -> Result<(ProviderConfig, Credentials), CliError> {
    let url_str = global.controller.as_deref().ok_or_else(|| {
        if let Some(name) = &global.profile {
            let mut available: Vec<_> = config.profiles.keys().cloned().collect();
            available.sort();
            CliError::ProfileNotFound {
                name: name.clone(),
                available: available.join(", "),
            }
        } else {
            CliError::NoConfig {
                path: config_path().display().to_string(),
            }
        }
    })?;

    let provider = ProviderConfig::new(parse_url(url_str)?)
        .insecure_skip_verify(global.insecure || config.defaults.insecure)
        .with_timeout(Duration::from_secs(
            global.timeout.unwrap_or(config.defaults.timeout),
        ));

    let (Some(user), Some(pw)) = (&global.username, &global.password) else {
        return Err(CliError::NoCredentials {
            profile: profile_name.into(),
        });
    };

    Ok((provider, Credentials::new(user.clone(), pw.clone())))
}

/// Resolve the active profile and connect through the core `Connector`.
pub async fn connect(global: &GlobalOpts) -> Result<EpgExternal, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let (provider, credentials) = match cfg.profiles.get(&profile_name) {
        Some(profile) => resolve_profile(&cfg, profile, &profile_name, global)?,
        None => resolve_flags(&cfg, &profile_name, global)?,
    };

    tracing::debug!(
        profile = %profile_name,
        url = %provider.url,
        username = %credentials.username,
        "resolved provider"
    );

    let resolver = StaticResolver::new().with_provider(&profile_name, provider, credentials);
    let connector = Connector::new(resolver);
    Ok(connector.connect(&profile_name).await?)
}
