//! Clap derive structures for the `aci` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

use aci_core::EndpointGroup;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// aci -- converge ACI endpoint groups against an APIC
#[derive(Debug, Parser)]
#[command(
    name = "aci",
    version,
    about = "Keep ACI endpoint groups in sync with an APIC",
    long_about = "Observe, create, update and delete application EPGs on a Cisco APIC.\n\n\
        `aci epg sync` runs one reconcile pass: observe, then create or update\n\
        until the remote object matches the declared one.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Controller profile to use
    #[arg(long, short = 'p', env = "ACI_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Controller URL (overrides profile)
    #[arg(long, short = 'c', env = "ACI_CONTROLLER", global = true)]
    pub controller: Option<String>,

    /// Login user (overrides profile)
    #[arg(long, short = 'u', env = "ACI_USERNAME", global = true)]
    pub username: Option<String>,

    /// Login password
    #[arg(long, env = "ACI_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "ACI_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "ACI_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "ACI_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage application endpoint groups
    #[command(alias = "e")]
    Epg(EpgArgs),

    /// Verify credentials by opening and closing a session
    Login,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  EPG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct EpgArgs {
    #[command(subcommand)]
    pub command: EpgCommand,
}

#[derive(Debug, Subcommand)]
pub enum EpgCommand {
    /// Report whether the EPG exists and matches the declared fields
    #[command(alias = "get")]
    Observe(EpgSpec),

    /// Create the EPG (merges into an existing one)
    Create(EpgSpec),

    /// Push description and bridge domain to an existing EPG
    Update(EpgSpec),

    /// Delete the EPG (succeeds if already gone)
    #[command(alias = "rm")]
    Delete(EpgTarget),

    /// Observe, then create or update as needed
    Sync(EpgSpec),
}

/// Identity of an EPG.
#[derive(Debug, Args)]
pub struct EpgTarget {
    /// Tenant name
    #[arg(long, short = 't')]
    pub tenant: String,

    /// Application profile name
    #[arg(long, short = 'a')]
    pub app_profile: String,

    /// EPG name
    pub name: String,
}

/// Declared EPG: identity plus mutable fields.
#[derive(Debug, Args)]
pub struct EpgSpec {
    #[command(flatten)]
    pub target: EpgTarget,

    /// Bridge domain to bind
    #[arg(long, default_value = "")]
    pub bd: String,

    /// Description
    #[arg(long, short = 'd', default_value = "")]
    pub desc: String,
}

impl EpgTarget {
    /// Record with empty mutable fields, enough to address the object.
    pub fn to_record(&self) -> EndpointGroup {
        EndpointGroup {
            tenant: self.tenant.clone(),
            app_profile: self.app_profile.clone(),
            name: self.name.clone(),
            bridge_domain: String::new(),
            description: String::new(),
        }
    }
}

impl EpgSpec {
    pub fn to_record(&self) -> EndpointGroup {
        EndpointGroup {
            bridge_domain: self.bd.clone(),
            description: self.desc.clone(),
            ..self.target.to_record()
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Display current configuration (secrets masked)
    Show,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store the active profile's password in the system keyring
    SetPassword,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: clap_complete::Shell,
}
