//! EPG command handlers.

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use aci_core::{EndpointGroup, EpgExternal, ExternalClient, Observation};

use crate::cli::{EpgArgs, EpgCommand, GlobalOpts};
use crate::commands::util;
use crate::error::CliError;
use crate::output;

// ── Reports ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ObserveReport {
    dn: String,
    exists: bool,
    up_to_date: bool,
    description: Option<String>,
    bridge_domain: Option<String>,
}

impl ObserveReport {
    fn state(&self) -> &'static str {
        match (self.exists, self.up_to_date) {
            (false, _) => "absent",
            (true, false) => "drifted",
            (true, true) => "in-sync",
        }
    }
}

/// What a mutating command did.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
enum Action {
    Created,
    Updated,
    Deleted,
    Unchanged,
}

impl Action {
    fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::Unchanged => "unchanged",
        }
    }
}

#[derive(Debug, Serialize)]
struct ActionReport {
    dn: String,
    action: Action,
}

fn print_action(desired: &EndpointGroup, action: Action, global: &GlobalOpts) -> Result<(), CliError> {
    let report = ActionReport {
        dn: desired.address().dn(),
        action,
    };
    let out = output::render_single(
        global.output,
        &report,
        |r| format!("{} {}", r.dn, r.action.as_str()),
        |r| r.action.as_str().to_owned(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    args: EpgArgs,
    external: &EpgExternal,
    global: &GlobalOpts,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    match args.command {
        EpgCommand::Observe(spec) => observe(&spec.to_record(), external, global, cancel).await,

        EpgCommand::Create(spec) => {
            let desired = spec.to_record();
            external.create(&desired, cancel).await?;
            print_action(&desired, Action::Created, global)
        }

        EpgCommand::Update(spec) => {
            let desired = spec.to_record();
            external.update(&desired, cancel).await?;
            print_action(&desired, Action::Updated, global)
        }

        EpgCommand::Delete(target) => {
            let desired = target.to_record();
            let dn = desired.address().dn();
            if !util::confirm(&format!("Delete EPG {dn}?"), global.yes)? {
                return Ok(());
            }
            external.delete(&desired, cancel).await?;
            print_action(&desired, Action::Deleted, global)
        }

        EpgCommand::Sync(spec) => {
            let desired = spec.to_record();
            let action = sync(&desired, external, cancel).await?;
            print_action(&desired, action, global)
        }
    }
}

async fn observe(
    desired: &EndpointGroup,
    external: &EpgExternal,
    global: &GlobalOpts,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    let (observation, observed) = external.observe_detailed(desired, cancel).await?;

    let report = ObserveReport {
        dn: desired.address().dn(),
        exists: observation.resource_exists,
        up_to_date: observation.resource_up_to_date,
        description: observed.description().map(str::to_owned),
        bridge_domain: observed.bridge_domain().map(str::to_owned),
    };

    let out = output::render_single(
        global.output,
        &report,
        |r| {
            output::detail_lines(&[
                ("dn", r.dn.clone()),
                ("state", r.state().to_owned()),
                ("description", r.description.clone().unwrap_or_default()),
                ("bridge domain", r.bridge_domain.clone().unwrap_or_default()),
            ])
        },
        |r| r.state().to_owned(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

/// One reconcile pass: observe, then create or update as needed.
async fn sync(
    desired: &EndpointGroup,
    external: &EpgExternal,
    cancel: &CancellationToken,
) -> Result<Action, CliError> {
    let action = match external.observe(desired, cancel).await? {
        Observation {
            resource_exists: false,
            ..
        } => {
            external.create(desired, cancel).await?;
            Action::Created
        }
        Observation {
            resource_up_to_date: false,
            ..
        } => {
            external.update(desired, cancel).await?;
            Action::Updated
        }
        _ => Action::Unchanged,
    };
    info!(dn = %desired.address(), action = action.as_str(), "sync complete");
    Ok(action)
}
