//! Command handlers.

pub mod config_cmd;
pub mod epg;
pub mod util;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use aci_core::{CoreError, EpgExternal};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;
use crate::output;

/// Dispatch a controller-bound command.
pub async fn dispatch(
    cmd: Command,
    external: &EpgExternal,
    global: &GlobalOpts,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    match cmd {
        Command::Epg(args) => epg::handle(args, external, global, cancel).await,
        Command::Login => login(external, global, cancel).await,
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}

#[derive(Serialize)]
struct LoginReport {
    controller: String,
    username: String,
    generation: u64,
    acquired_at: String,
}

async fn login(
    external: &EpgExternal,
    global: &GlobalOpts,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    let manager = external.client().session();
    let session = manager
        .ensure_authenticated(cancel)
        .await
        .map_err(CoreError::from)?;

    let report = LoginReport {
        controller: manager.transport().base_url().to_string(),
        username: manager.credentials().username.clone(),
        generation: session.generation(),
        acquired_at: session.acquired_at().to_rfc3339(),
    };

    manager.logout(cancel).await.map_err(CoreError::from)?;

    let out = output::render_single(
        global.output,
        &report,
        |r| {
            output::detail_lines(&[
                ("controller", r.controller.clone()),
                ("username", r.username.clone()),
                ("session", "ok".into()),
                ("acquired at", r.acquired_at.clone()),
            ])
        },
        |r| r.username.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
