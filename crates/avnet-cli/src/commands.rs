//! Dispatch of parsed commands to the backend and the session controller.

use std::ffi::OsString;
use std::io::Write;

use avnet_binaries::build_client;
use avnet_config::{AppPaths, Config};

use crate::AppError;
use crate::cli::{BackendAction, CliCommand, NetworkAction};
use crate::gateway::GatewayClient;
use crate::output::CommandOutput;
use crate::session::{SessionController, SessionTiming, SystemProvisioner};
use crate::supervisor::SystemSupervisor;

/// Inputs shared by every command.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CommandContext<'a> {
    pub(crate) config: &'a Config,
    /// Configuration flags as given, forwarded to a spawned backend.
    pub(crate) config_arguments: &'a [OsString],
}

pub(crate) fn execute<W: Write, E: Write>(
    command: CliCommand,
    context: CommandContext<'_>,
    output: &mut CommandOutput<W, E>,
) -> Result<(), AppError> {
    match command {
        CliCommand::Backend {
            action: BackendAction::Start,
        } => avnet_backend::run(context.config).map_err(AppError::from),
        CliCommand::Network { action } => execute_network(action, context, output),
    }
}

fn execute_network<W: Write, E: Write>(
    action: NetworkAction,
    context: CommandContext<'_>,
    output: &mut CommandOutput<W, E>,
) -> Result<(), AppError> {
    let config = context.config;
    let paths = AppPaths::from_config(config)?;
    let control =
        GatewayClient::new(config.gateway_endpoint().clone()).map_err(AppError::Gateway)?;
    let supervisor =
        SystemSupervisor::for_current_exe(context.config_arguments.to_vec(), paths.run_file())?;
    let provisioner = SystemProvisioner::new(
        build_client()?,
        &paths,
        config.bootstrap_snapshot_url.clone(),
        config.binary_server_url.clone(),
    );
    let controller = SessionController::new(
        &control,
        &supervisor,
        &provisioner,
        &paths,
        SessionTiming::from_config(config),
    );

    match action {
        NetworkAction::Start {
            snapshot_name,
            avalanchego_version,
            plugins,
        } => controller
            .start(&snapshot_name, &avalanchego_version, &plugins, output)
            .map(drop)?,
        NetworkAction::Stop {
            snapshot_name,
            dont_save,
        } => controller.stop_network(&snapshot_name, !dont_save, output)?,
        NetworkAction::Clean { hard } => controller.clean(hard, output)?,
    }
    Ok(())
}
