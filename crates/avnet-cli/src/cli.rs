//! CLI argument definitions for `avnet`.

use clap::{Parser, Subcommand};

use avnet_config::DEFAULT_SNAPSHOT_NAME;

use crate::session::LATEST_VERSION;
use crate::telemetry::TelemetryMode;

/// Manages a local Avalanche network backed by the network runner.
#[derive(Parser, Debug)]
#[command(name = "avnet", disable_help_subcommand = true)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum CliCommand {
    /// Starts, stops and cleans the local network.
    Network {
        #[command(subcommand)]
        action: NetworkAction,
    },
    /// Runs the network-runner backend in the foreground.
    #[command(hide = true)]
    Backend {
        #[command(subcommand)]
        action: BackendAction,
    },
}

impl CliCommand {
    /// Logging profile for the process running this command.
    pub(crate) const fn telemetry_mode(&self) -> TelemetryMode {
        match self {
            Self::Network { .. } => TelemetryMode::Command,
            Self::Backend { .. } => TelemetryMode::Backend,
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum NetworkAction {
    /// Starts the local network from a snapshot, or fresh when none exists.
    Start {
        /// Snapshot to load.
        #[arg(default_value = DEFAULT_SNAPSHOT_NAME)]
        snapshot_name: String,
        /// Avalanchego release to run, for example `v1.10.3`.
        #[arg(long, default_value = LATEST_VERSION)]
        avalanchego_version: String,
        /// VM plugin to fetch from the binary server before booting.
        #[arg(long = "plugin", value_name = "VMID")]
        plugins: Vec<String>,
    },
    /// Stops the local network, saving its state unless told otherwise.
    Stop {
        /// Snapshot receiving the network state.
        #[arg(default_value = DEFAULT_SNAPSHOT_NAME)]
        snapshot_name: String,
        /// Discards the network state instead of saving it.
        #[arg(long)]
        dont_save: bool,
    },
    /// Stops everything and deletes snapshots and run state.
    Clean {
        /// Also deletes downloaded binaries and kills stray backends.
        #[arg(long)]
        hard: bool,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BackendAction {
    /// Launches the runner and waits for a termination signal.
    Start,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("avnet").chain(args.iter().copied()))
            .expect("arguments parse")
    }

    #[test]
    fn start_defaults_to_the_default_snapshot_and_latest_release() {
        let cli = parse(&["network", "start"]);
        let CliCommand::Network { action } = cli.command else {
            panic!("expected network command");
        };
        assert_eq!(
            action,
            NetworkAction::Start {
                snapshot_name: String::from("default"),
                avalanchego_version: String::from("latest"),
                plugins: Vec::new(),
            }
        );
    }

    #[test]
    fn plugins_may_be_repeated() {
        let CliCommand::Network { action } =
            parse(&["network", "start", "--plugin", "srEXiWaH", "--plugin", "tGas3T58"]).command
        else {
            panic!("expected network command");
        };
        let NetworkAction::Start { plugins, .. } = action else {
            panic!("expected start");
        };
        assert_eq!(plugins, vec!["srEXiWaH", "tGas3T58"]);
    }

    #[rstest]
    #[case(&["network", "stop"], "default", false)]
    #[case(&["network", "stop", "demo"], "demo", false)]
    #[case(&["network", "stop", "demo", "--dont-save"], "demo", true)]
    fn stop_arguments(#[case] args: &[&str], #[case] name: &str, #[case] discard: bool) {
        let CliCommand::Network { action } = parse(args).command else {
            panic!("expected network command");
        };
        assert_eq!(
            action,
            NetworkAction::Stop {
                snapshot_name: name.to_owned(),
                dont_save: discard,
            }
        );
    }

    #[test]
    fn backend_start_parses_while_hidden() {
        let cli = parse(&["backend", "start"]);
        assert!(matches!(
            cli.command,
            CliCommand::Backend {
                action: BackendAction::Start
            }
        ));
    }

    #[rstest]
    #[case(&["network", "clean"], TelemetryMode::Command)]
    #[case(&["backend", "start"], TelemetryMode::Backend)]
    fn commands_choose_their_logging_profile(#[case] args: &[&str], #[case] mode: TelemetryMode) {
        assert_eq!(parse(args).command.telemetry_mode(), mode);
    }

    #[test]
    fn missing_subcommand_is_a_usage_error() {
        assert!(Cli::try_parse_from(["avnet"]).is_err());
    }
}
