//! Runtime tests for the CLI entry path.

pub(crate) mod support;

use std::ffi::OsString;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use avnet_config::{Config, GatewayEndpoint};

use self::support::StaticConfigLoader;
use crate::cli::{BackendAction, CliCommand, NetworkAction};
use crate::{IoStreams, run_with_handler, run_with_loader};

struct Run {
    exit: ExitCode,
    stdout: String,
    stderr: String,
}

fn args(command: &str) -> Vec<OsString> {
    std::iter::once("avnet")
        .chain(command.split_whitespace())
        .map(OsString::from)
        .collect()
}

fn run(command: &str, config: Config) -> Run {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let loader = StaticConfigLoader::new(config);
    let exit = {
        let mut io = IoStreams::new(&mut stdout, &mut stderr);
        run_with_loader(args(command), &mut io, &loader)
    };
    Run {
        exit,
        stdout: String::from_utf8(stdout).expect("utf8 stdout"),
        stderr: String::from_utf8(stderr).expect("utf8 stderr"),
    }
}

struct Workspace {
    _base: TempDir,
    config: Config,
}

#[fixture]
fn workspace() -> Workspace {
    let base = TempDir::new().expect("temp dir");
    let base_dir = Utf8PathBuf::from_path_buf(base.path().to_path_buf()).expect("utf8 temp dir");
    let config = Config {
        base_dir,
        dial_timeout_ms: 200,
        health_poll_interval_ms: 10,
        request_timeout_ms: 2_000,
        ..Config::default()
    };
    Workspace {
        _base: base,
        config,
    }
}

fn pointed_at(config: &Config, server: &mockito::Server) -> Config {
    let endpoint: GatewayEndpoint = format!("http://{}", server.host_with_port())
        .parse()
        .expect("gateway endpoint");
    Config {
        gateway_endpoint: endpoint,
        ..config.clone()
    }
}

#[rstest]
fn stop_saves_the_network_through_the_gateway(workspace: Workspace) {
    let mut server = mockito::Server::new();
    let remove = server
        .mock("POST", "/v1/control/removesnapshot")
        .with_status(500)
        .with_body(r#"{"code":2,"message":"snapshot not found"}"#)
        .create();
    let save = server
        .mock("POST", "/v1/control/savesnapshot")
        .with_status(200)
        .with_body("{}")
        .create();

    let outcome = run("network stop", pointed_at(&workspace.config, &server));

    assert_eq!(outcome.exit, ExitCode::SUCCESS, "stderr: {}", outcome.stderr);
    assert!(outcome.stdout.contains("Network stopped successfully."));
    remove.assert();
    save.assert();
}

#[rstest]
fn dont_save_only_stops(workspace: Workspace) {
    let mut server = mockito::Server::new();
    let stop = server
        .mock("POST", "/v1/control/stop")
        .with_status(200)
        .with_body("{}")
        .create();
    let save = server
        .mock("POST", "/v1/control/savesnapshot")
        .expect(0)
        .create();

    let outcome = run("network stop --dont-save", pointed_at(&workspace.config, &server));

    assert_eq!(outcome.exit, ExitCode::SUCCESS, "stderr: {}", outcome.stderr);
    stop.assert();
    save.assert();
}

#[rstest]
fn stop_without_a_backend_reports_already_stopped(workspace: Workspace) {
    let config = Config {
        gateway_endpoint: GatewayEndpoint::new("127.0.0.1", 1),
        ..workspace.config.clone()
    };

    let outcome = run("network stop", config);

    assert_eq!(outcome.exit, ExitCode::SUCCESS, "stderr: {}", outcome.stderr);
    assert!(outcome.stdout.contains("Network already stopped."));
}

#[rstest]
fn unexpected_gateway_failure_is_reported_on_one_line(workspace: Workspace) {
    let mut server = mockito::Server::new();
    let _remove = server
        .mock("POST", "/v1/control/removesnapshot")
        .with_status(500)
        .with_body(r#"{"code":13,"message":"disk full"}"#)
        .create();

    let outcome = run("network stop demo", pointed_at(&workspace.config, &server));

    assert_eq!(outcome.exit, ExitCode::FAILURE);
    assert_eq!(outcome.stderr.lines().count(), 1, "stderr: {}", outcome.stderr);
    assert!(outcome.stderr.contains("disk full"));
}

#[test]
fn unknown_command_fails_with_usage() {
    let outcome = run("network reboot", Config::default());
    assert_eq!(outcome.exit, ExitCode::FAILURE);
    assert!(outcome.stderr.contains("reboot"));
}

#[test]
fn help_is_written_to_stdout() {
    let outcome = run("network --help", Config::default());
    assert_eq!(outcome.exit, ExitCode::SUCCESS);
    assert!(outcome.stdout.contains("stop"));
    assert!(outcome.stderr.is_empty());
}

#[test]
fn leading_config_flags_reach_the_loader_and_the_handler() {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let loader = StaticConfigLoader::new(Config::default());
    let mut seen = Vec::new();
    let exit = {
        let mut io = IoStreams::new(&mut stdout, &mut stderr);
        run_with_handler(
            args("--base-dir /tmp/avnet backend start"),
            &mut io,
            &loader,
            |command, context, _output| {
                seen.push((command, context.config_arguments.to_vec()));
                Ok(())
            },
        )
    };

    assert_eq!(exit, ExitCode::SUCCESS);
    let (command, config_arguments) = seen.pop().expect("handler invoked");
    assert!(matches!(
        command,
        CliCommand::Backend {
            action: BackendAction::Start
        }
    ));
    assert_eq!(config_arguments, args("--base-dir /tmp/avnet"));
}

#[test]
fn handler_receives_network_actions() {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let loader = StaticConfigLoader::new(Config::default());
    let mut seen = None;
    let exit = {
        let mut io = IoStreams::new(&mut stdout, &mut stderr);
        run_with_handler(
            args("network clean --hard"),
            &mut io,
            &loader,
            |command, _context, _output| {
                seen = Some(command);
                Ok(())
            },
        )
    };

    assert_eq!(exit, ExitCode::SUCCESS);
    assert!(matches!(
        seen,
        Some(CliCommand::Network {
            action: NetworkAction::Clean { hard: true }
        })
    ));
}
