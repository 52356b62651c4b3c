//! Command-line runtime for `avnet`.
//!
//! The runtime splits configuration flags from the command, loads the
//! configuration, parses the command and hands it to [`commands`]. `network`
//! commands drive a [`session::SessionController`]; the hidden
//! `backend start` command turns this process into the long-lived backend
//! that owns the network runner. Configuration loading and IO streams can be
//! substituted so the whole path is exercised from tests.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;

mod cli;
mod commands;
mod config;
mod errors;
pub mod gateway;
pub mod output;
pub mod session;
pub mod supervisor;
pub mod telemetry;

use cli::{Cli, CliCommand};
use commands::CommandContext;
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
use config::{prepare_cli_arguments, split_config_arguments};
pub(crate) use errors::AppError;
use output::CommandOutput;

#[cfg(test)]
mod tests;

/// Bundles the IO streams provided to the CLI runtime.
pub(crate) struct IoStreams<'a, W: Write, E: Write> {
    pub(crate) stdout: &'a mut W,
    pub(crate) stderr: &'a mut E,
}

impl<'a, W: Write, E: Write> IoStreams<'a, W, E> {
    pub(crate) fn new(stdout: &'a mut W, stderr: &'a mut E) -> Self {
        Self { stdout, stderr }
    }
}

struct CliRunner<'a, W: Write, E: Write, L: ConfigLoader> {
    io: &'a mut IoStreams<'a, W, E>,
    loader: &'a L,
}

impl<'a, W, E, L> CliRunner<'a, W, E, L>
where
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    fn new(io: &'a mut IoStreams<'a, W, E>, loader: &'a L) -> Self {
        Self { io, loader }
    }

    fn run<I>(&mut self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
    {
        self.run_with_handler(args, |command, context, output| {
            telemetry::initialise(context.config, command.telemetry_mode())?;
            commands::execute(command, context, output)
        })
    }

    fn run_with_handler<I, F>(&mut self, args: I, mut handler: F) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
        F: FnMut(
            CliCommand,
            CommandContext<'_>,
            &mut CommandOutput<&mut W, &mut E>,
        ) -> Result<(), AppError>,
    {
        let args: Vec<OsString> = args.into_iter().collect();
        let split = split_config_arguments(&args);
        let cli_arguments = prepare_cli_arguments(&args, &split);

        let cli = match Cli::try_parse_from(cli_arguments) {
            Ok(cli) => cli,
            Err(error) if !error.use_stderr() => {
                let _ = write!(self.io.stdout, "{}", error.render());
                return ExitCode::SUCCESS;
            }
            Err(error) => return self.fail(&AppError::CliUsage(error)),
        };

        let result = self
            .loader
            .load(&split.config_arguments)
            .and_then(|config| {
                let context = CommandContext {
                    config: &config,
                    config_arguments: &split.config_arguments,
                };
                let mut output = CommandOutput::new(&mut *self.io.stdout, &mut *self.io.stderr);
                handler(cli.command, context, &mut output)
            });

        match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(error) => self.fail(&error),
        }
    }

    fn fail(&mut self, error: &AppError) -> ExitCode {
        let _ = writeln!(self.io.stderr, "{error}");
        ExitCode::FAILURE
    }
}

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let mut io = IoStreams::new(stdout, stderr);
    run_with_loader(args, &mut io, &OrthoConfigLoader)
}

/// Runs the CLI with a custom configuration loader.
#[must_use]
pub(crate) fn run_with_loader<'a, I, W, E, L>(
    args: I,
    io: &'a mut IoStreams<'a, W, E>,
    loader: &'a L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    CliRunner::new(io, loader).run(args)
}

#[cfg(test)]
pub(crate) fn run_with_handler<'a, I, W, E, L, F>(
    args: I,
    io: &'a mut IoStreams<'a, W, E>,
    loader: &'a L,
    handler: F,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
    F: FnMut(
        CliCommand,
        CommandContext<'_>,
        &mut CommandOutput<&mut W, &mut E>,
    ) -> Result<(), AppError>,
{
    CliRunner::new(io, loader).run_with_handler(args, handler)
}
