//! Entry point for the `avnet` binary.

use std::io::{self, Stderr, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    // Left unlocked: the backend's signal thread logs to stderr too.
    let mut stderr: Stderr = io::stderr();
    avnet_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
