//! Process table enumeration.

use std::ffi::OsString;

use sysinfo::System;

/// One row of the process table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    /// Operating system process identifier.
    pub pid: u32,
    /// Space-joined command line, or `None` when it could not be read.
    pub command_line: Option<String>,
}

impl ProcessEntry {
    /// Returns true when the command line is readable and contains `marker`.
    #[must_use]
    pub fn matches(&self, marker: &str) -> bool {
        self.command_line
            .as_deref()
            .is_some_and(|command_line| command_line.contains(marker))
    }
}

/// Capability to enumerate running processes.
#[cfg_attr(test, mockall::automock)]
pub trait ProcessLister {
    /// Returns every visible process.
    fn processes(&self) -> Vec<ProcessEntry>;
}

/// Lists processes through the operating system process table.
///
/// On Linux the table also holds every thread as a task; those are skipped
/// so only thread-group leaders are reported.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessLister;

impl ProcessLister for SystemProcessLister {
    fn processes(&self) -> Vec<ProcessEntry> {
        let system = System::new_all();
        system
            .processes()
            .iter()
            .filter(|(_, process)| process.thread_kind().is_none())
            .map(|(pid, process)| ProcessEntry {
                pid: pid.as_u32(),
                command_line: join_command_line(process.cmd()),
            })
            .collect()
    }
}

// Processes owned by other users or already reaped expose no arguments.
fn join_command_line(arguments: &[OsString]) -> Option<String> {
    if arguments.is_empty() {
        return None;
    }
    let parts: Vec<String> = arguments
        .iter()
        .map(|argument| argument.to_string_lossy().into_owned())
        .collect();
    Some(parts.join(" "))
}
