//! Privileged command execution.
//!
//! Every firewall and process-control mutation shells out to a host binary
//! (`iptables`, `pkill`, `systemctl`). Routing those invocations through the
//! [`PrivilegedExec`] trait keeps the callers testable: unit tests substitute
//! a recorder and assert the exact command sequence without touching a real
//! host.

use std::process::Command;
use thiserror::Error;
use tracing::debug;

/// Errors from spawning or running a privileged command.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The binary could not be spawned at all.
    #[error("Failed to run '{cmd}': {source}")]
    Spawn {
        /// The command line that failed to spawn.
        cmd: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The command ran and exited non-zero.
    #[error("Command '{cmd}' failed: {stderr}")]
    CommandFailed {
        /// The command line that failed.
        cmd: String,
        /// Captured standard error.
        stderr: String,
    },
}

/// Outcome of a privileged command that was allowed to fail.
#[derive(Debug, Clone)]
pub struct ExecOutcome {
    /// Whether the command exited successfully.
    pub success: bool,
    /// Captured standard error.
    pub stderr: String,
}

/// Abstraction over "run a privileged host command, return its status".
pub trait PrivilegedExec: Send + Sync {
    /// Run `program` with `args`. Spawn failures are errors; a non-zero exit
    /// is reported in the outcome so callers can decide whether it matters
    /// (`pkill` with no match is a success for us).
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecOutcome, ExecError>;

    /// Run `program` with `args`, treating a non-zero exit as an error.
    fn run_checked(&self, program: &str, args: &[&str]) -> Result<(), ExecError> {
        let outcome = self.run(program, args)?;
        if outcome.success {
            Ok(())
        } else {
            Err(ExecError::CommandFailed {
                cmd: render_command(program, args),
                stderr: outcome.stderr,
            })
        }
    }
}

/// Executor that actually spawns host commands.
pub struct SystemExec;

impl PrivilegedExec for SystemExec {
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecOutcome, ExecError> {
        let cmd_str = render_command(program, args);
        debug!("Running: {}", cmd_str);

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| ExecError::Spawn {
                cmd: cmd_str,
                source: e,
            })?;

        Ok(ExecOutcome {
            success: output.status.success(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

fn render_command(program: &str, args: &[&str]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Executor that records every command instead of running it.
    pub(crate) struct RecordingExec {
        commands: Mutex<Vec<String>>,
        fail_on: Mutex<Option<String>>,
    }

    impl RecordingExec {
        pub(crate) fn new() -> Self {
            Self {
                commands: Mutex::new(Vec::new()),
                fail_on: Mutex::new(None),
            }
        }

        /// Make any command whose rendered line contains `needle` fail.
        pub(crate) fn fail_matching(&self, needle: &str) {
            *self.fail_on.lock().unwrap() = Some(needle.to_string());
        }

        pub(crate) fn recorded(&self) -> Vec<String> {
            self.commands.lock().unwrap().clone()
        }
    }

    impl PrivilegedExec for RecordingExec {
        fn run(&self, program: &str, args: &[&str]) -> Result<ExecOutcome, ExecError> {
            let cmd = render_command(program, args);
            self.commands.lock().unwrap().push(cmd.clone());

            let fail_on = self.fail_on.lock().unwrap();
            if let Some(needle) = fail_on.as_deref()
                && cmd.contains(needle)
            {
                return Ok(ExecOutcome {
                    success: false,
                    stderr: "injected failure".to_string(),
                });
            }

            Ok(ExecOutcome {
                success: true,
                stderr: String::new(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_exec_success() {
        let outcome = SystemExec.run("true", &[]).unwrap();
        assert!(outcome.success);
    }

    #[test]
    fn test_system_exec_nonzero_exit() {
        let outcome = SystemExec.run("false", &[]).unwrap();
        assert!(!outcome.success);

        let err = SystemExec.run_checked("false", &[]).unwrap_err();
        assert!(matches!(err, ExecError::CommandFailed { .. }));
    }

    #[test]
    fn test_system_exec_spawn_failure() {
        let err = SystemExec
            .run("torveil-no-such-binary-xyz", &[])
            .unwrap_err();
        assert!(matches!(err, ExecError::Spawn { .. }));
    }

    #[test]
    fn test_render_command() {
        assert_eq!(render_command("pkill", &["-f", "tor"]), "pkill -f tor");
        assert_eq!(render_command("true", &[]), "true");
    }

    #[test]
    fn test_recording_exec_failure_injection() {
        let exec = testing::RecordingExec::new();
        exec.fail_matching("REJECT");

        assert!(exec.run_checked("iptables", &["-A", "OUTPUT", "-j", "ACCEPT"]).is_ok());
        assert!(exec.run_checked("iptables", &["-A", "OUTPUT", "-j", "REJECT"]).is_err());
        assert_eq!(exec.recorded().len(), 2);
    }
}
