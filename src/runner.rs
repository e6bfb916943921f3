//! Child command execution under the redirected network state.

use std::process::{Command, ExitStatus, Stdio};
use thiserror::Error;
use tracing::{debug, info};

/// Errors from launching the child command.
///
/// A failed child does not trigger teardown here; restoring the network
/// remains the engine's job whatever the child did.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Empty argv.
    #[error("No command given")]
    EmptyCommand,

    /// The executable could not be found or started.
    #[error("Failed to execute '{program}': {source}")]
    ChildExec {
        /// The program that failed to launch.
        program: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Waiting for the child failed.
    #[error("Failed to wait for '{program}': {source}")]
    Wait {
        /// The program being waited on.
        program: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Runs the child command with inherited stdio and environment.
pub struct CommandRunner;

impl CommandRunner {
    /// Spawn `argv` and block until it exits.
    pub fn run(argv: &[String]) -> Result<ExitStatus, RunnerError> {
        let (program, args) = argv.split_first().ok_or(RunnerError::EmptyCommand)?;
        debug!("Executing child command: {:?}", argv);

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| RunnerError::ChildExec {
                program: program.clone(),
                source: e,
            })?;

        let status = child.wait().map_err(|e| RunnerError::Wait {
            program: program.clone(),
            source: e,
        })?;

        info!("Child exited with status {:?}", status.code());
        Ok(status)
    }
}
