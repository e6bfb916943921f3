//! Packet capture bracketing a redirected run.
//!
//! When requested, a tcpdump child records the whole run. It starts before
//! the network state changes and stops after teardown, and it is entirely
//! independent of the engine: a capture failure never affects redirection.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use thiserror::Error;
use tracing::{info, warn};

/// Errors from starting a capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// tcpdump could not be spawned.
    #[error("Failed to start tcpdump: {0}")]
    Start(#[source] std::io::Error),
}

/// A tcpdump process writing to a capture file for the duration of a run.
pub struct CaptureSession {
    child: Child,
    path: PathBuf,
}

impl CaptureSession {
    /// Start capturing all interfaces into `path`.
    pub fn start(path: &Path) -> Result<Self, CaptureError> {
        info!("Starting packet capture to {}", path.display());
        let child = Command::new("tcpdump")
            .args(["-i", "any", "-w"])
            .arg(path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(CaptureError::Start)?;

        Ok(Self {
            child,
            path: path.to_path_buf(),
        })
    }

    /// Stop the capture and wait for the file to be flushed.
    pub fn stop(mut self) {
        // SIGTERM lets tcpdump flush its buffers; SIGKILL would truncate
        // the capture file.
        if let Err(e) = kill(Pid::from_raw(self.child.id() as i32), Signal::SIGTERM) {
            warn!("Failed to signal tcpdump: {}", e);
        }
        match self.child.wait() {
            Ok(_) => info!("Packet capture saved to {}", self.path.display()),
            Err(e) => warn!("Failed to wait for tcpdump: {}", e),
        }
    }
}
