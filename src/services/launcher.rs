//! Starts the external account-checking worker.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::info;

/// Launches `<binary> <input spreadsheet> <worker count>`.
#[derive(Debug, Clone)]
pub struct WorkerLauncher {
    binary: PathBuf,
}

impl WorkerLauncher {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Spawn the worker. The child is not killed on drop; the completion
    /// watcher owns it for the rest of its life.
    pub fn launch(&self, input: &Path, workers: u32) -> std::io::Result<Child> {
        info!(
            "Starting worker: {} {} {}",
            self.binary.display(),
            input.display(),
            workers
        );

        Command::new(&self.binary)
            .arg(input)
            .arg(workers.to_string())
            .stdin(Stdio::null())
            .kill_on_drop(false)
            .spawn()
    }
}
