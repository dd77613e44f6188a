//! Front-end build command invocation
//!
//! The build command is an opaque external collaborator: prestage spawns it
//! through the shell, inherits its output, and gates on the exit status.
//! A non-zero exit aborts the whole run - no retries.

use std::path::Path;
use std::process::{Command, Stdio};

use crate::config::BuildConfig;
use crate::error::{PrestageError, PrestageResult};

/// Resolved front-end build invocation
#[derive(Debug, Clone)]
pub struct BuildCommand {
    /// Shell command line, run via `sh -c` (or `cmd /C` on Windows)
    pub command: String,
    /// Working directory, already resolved against the project root
    pub cwd: std::path::PathBuf,
}

impl BuildCommand {
    /// Build the invocation from config, if there is anything to run.
    ///
    /// Returns `None` when no command is configured or the build step is
    /// disabled - the caller goes straight to staging.
    pub fn from_config(config: &BuildConfig, project_root: &Path) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        let command = config.command.clone()?;
        let cwd = match &config.cwd {
            Some(dir) => project_root.join(dir),
            None => project_root.to_path_buf(),
        };
        Some(Self { command, cwd })
    }

    /// Run the build command and gate on its exit status.
    ///
    /// Output is inherited so build tool progress reaches the user; in json
    /// mode stdout is silenced to keep the event stream parseable.
    pub fn run(&self, json: bool) -> PrestageResult<()> {
        let mut cmd = shell_command(&self.command);
        cmd.current_dir(&self.cwd).stdin(Stdio::null());

        if json {
            cmd.stdout(Stdio::null()).stderr(Stdio::inherit());
        } else {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }

        let status = cmd.status().map_err(|_| PrestageError::BuildFailed {
            command: self.command.clone(),
            code: None,
        })?;

        if !status.success() {
            return Err(PrestageError::BuildFailed {
                command: self.command.clone(),
                code: status.code(),
            });
        }

        Ok(())
    }
}

#[cfg(unix)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}
