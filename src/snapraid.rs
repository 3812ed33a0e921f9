//! Process runner for the SnapRAID executable.

use crate::core::CommandRunner;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::{Command, Stdio};

pub struct SnapraidRunner {
    executable: PathBuf,
}

impl SnapraidRunner {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Resolve `executable` through `PATH` (or as a path) and fail if it
    /// cannot be found, so a typo is reported before any stage runs.
    pub fn locate(executable: &str) -> Result<Self> {
        let path = which::which(executable)
            .with_context(|| format!("Executable not found: {executable}"))?;
        Ok(Self::new(path))
    }

    pub fn executable(&self) -> &std::path::Path {
        &self.executable
    }
}

impl CommandRunner for SnapraidRunner {
    fn run(&mut self, command: &str, ignore_errors: bool, args: &[&str]) -> Result<String> {
        tracing::debug!("Snapraid command: {command} {}", args.join(" "));

        let output = Command::new(&self.executable)
            .arg(command)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .with_context(|| {
                format!(
                    "Failed to execute {} {command}",
                    self.executable.display()
                )
            })?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() && !ignore_errors {
            tracing::error!("Encountered error in command {command}: {}", output.status);
            tracing::debug!("Output of failed command {command}:\n{text}");
            anyhow::bail!("{command} exited with {}", output.status);
        }

        Ok(text)
    }
}
