use std::fmt;
use thiserror::Error;

/// Pipeline stage, used to tag fatal errors and log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Touch,
    Diff,
    Sync,
    Scrub,
    Status,
}

impl Stage {
    /// The subcommand name passed to the executable.
    pub fn command(self) -> &'static str {
        match self {
            Self::Touch => "touch",
            Self::Diff => "diff",
            Self::Sync => "sync",
            Self::Scrub => "scrub",
            Self::Status => "status",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

/// A condition that terminates the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The external command could not be run or exited with an error.
    #[error("{stage} failed: {message}")]
    Process { stage: Stage, message: String },

    /// The command exited cleanly but its output lacked the completion markers.
    #[error("{stage} did not complete, output did not contain '100% completed' and 'Everything OK'")]
    Verdict { stage: Stage },

    /// The notification transport failed.
    #[error("failed to send notification: {message}")]
    Notification { message: String },
}

impl PipelineError {
    /// The stage that failed, if the error came from one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Process { stage, .. } | Self::Verdict { stage } => Some(*stage),
            Self::Notification { .. } => None,
        }
    }
}
