//! Core business logic abstractions.
//!
//! This module defines the seams the pipeline talks through (running the
//! external tool, sending notifications) so the sequencing and classification
//! logic can be exercised without spawning processes or touching the network.

pub mod classify;
mod error;
pub mod pipeline;
pub mod threshold;

pub use classify::{
    classify_completion, classify_diff, classify_status, CompletionMetrics, DiffSummary,
    OperationResult, StatusReport,
};
pub use error::{PipelineError, Stage};
pub use pipeline::{Pipeline, PipelineOutcome, RunSummary};
pub use threshold::ThresholdDecision;

use anyhow::Result;

// ─────────────────────────────────────────────────────────────────────────
// External tool
// ─────────────────────────────────────────────────────────────────────────

/// Trait for invoking subcommands of the array tool.
///
/// `SnapraidRunner` spawns the real executable; tests provide scripted
/// runners that return canned output.
pub trait CommandRunner {
    /// Run `command` with `args` and return the combined stdout/stderr text.
    ///
    /// With `ignore_errors`, a non-zero exit is reported as success carrying
    /// whatever output was produced. A failure to spawn is always an error.
    fn run(&mut self, command: &str, ignore_errors: bool, args: &[&str]) -> Result<String>;
}

// ─────────────────────────────────────────────────────────────────────────
// Notifications
// ─────────────────────────────────────────────────────────────────────────

/// Trait for delivering human-readable progress messages.
pub trait Notifier {
    /// Deliver `message`. A transport failure is returned as an error and is
    /// fatal to the run.
    fn notify(&mut self, message: &str) -> Result<()>;
}

/// A notifier that discards every message.
///
/// Used when notifications are disabled in the configuration.
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&mut self, _message: &str) -> Result<()> {
        Ok(())
    }
}
