//! Run sequencing: touch, diff, threshold check, sync, scrub, status.
//!
//! Every stage blocks on the external command. Fatal conditions are logged,
//! announced with one best-effort notification, and returned as
//! [`PipelineError`]; nothing is retried.

use super::classify::{classify_completion, classify_diff, classify_status};
use super::threshold::{self, ThresholdDecision};
use super::{
    CommandRunner, DiffSummary, Notifier, OperationResult, PipelineError, Stage, StatusReport,
};
use crate::config::Config;

/// What a finished run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Every enabled stage ran and succeeded.
    Completed(RunSummary),
    /// Too many removed files; nothing after the diff ran.
    Skipped {
        diff: DiffSummary,
        decision: ThresholdDecision,
    },
}

/// Per-stage results of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// `None` when touch is disabled, otherwise whether it succeeded.
    pub touch: Option<bool>,
    pub diff: DiffSummary,
    pub sync: OperationResult,
    pub scrub: Option<OperationResult>,
    pub status: Option<StatusReport>,
}

/// Drives one run against a runner and a notifier.
pub struct Pipeline<'a> {
    config: &'a Config,
    runner: &'a mut dyn CommandRunner,
    notifier: &'a mut dyn Notifier,
}

type StageResult<T> = std::result::Result<T, PipelineError>;

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a Config,
        runner: &'a mut dyn CommandRunner,
        notifier: &'a mut dyn Notifier,
    ) -> Self {
        Self {
            config,
            runner,
            notifier,
        }
    }

    /// Execute every enabled stage in order.
    pub fn run(&mut self) -> Result<PipelineOutcome, PipelineError> {
        let config = self.config;

        self.notify("Beginning snapsync...")?;
        tracing::info!("============= New Snapsync Execution =============");

        let touch = if config.touch_enabled {
            Some(self.run_touch()?)
        } else {
            None
        };

        let diff = self.run_diff()?;

        let decision = threshold::evaluate(diff.removed, config.delete_threshold);
        tracing::info!("{}", decision.reason);
        if !decision.proceed {
            self.notify(&format!(
                "Skipping sync, too many files removed: {} threshold is {}",
                diff.removed, config.delete_threshold
            ))?;
            return Ok(PipelineOutcome::Skipped { diff, decision });
        }

        let sync = self.run_sync()?;

        let scrub = match &config.scrub {
            Some(settings) => {
                let args = [
                    "--percentage",
                    settings.percentage.as_str(),
                    "--older-than",
                    settings.older_than.as_str(),
                ];
                Some(self.run_scrub(&args)?)
            }
            None => None,
        };

        let status = if config.output_status {
            Some(self.run_status()?)
        } else {
            None
        };

        tracing::info!("Snapsync completed successfully");
        self.notify("Snapsync completed successfully")?;

        Ok(PipelineOutcome::Completed(RunSummary {
            touch,
            diff,
            sync,
            scrub,
            status,
        }))
    }

    /// Touch failures are reported but never stop the run.
    fn run_touch(&mut self) -> StageResult<bool> {
        tracing::info!("Running touch...");
        match self.runner.run(Stage::Touch.command(), false, &[]) {
            Ok(_) => {
                tracing::info!("Touch completed successfully.");
                self.notify("Touch completed successfully.")?;
                Ok(true)
            }
            Err(e) => {
                tracing::error!("Failed to run touch with error: {e:#}");
                self.notify("Failed to run touch, check log for errors.")?;
                Ok(false)
            }
        }
    }

    /// The tool exits non-zero for benign diff results, so exit status is
    /// ignored; only a failure to run at all is fatal.
    fn run_diff(&mut self) -> StageResult<DiffSummary> {
        tracing::info!("Getting diff...");
        let output = self.run_stage(
            Stage::Diff,
            true,
            &[],
            "Failed to get diff results, check log for errors.",
        )?;

        tracing::info!("Parsing differences...");
        let diff = classify_diff(&output);
        tracing::info!("Added files: {}", diff.added);
        tracing::info!("Removed files: {}", diff.removed);
        Ok(diff)
    }

    fn run_sync(&mut self) -> StageResult<OperationResult> {
        tracing::info!("Running sync...");
        let output = self.run_stage(
            Stage::Sync,
            false,
            &[],
            "Sync failed, check logs for errors.",
        )?;

        let result = classify_completion(&output);
        if !result.is_success() {
            let err = PipelineError::Verdict { stage: Stage::Sync };
            return Err(self.fail(
                err,
                "Sync did not complete, output did not contain '100% completed' and 'Everything OK'",
            ));
        }

        tracing::info!("Sync completed successfully.");
        log_metrics(Stage::Sync, &result);
        self.notify(&format!("Sync {}", result.summary().unwrap_or_default()))?;
        Ok(result)
    }

    fn run_scrub(&mut self, args: &[&str]) -> StageResult<OperationResult> {
        tracing::info!("Running scrub...");
        let output = self.run_stage(
            Stage::Scrub,
            false,
            args,
            "Scrub failed, check logs for errors.",
        )?;

        let result = classify_completion(&output);
        if !result.is_success() {
            tracing::error!(
                "Scrub did not complete successfully, may have found errors, output did not contain '100% completed' and 'Everything OK'"
            );
            tracing::info!("================ Scrub Output ================");
            tracing::info!("{}", result.output());
            let err = PipelineError::Verdict {
                stage: Stage::Scrub,
            };
            return Err(self.fail(
                err,
                "Scrub did not complete, may have found errors, see log for scrub output.",
            ));
        }

        tracing::info!("Scrub completed successfully.");
        log_metrics(Stage::Scrub, &result);
        self.notify(&format!("Scrub {}", result.summary().unwrap_or_default()))?;
        Ok(result)
    }

    fn run_status(&mut self) -> StageResult<StatusReport> {
        tracing::info!("Getting status...");
        let output = self.run_stage(
            Stage::Status,
            false,
            &[],
            "Failed to get status of the array, check logs for errors.",
        )?;

        let report = classify_status(&output);
        let age = report.scrub_age_line.as_deref().unwrap_or_default();
        let percent = report.scrub_percent_line.as_deref().unwrap_or_default();

        tracing::info!("Scrub Stats: {age}");
        self.notify(&format!("Scrub Stats: {age}"))?;
        tracing::info!("Scrub Percentage: {percent}");
        self.notify(&format!("Scrub Percentage: {percent}"))?;

        if report.danger_lines.is_empty() {
            tracing::info!("No errors in the array.");
            self.notify("No errors in the array.")?;
        } else {
            for line in &report.danger_lines {
                tracing::warn!("Array Error: {line}");
                self.notify(&format!("Array Error: {line}"))?;
            }
        }

        Ok(report)
    }

    /// Run a stage's command, turning a runner error into a fatal failure.
    fn run_stage(
        &mut self,
        stage: Stage,
        ignore_errors: bool,
        args: &[&str],
        failure_message: &str,
    ) -> StageResult<String> {
        match self.runner.run(stage.command(), ignore_errors, args) {
            Ok(output) => Ok(output),
            Err(e) => {
                let err = PipelineError::Process {
                    stage,
                    message: format!("{e:#}"),
                };
                Err(self.fail(err, failure_message))
            }
        }
    }

    /// Log a fatal error and send one best-effort notification about it.
    fn fail(&mut self, err: PipelineError, message: &str) -> PipelineError {
        tracing::error!("{err}");
        if let Err(notify_err) = self.notifier.notify(message) {
            tracing::error!("Failed to send failure notification: {notify_err:#}");
        }
        err
    }

    fn notify(&mut self, message: &str) -> StageResult<()> {
        tracing::debug!("Notification: {message}");
        self.notifier.notify(message).map_err(|e| {
            let err = PipelineError::Notification {
                message: format!("{e:#}"),
            };
            tracing::error!("{err}");
            err
        })
    }
}

fn log_metrics(stage: Stage, result: &OperationResult) {
    if let Some(metrics) = result.metrics() {
        tracing::debug!(
            "{stage} metrics: percent={:?} accessed_mb={:?}",
            metrics.percent,
            metrics.accessed_mb
        );
    }
}
