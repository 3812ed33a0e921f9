//! Classification of SnapRAID console output.
//!
//! SnapRAID draws progress bars by overwriting the terminal line with `\r`,
//! so a single `\n`-delimited line can hold many progress frames followed by
//! the final message. Every extractor here therefore works in two levels:
//! pick the logical line by marker, then pick the `\r` segment that carries it.
//!
//! The markers are plain substring/prefix checks on purpose. They match the
//! tool's known output and must stay byte-compatible with it.

use regex::Regex;
use std::sync::OnceLock;

/// Marker that, together with [`COMPLETED_MARKER`], identifies a finished run.
const PERCENT_MARKER: &str = "100";
const COMPLETED_MARKER: &str = "completed";
const ALL_OK_MARKER: &str = "Everything OK";

const ADD_PREFIX: &str = "add";
const REMOVE_PREFIX: &str = "remove";

const SCRUB_AGE_MARKER: &str = "The oldest block was scrubbed";
const SCRUB_PERCENT_MARKER: &str = "of the array is not scrubbed";
const DANGER_MARKER: &str = "DANGER!";

/// Numbers parsed out of a completion summary such as
/// `100% completed, 1234 MB accessed in 0:01`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompletionMetrics {
    pub percent: Option<u32>,
    pub accessed_mb: Option<u64>,
}

/// Verdict for a sync or scrub run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationResult {
    output: String,
    success: bool,
    summary: Option<String>,
    metrics: Option<CompletionMetrics>,
}

impl OperationResult {
    /// The raw output the verdict was derived from.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// True only when both the completion line and `Everything OK` were seen.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Trimmed completion line, e.g. `100% completed, 512 MB accessed in 0:00`.
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn metrics(&self) -> Option<CompletionMetrics> {
        self.metrics
    }
}

/// Added/removed counts from `snapraid diff`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub added: usize,
    pub removed: usize,
}

/// Lines of interest from `snapraid status`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusReport {
    pub scrub_age_line: Option<String>,
    pub scrub_percent_line: Option<String>,
    pub danger_lines: Vec<String>,
}

/// Derive a success verdict from sync or scrub output.
///
/// The first completion line found supplies the summary; later ones are
/// ignored. `Everything OK` only counts on a line that is not itself a
/// completion line. Scanning stops as soon as both markers have been observed.
pub fn classify_completion(text: &str) -> OperationResult {
    let mut summary: Option<String> = None;
    let mut complete = false;
    let mut all_ok = false;

    for line in text.split('\n') {
        if complete && all_ok {
            break;
        }

        let is_completion = line.contains(PERCENT_MARKER) && line.contains(COMPLETED_MARKER);
        if is_completion {
            if !complete {
                complete = true;
                summary = first_segment_containing(line, COMPLETED_MARKER);
            }
        } else if line.contains(ALL_OK_MARKER) {
            all_ok = true;
        }
    }

    let metrics = summary.as_deref().map(parse_metrics);

    OperationResult {
        output: text.to_string(),
        success: complete && all_ok,
        summary,
        metrics,
    }
}

/// Count `add` and `remove` lines in diff output.
///
/// Prefix matching is case-sensitive and deliberately naive: any line that
/// starts with the prefix counts.
pub fn classify_diff(text: &str) -> DiffSummary {
    text.split('\n')
        .fold(DiffSummary::default(), |mut summary, line| {
            if line.starts_with(ADD_PREFIX) {
                summary.added += 1;
            } else if line.starts_with(REMOVE_PREFIX) {
                summary.removed += 1;
            }
            summary
        })
}

/// Extract scrub age, unscrubbed percentage and danger lines from status output.
pub fn classify_status(text: &str) -> StatusReport {
    let mut report = StatusReport::default();

    for line in text.split('\n') {
        if line.contains(SCRUB_AGE_MARKER) {
            if let Some(found) = last_segment_containing(line, SCRUB_AGE_MARKER) {
                report.scrub_age_line = Some(found);
            }
        }
        if line.contains(SCRUB_PERCENT_MARKER) {
            if let Some(found) = last_segment_containing(line, SCRUB_PERCENT_MARKER) {
                report.scrub_percent_line = Some(found);
            }
        }
        if line.contains(DANGER_MARKER) {
            report.danger_lines.extend(
                line.split('\r')
                    .filter(|segment| segment.contains(DANGER_MARKER))
                    .map(|segment| segment.trim().to_string()),
            );
        }
    }

    report
}

fn first_segment_containing(line: &str, marker: &str) -> Option<String> {
    line.split('\r')
        .find(|segment| segment.contains(marker))
        .map(|segment| segment.trim().to_string())
}

fn last_segment_containing(line: &str, marker: &str) -> Option<String> {
    line.rsplit('\r')
        .find(|segment| segment.contains(marker))
        .map(|segment| segment.trim().to_string())
}

fn parse_metrics(summary: &str) -> CompletionMetrics {
    static PERCENT: OnceLock<Regex> = OnceLock::new();
    static ACCESSED: OnceLock<Regex> = OnceLock::new();

    let percent = PERCENT.get_or_init(|| Regex::new(r"(\d+)%").expect("valid regex"));
    let accessed =
        ACCESSED.get_or_init(|| Regex::new(r"(\d+)\s*MB accessed").expect("valid regex"));

    CompletionMetrics {
        percent: percent
            .captures(summary)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok()),
        accessed_mb: accessed
            .captures(summary)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok()),
    }
}
