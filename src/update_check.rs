//! Startup check for newer snapsync releases.
//!
//! Runs synchronously before the pipeline:
//! 1. Skipped when disabled by flag, config, `SNAPSYNC_NO_UPDATE_CHECK`, or CI
//! 2. Fetches the latest GitHub release tag with a short timeout
//! 3. Logs a notice when the published version is newer than this binary
//!
//! Any failure is logged at debug level and otherwise ignored; the check never
//! affects the outcome of a run.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Environment variable to disable update checks.
pub const NO_UPDATE_CHECK_ENV: &str = "SNAPSYNC_NO_UPDATE_CHECK";

/// GitHub API URL for the latest release.
const GITHUB_RELEASES_URL: &str = "https://api.github.com/repos/JeordyR/SnapSync/releases/latest";

/// Where users can download a newer build.
const RELEASES_PAGE_URL: &str = "https://github.com/JeordyR/SnapSync/releases/latest";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Minimal GitHub release response, only the fields we need.
#[derive(Debug, Deserialize)]
struct GitHubRelease {
    tag_name: String,
}

/// A newer release than the running binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateNotification {
    pub current_version: String,
    pub latest_version: String,
    pub download_url: String,
}

/// Check for a newer release unless checks are disabled.
///
/// Returns `None` when disabled, up to date, or on any error.
pub fn maybe_check_for_update(enabled: bool) -> Option<UpdateNotification> {
    if !enabled || is_update_check_disabled() {
        tracing::debug!("Update check disabled");
        return None;
    }

    match fetch_latest_version() {
        Ok(latest) => notification_for(crate::VERSION, &latest),
        Err(e) => {
            tracing::debug!("Update check failed: {e:#}");
            None
        }
    }
}

/// Log the update notice.
pub fn log_notification(notification: &UpdateNotification) {
    tracing::info!(
        "A new version of snapsync is available: {} -> {} ({})",
        notification.current_version,
        notification.latest_version,
        notification.download_url
    );
}

fn notification_for(current: &str, latest: &str) -> Option<UpdateNotification> {
    if is_newer_version(current, latest) {
        Some(UpdateNotification {
            current_version: current.to_string(),
            latest_version: latest.to_string(),
            download_url: RELEASES_PAGE_URL.to_string(),
        })
    } else {
        tracing::debug!("Current binary is the latest version {current}");
        None
    }
}

/// Fetch the latest version tag from the GitHub Releases API.
fn fetch_latest_version() -> Result<String> {
    let client = reqwest::blocking::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("snapsync/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to create HTTP client")?;

    let response = client
        .get(GITHUB_RELEASES_URL)
        .header("Accept", "application/vnd.github+json")
        .send()
        .context("Failed to query GitHub releases")?;

    if !response.status().is_success() {
        anyhow::bail!("GitHub API returned {}", response.status());
    }

    let body = response
        .text()
        .context("Failed to read GitHub API response")?;
    parse_release_tag(&body)
}

/// Extract the version from a release payload, stripping a leading `v`.
fn parse_release_tag(body: &str) -> Result<String> {
    let release: GitHubRelease =
        serde_json::from_str(body).context("Failed to parse GitHub API response")?;

    let version = release
        .tag_name
        .strip_prefix('v')
        .unwrap_or(&release.tag_name)
        .to_string();

    Ok(version)
}

/// Compare two semver version strings. Returns `true` if `latest` is newer than `current`.
/// Strips leading 'v' prefix. Ignores pre-release suffixes (treats "1.0.0-beta.1" as "1.0.0").
/// Returns `false` on any parse error.
fn is_newer_version(current: &str, latest: &str) -> bool {
    let parse = |s: &str| -> Option<(u64, u64, u64)> {
        let s = s.strip_prefix('v').unwrap_or(s);
        let s = s.split('-').next()?;
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 3 {
            return None;
        }
        Some((
            parts[0].parse().ok()?,
            parts[1].parse().ok()?,
            parts[2].parse().ok()?,
        ))
    };

    match (parse(current), parse(latest)) {
        (Some(c), Some(l)) => l > c,
        _ => false,
    }
}

/// Check if update checks are disabled via env var or CI environment.
fn is_update_check_disabled() -> bool {
    env::var(NO_UPDATE_CHECK_ENV).is_ok() || is_ci_environment()
}

/// Returns `true` if we appear to be running in a CI environment.
fn is_ci_environment() -> bool {
    let ci_vars = [
        "CI",
        "GITHUB_ACTIONS",
        "JENKINS_URL",
        "TRAVIS",
        "CIRCLECI",
        "GITLAB_CI",
        "BUILDKITE",
        "TF_BUILD",
    ];

    ci_vars.iter().any(|var| env::var(var).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- Version comparison tests --

    #[test]
    fn test_newer_version_basic() {
        assert!(is_newer_version("1.0.0", "1.0.1"));
        assert!(is_newer_version("1.0.0", "1.1.0"));
        assert!(is_newer_version("1.0.0", "2.0.0"));
        assert!(is_newer_version("0.0.1", "0.1.0"));
    }

    #[test]
    fn test_same_or_older_version() {
        assert!(!is_newer_version("0.1.0", "0.1.0"));
        assert!(!is_newer_version("0.2.0", "0.1.9"));
    }

    #[test]
    fn test_v_prefix_and_pre_release() {
        assert!(is_newer_version("v0.1.0", "v0.1.1"));
        assert!(is_newer_version("0.1.0", "0.1.1-rc.1"));
        assert!(!is_newer_version("0.1.0", "0.1.0-rc.1"));
    }

    #[test]
    fn test_invalid_version_strings() {
        assert!(!is_newer_version("invalid", "1.0.0"));
        assert!(!is_newer_version("1.0.0", ""));
        assert!(!is_newer_version("1.0", "1.0.1"));
    }

    // -- Release payload --

    #[test]
    fn test_parse_release_tag() {
        let body = r#"{"tag_name":"v0.3.2","name":"0.3.2","draft":false}"#;
        assert_eq!(parse_release_tag(body).unwrap(), "0.3.2");

        let body = r#"{"tag_name":"1.0.0"}"#;
        assert_eq!(parse_release_tag(body).unwrap(), "1.0.0");
    }

    #[test]
    fn test_parse_release_tag_rejects_garbage() {
        assert!(parse_release_tag(r#"{"message":"Not Found"}"#).is_err());
        assert!(parse_release_tag("not json").is_err());
    }

    // -- Notification --

    #[test]
    fn test_notification_only_for_newer() {
        let notification = notification_for("0.1.0", "0.2.0").unwrap();
        assert_eq!(notification.current_version, "0.1.0");
        assert_eq!(notification.latest_version, "0.2.0");
        assert_eq!(notification.download_url, RELEASES_PAGE_URL);

        assert!(notification_for("0.2.0", "0.2.0").is_none());
    }

    #[test]
    fn test_disabled_check_returns_none() {
        assert!(maybe_check_for_update(false).is_none());
    }
}
