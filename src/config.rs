//! YAML configuration for snapsync.
//!
//! The file is read once at startup into a [`RawConfig`] that mirrors the
//! on-disk keys, then validated into an immutable [`Config`]. Missing required
//! values are startup errors. Optional features whose settings are incomplete
//! are switched off rather than failing the run, and every such decision is
//! reported as a notice so it can be logged.
//!
//! # Keys
//!
//! | Key | Required | Description |
//! |-----|----------|-------------|
//! | `Executable` | yes | Path to the `snapraid` binary |
//! | `LogFile` | yes | File the run log is appended to |
//! | `TouchEnabled` | no | Run `touch` before `diff` |
//! | `DeleteThreashold` | yes | Maximum removed files before sync is skipped (nonzero) |
//! | `ScrubEnabled` | no | Run `scrub` after a successful sync |
//! | `ScrubPercentage` | with scrub | `--percentage` passed to scrub |
//! | `ScrubOlderThan` | with scrub | `--older-than` passed to scrub |
//! | `ScrubDaysOfWeek` | with scrub | Weekday names on which scrub may run |
//! | `OutputStatus` | no | Run `status` and report scrub age and errors |
//! | `PushoverEnabled` | no | Send Pushover notifications |
//! | `PushoverAppKey` | with pushover | Pushover application token |
//! | `PushoverUserKey` | with pushover | Pushover user key |
//! | `UpdateCheck` | no | Look for a newer release on startup (default `true`) |

use anyhow::{Context, Result};
use chrono::Weekday;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when `--config` is absent.
pub const CONFIG_FILE_NAME: &str = "snapsync.yaml";

/// The configuration file as written on disk.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RawConfig {
    pub executable: Option<String>,
    pub log_file: Option<PathBuf>,
    pub touch_enabled: bool,
    pub delete_threashold: i64,
    pub scrub_enabled: bool,
    #[serde(deserialize_with = "string_or_number")]
    pub scrub_percentage: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub scrub_older_than: Option<String>,
    pub scrub_days_of_week: Vec<String>,
    pub output_status: bool,
    pub pushover_enabled: bool,
    pub pushover_app_key: Option<String>,
    pub pushover_user_key: Option<String>,
    pub update_check: Option<bool>,
}

/// Scrub parameters, present only when scrub may run today.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrubSettings {
    pub percentage: String,
    pub older_than: String,
}

/// Pushover credentials, present only when notifications are enabled.
#[derive(Clone, PartialEq, Eq)]
pub struct PushoverSettings {
    pub app_key: String,
    pub user_key: String,
}

impl fmt::Debug for PushoverSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushoverSettings")
            .field("app_key", &"<redacted>")
            .field("user_key", &"<redacted>")
            .finish()
    }
}

/// Validated, immutable configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub executable: String,
    pub log_file: PathBuf,
    pub touch_enabled: bool,
    pub delete_threshold: i64,
    pub scrub: Option<ScrubSettings>,
    pub output_status: bool,
    pub pushover: Option<PushoverSettings>,
    pub update_check: bool,
}

/// A validated config plus the features validation switched off.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub path: PathBuf,
    pub config: Config,
    pub notices: Vec<String>,
}

/// Decide which file to read.
///
/// An explicit path must exist. Without one, `snapsync.yaml` in `cwd` is used.
pub fn resolve_config_path(explicit: Option<&Path>, cwd: &Path) -> Result<PathBuf> {
    match explicit {
        Some(path) => {
            if !path.is_file() {
                anyhow::bail!(
                    "Config file {} does not exist or has bad permissions",
                    path.display()
                );
            }
            Ok(path.to_path_buf())
        }
        None => {
            let path = cwd.join(CONFIG_FILE_NAME);
            if !path.is_file() {
                anyhow::bail!(
                    "No config file provided and {CONFIG_FILE_NAME} not found in {}",
                    cwd.display()
                );
            }
            Ok(path)
        }
    }
}

/// Read and parse a config file without validating it.
pub fn read_config(path: &Path) -> Result<RawConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse YAML text into a [`RawConfig`].
pub fn parse_config(contents: &str) -> Result<RawConfig> {
    // An empty document deserializes to unit, not to a mapping.
    if contents.trim().is_empty() {
        return Ok(RawConfig::default());
    }
    Ok(serde_yaml::from_str(contents)?)
}

/// Resolve, read and validate the configuration for a run on `today`.
pub fn load_config(explicit: Option<&Path>, cwd: &Path, today: Weekday) -> Result<LoadedConfig> {
    let path = resolve_config_path(explicit, cwd)?;
    let raw = read_config(&path)?;
    let (config, notices) = raw.validate(today)?;
    Ok(LoadedConfig {
        path,
        config,
        notices,
    })
}

impl RawConfig {
    /// Check required values and switch off incomplete optional features.
    ///
    /// Returns the config and one notice per feature that was disabled.
    pub fn validate(self, today: Weekday) -> Result<(Config, Vec<String>)> {
        let mut notices = Vec::new();

        let executable = non_empty(self.executable).context("Executable not configured.")?;
        let log_file = self
            .log_file
            .filter(|p| !p.as_os_str().is_empty())
            .context("LogFile not configured.")?;
        if self.delete_threashold == 0 {
            anyhow::bail!("DeleteThreashold not configured.");
        }

        let pushover = if self.pushover_enabled {
            match (
                non_empty(self.pushover_app_key),
                non_empty(self.pushover_user_key),
            ) {
                (None, _) => {
                    notices.push(
                        "Pushover enabled but PushoverAppKey not provided, disabling pushover."
                            .to_string(),
                    );
                    None
                }
                (_, None) => {
                    notices.push(
                        "Pushover enabled but PushoverUserKey not provided, disabling pushover."
                            .to_string(),
                    );
                    None
                }
                (Some(app_key), Some(user_key)) => Some(PushoverSettings { app_key, user_key }),
            }
        } else {
            None
        };

        let scrub = if self.scrub_enabled {
            validate_scrub(
                self.scrub_percentage,
                self.scrub_older_than,
                &self.scrub_days_of_week,
                today,
                &mut notices,
            )
        } else {
            None
        };

        let config = Config {
            executable,
            log_file,
            touch_enabled: self.touch_enabled,
            delete_threshold: self.delete_threashold,
            scrub,
            output_status: self.output_status,
            pushover,
            update_check: self.update_check.unwrap_or(true),
        };

        Ok((config, notices))
    }
}

fn validate_scrub(
    percentage: Option<String>,
    older_than: Option<String>,
    day_names: &[String],
    today: Weekday,
    notices: &mut Vec<String>,
) -> Option<ScrubSettings> {
    let Some(percentage) = non_empty(percentage) else {
        notices.push("Scrub enabled but ScrubPercentage not configured, disabling scrub.".into());
        return None;
    };
    let Some(older_than) = non_empty(older_than) else {
        notices.push("Scrub enabled but ScrubOlderThan not configured, disabling scrub.".into());
        return None;
    };
    if day_names.is_empty() {
        notices.push("Scrub enabled but ScrubDaysOfWeek not configured, disabling scrub.".into());
        return None;
    }

    let mut days = Vec::with_capacity(day_names.len());
    for name in day_names {
        match name.trim().parse::<Weekday>() {
            Ok(day) => days.push(day),
            Err(_) => notices.push(format!(
                "Unknown weekday '{name}' in ScrubDaysOfWeek, ignoring it."
            )),
        }
    }

    if !days.contains(&today) {
        notices.push(format!(
            "Day of week ({today}) not in configured list for scrub, disabling scrub."
        ));
        return None;
    }

    Some(ScrubSettings {
        percentage,
        older_than,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Accept `ScrubPercentage: 10` as well as `ScrubPercentage: "10"`.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_yaml::Value>::deserialize(deserializer)? {
        None | Some(serde_yaml::Value::Null) => Ok(None),
        Some(serde_yaml::Value::String(s)) => Ok(Some(s)),
        Some(serde_yaml::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected a string or number, found {other:?}"
        ))),
    }
}
