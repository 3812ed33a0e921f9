//! snapsync: scheduled SnapRAID maintenance with push notifications.
//!
//! The library holds everything the binary does so it can be tested without
//! spawning the real tool: output classification and the run pipeline live
//! in [`core`]; the process runner, notifier, configuration, logging and
//! update check are the I/O around it.

pub mod config;
pub mod core;
pub mod logging;
pub mod notify;
pub mod snapraid;
pub mod update_check;

/// Version reported by `--version` and compared by the update check.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
