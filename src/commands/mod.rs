/// Command modules for snapsync
///
/// The binary has a single entry point that runs the whole maintenance
/// pipeline once; it is meant to be triggered by cron or a systemd timer.
pub mod run;
