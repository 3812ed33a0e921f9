/// snapsync - scheduled SnapRAID maintenance
///
/// Runs touch, diff, a delete-threshold check, sync, scrub and status in
/// sequence and reports each step through Pushover.
use anyhow::Result;

mod commands;

fn main() -> Result<()> {
    commands::run::run()
}
