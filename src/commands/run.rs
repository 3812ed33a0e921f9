use anyhow::{Context, Result};
use chrono::Datelike;
use clap::Parser;
use snapsync::{
    config::{load_config, LoadedConfig},
    core::{Pipeline, PipelineOutcome},
    logging::init_logging,
    notify::notifier_for,
    snapraid::SnapraidRunner,
    update_check,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "snapsync")]
#[command(version = snapsync::VERSION)]
#[command(about = "Run SnapRAID maintenance: diff, threshold-gated sync, scrub and status")]
#[command(long_about = r#"
Runs one SnapRAID maintenance pass and reports each step via Pushover.

  1. touch   (optional) set sub-second timestamps on files
  2. diff    count added and removed files
  3. sync    skipped when removed files exceed DeleteThreashold
  4. scrub   (optional) only on the configured days of the week
  5. status  (optional) report scrub age and any array errors

Configuration is read from --config, or from snapsync.yaml in the current
directory when no path is given.
"#)]
pub struct Args {
    #[arg(short, long, value_name = "PATH", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "Log debug output, including every snapraid command")]
    verbose: bool,

    #[arg(long, help = "Skip the check for a newer snapsync release")]
    no_update_check: bool,
}

pub fn run() -> Result<()> {
    let args = Args::parse();

    let cwd = std::env::current_dir().context("Failed to get current working directory")?;
    let today = chrono::Local::now().weekday();

    eprintln!("Loading config...");
    let loaded = load_config(args.config.as_deref(), &cwd, today)?;

    let _guard = init_logging(&loaded.config.log_file, args.verbose)?;
    report_config(&loaded);

    if let Some(notification) =
        update_check::maybe_check_for_update(loaded.config.update_check && !args.no_update_check)
    {
        update_check::log_notification(&notification);
    }

    run_pipeline(&loaded)
}

fn report_config(loaded: &LoadedConfig) {
    tracing::info!("Loaded config from {}", loaded.path.display());
    for notice in &loaded.notices {
        tracing::warn!("{notice}");
    }
    tracing::debug!("config: {:?}", loaded.config);
}

fn run_pipeline(loaded: &LoadedConfig) -> Result<()> {
    let config = &loaded.config;

    let mut runner =
        SnapraidRunner::locate(&config.executable).inspect_err(|e| tracing::error!("{e:#}"))?;
    tracing::debug!("Using executable {}", runner.executable().display());

    let mut notifier = notifier_for(config.pushover.as_ref())?;

    let outcome = Pipeline::new(config, &mut runner, notifier.as_mut()).run()?;

    match outcome {
        PipelineOutcome::Completed(summary) => {
            tracing::debug!(
                "Run finished: {} added, {} removed",
                summary.diff.added,
                summary.diff.removed
            );
        }
        PipelineOutcome::Skipped { diff, .. } => {
            tracing::warn!(
                "Sync skipped: {} removed files exceed threshold {}",
                diff.removed,
                config.delete_threshold
            );
        }
    }

    Ok(())
}
