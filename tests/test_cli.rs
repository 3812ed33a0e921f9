//! End-to-end runs of the snapsync binary against a fake snapraid script.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn snapsync(cwd: &Path) -> Command {
    let mut cmd = Command::cargo_bin("snapsync").unwrap();
    cmd.current_dir(cwd)
        .env("SNAPSYNC_NO_UPDATE_CHECK", "1")
        .env_remove("RUST_LOG")
        .arg("--no-update-check");
    cmd
}

#[test]
fn test_missing_default_config_fails() {
    let temp = TempDir::new().unwrap();

    snapsync(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("snapsync.yaml"));
}

#[test]
fn test_missing_explicit_config_fails() {
    let temp = TempDir::new().unwrap();

    snapsync(temp.path())
        .args(["--config", "nope.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_config_missing_threshold_fails() {
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join("snapsync.yaml"),
        "Executable: snapraid\nLogFile: snapsync.log\n",
    )
    .unwrap();

    snapsync(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("DeleteThreashold not configured"));
}

#[test]
fn test_help_lists_config_flag() {
    let temp = TempDir::new().unwrap();

    snapsync(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--config"));
}

#[cfg(unix)]
mod fake_tool {
    use super::*;
    use serial_test::serial;
    use std::os::unix::fs::PermissionsExt;

    const SYNC_OK: &str = r"printf '0%%\r100%% completed, 5 MB accessed in 0:00\n\nEverything OK\n'";
    const SYNC_NOT_OK: &str = r"printf '100%% completed, 5 MB accessed in 0:00\n'";

    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new(diff: &str, sync: &str) -> Self {
            Self::with_scrub(
                diff,
                sync,
                r"printf '100%% completed, 1 MB accessed in 0:00\nEverything OK\n'",
            )
        }

        /// Write a fake snapraid that records each subcommand in `calls.txt`.
        fn with_scrub(diff: &str, sync: &str, scrub: &str) -> Self {
            let dir = TempDir::new().unwrap();
            let calls = dir.path().join("calls.txt");
            let script = format!(
                "#!/bin/sh\n\
                 echo \"$@\" >> '{calls}'\n\
                 case \"$1\" in\n\
                   diff) {diff}; exit 2 ;;\n\
                   sync) {sync} ;;\n\
                   scrub) {scrub} ;;\n\
                   status) echo 'The oldest block was scrubbed 3 days ago'; echo 'The 10% of the array is not scrubbed.' ;;\n\
                 esac\n",
                calls = calls.display(),
            );
            let exe = dir.path().join("snapraid");
            std::fs::write(&exe, script).unwrap();
            let mut perms = std::fs::metadata(&exe).unwrap().permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&exe, perms).unwrap();

            Self { dir }
        }

        fn write_config(&self, extra: &str) {
            let config = format!(
                "Executable: '{}'\nLogFile: '{}'\nDeleteThreashold: 5\n{extra}",
                self.dir.path().join("snapraid").display(),
                self.log_path().display(),
            );
            std::fs::write(self.dir.path().join("snapsync.yaml"), config).unwrap();
        }

        fn log_path(&self) -> PathBuf {
            self.dir.path().join("logs").join("snapsync.log")
        }

        fn log(&self) -> String {
            std::fs::read_to_string(self.log_path()).unwrap_or_default()
        }

        fn calls(&self) -> Vec<String> {
            std::fs::read_to_string(self.dir.path().join("calls.txt"))
                .unwrap_or_default()
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    #[test]
    #[serial]
    fn test_full_run_succeeds() {
        let fixture = Fixture::new(r"printf 'add a\nadd b\nremove c\n'", SYNC_OK);
        fixture.write_config("TouchEnabled: true\nOutputStatus: true\n");

        snapsync(fixture.dir.path()).assert().success();

        assert_eq!(fixture.calls(), vec!["touch", "diff", "sync", "status"]);
        let log = fixture.log();
        assert!(log.contains("Added files: 2"), "log was:\n{log}");
        assert!(log.contains("Removed files: 1"), "log was:\n{log}");
        assert!(log.contains("Snapsync completed successfully"), "log was:\n{log}");
    }

    #[test]
    #[serial]
    fn test_threshold_exceeded_skips_sync() {
        let fixture = Fixture::new(
            r"i=0; while [ $i -lt 10 ]; do echo remove f$i; i=$((i+1)); done",
            SYNC_OK,
        );
        fixture.write_config("OutputStatus: true\n");

        snapsync(fixture.dir.path()).assert().success();

        assert_eq!(fixture.calls(), vec!["diff"]);
        let log = fixture.log();
        assert!(
            log.contains("Removed files 10 does not meet threshold of 5"),
            "log was:\n{log}"
        );
    }

    #[test]
    #[serial]
    fn test_sync_without_everything_ok_fails() {
        let fixture = Fixture::new("true", SYNC_NOT_OK);
        fixture.write_config("OutputStatus: true\n");

        snapsync(fixture.dir.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("sync did not complete"));

        assert_eq!(fixture.calls(), vec!["diff", "sync"]);
    }

    #[test]
    #[serial]
    fn test_scrub_skipped_on_unlisted_day() {
        let fixture = Fixture::new("true", SYNC_OK);
        // No weekday name parses, so today can never match.
        fixture.write_config(
            "ScrubEnabled: true\nScrubPercentage: 5\nScrubOlderThan: 10\nScrubDaysOfWeek: [Someday]\n",
        );

        snapsync(fixture.dir.path()).assert().success();

        assert_eq!(fixture.calls(), vec!["diff", "sync"]);
        assert!(fixture.log().contains("disabling scrub"));
    }

    #[test]
    #[serial]
    fn test_scrub_runs_every_day_when_all_days_listed() {
        let fixture = Fixture::new("true", SYNC_OK);
        fixture.write_config(
            "ScrubEnabled: true\nScrubPercentage: 5\nScrubOlderThan: 10\n\
             ScrubDaysOfWeek: [Monday, Tuesday, Wednesday, Thursday, Friday, Saturday, Sunday]\n",
        );

        snapsync(fixture.dir.path()).assert().success();

        assert_eq!(
            fixture.calls(),
            vec!["diff", "sync", "scrub --percentage 5 --older-than 10"]
        );
    }

    #[test]
    #[serial]
    fn test_scrub_failure_logs_raw_output() {
        let fixture = Fixture::with_scrub(
            "true",
            SYNC_OK,
            r"printf '100%% completed, 1 MB accessed in 0:00\nDANGER! 3 blocks damaged\n'",
        );
        fixture.write_config(
            "ScrubEnabled: true\nScrubPercentage: 5\nScrubOlderThan: 10\nOutputStatus: true\n\
             ScrubDaysOfWeek: [Monday, Tuesday, Wednesday, Thursday, Friday, Saturday, Sunday]\n",
        );

        snapsync(fixture.dir.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("scrub did not complete"));

        assert_eq!(
            fixture.calls(),
            vec!["diff", "sync", "scrub --percentage 5 --older-than 10"]
        );
        let log = fixture.log();
        assert!(log.contains("Scrub Output"), "log was:\n{log}");
        assert!(log.contains("DANGER! 3 blocks damaged"), "log was:\n{log}");
    }

    #[test]
    #[serial]
    fn test_missing_executable_fails() {
        let fixture = Fixture::new("true", SYNC_OK);
        std::fs::write(
            fixture.dir.path().join("snapsync.yaml"),
            format!(
                "Executable: '{}'\nLogFile: '{}'\nDeleteThreashold: 5\n",
                fixture.dir.path().join("missing-snapraid").display(),
                fixture.log_path().display(),
            ),
        )
        .unwrap();

        snapsync(fixture.dir.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("Executable not found"));
    }
}
