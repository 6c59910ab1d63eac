//! CLI tests for the `statekeep` binary

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn statekeep(config_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("statekeep").unwrap();
    // point at a settings file that does not exist so defaults apply
    cmd.arg("--config").arg(config_dir.join("config.toml"));
    cmd
}

#[test]
fn test_inspect_missing_file() {
    let dir = tempdir().unwrap();
    statekeep(dir.path())
        .arg("inspect")
        .arg(dir.path().join("state.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("no persisted state"));
}

#[test]
fn test_init_then_inspect() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("state.json");

    statekeep(dir.path())
        .args(["init", "--at-version", "3"])
        .arg(&file)
        .assert()
        .success();
    assert_eq!(
        std::fs::read_to_string(&file).unwrap(),
        r#"{"version":3,"state":null}"#
    );

    statekeep(dir.path())
        .arg("inspect")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("version: 3"))
        .stdout(predicate::str::contains("state: null"));
}

#[test]
fn test_init_refuses_to_overwrite() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("state.json");
    std::fs::write(&file, r#"{"version":1,"state":{"counter":2}}"#).unwrap();

    statekeep(dir.path())
        .args(["init", "--at-version", "0"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    statekeep(dir.path())
        .args(["init", "--force", "--at-version", "0"])
        .arg(&file)
        .assert()
        .success();
}

#[test]
fn test_check_reports_direction() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("state.json");
    std::fs::write(&file, r#"{"version":2,"state":{}}"#).unwrap();

    statekeep(dir.path())
        .args(["check", "--target", "2"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("up to date at version 2"));

    statekeep(dir.path())
        .args(["check", "--target", "4"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("needs migration from version 2 to 4"));

    statekeep(dir.path())
        .args(["check", "--target", "1"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("downgrading is not supported"));
}

#[test]
fn test_check_rejects_malformed_envelope() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("state.json");
    std::fs::write(&file, r#"{"version":"two","state":{}}"#).unwrap();

    statekeep(dir.path())
        .args(["check", "--target", "2"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not a valid envelope"));
}

#[test]
fn test_rust_log_enables_debug_output() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("state.json");
    std::fs::write(&file, r#"{"version":1,"state":{"counter":2}}"#).unwrap();

    statekeep(dir.path())
        .env("RUST_LOG", "debug")
        .arg("inspect")
        .arg(&file)
        .assert()
        .success()
        .stderr(predicate::str::contains("Read persisted state"));

    // without RUST_LOG only warnings are shown
    statekeep(dir.path())
        .env_remove("RUST_LOG")
        .arg("inspect")
        .arg(&file)
        .assert()
        .success()
        .stderr(predicate::str::contains("Read persisted state").not());
}

#[test]
fn test_settings_file_supplies_defaults() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("state.json");
    std::fs::write(
        dir.path().join("config.toml"),
        format!(
            "[storage]\npath = {:?}\n\n[persist]\nversion = 5\n",
            file.display().to_string()
        ),
    )
    .unwrap();

    statekeep(dir.path()).arg("init").assert().success();
    statekeep(dir.path())
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("up to date at version 5"));
}
