use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn test_help_command() {
    let mut cmd = cargo_bin_cmd!("orc-metadata");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Inspect the metadata of an ORC file",
        ))
        .stdout(predicate::str::contains("Check whether a file is ORC"))
        .stdout(predicate::str::contains(
            "List the compression codecs compiled into this build",
        ));
}

#[test]
fn test_version_command() {
    let mut cmd = cargo_bin_cmd!("orc-metadata");
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_inspect_help() {
    let mut cmd = cargo_bin_cmd!("orc-metadata");
    cmd.args(["inspect", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--schema"))
        .stdout(predicate::str::contains("--stripe-stats"))
        .stdout(predicate::str::contains("--no-stripe-footers"))
        .stdout(predicate::str::contains("--bloom-filters"))
        .stdout(predicate::str::contains("--tail-bytes"));
}

#[test]
fn test_missing_file_argument() {
    let mut cmd = cargo_bin_cmd!("orc-metadata");
    cmd.arg("inspect")
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn test_nonexistent_file() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("missing.orc");

    let mut cmd = cargo_bin_cmd!("orc-metadata");
    cmd.args(["inspect", missing.to_str().unwrap(), "--format", "text"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.orc"));
}

#[test]
fn test_invalid_output_format() {
    let mut cmd = cargo_bin_cmd!("orc-metadata");
    cmd.args(["codecs", "--format", "yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_debug_logging_goes_to_stderr() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("test.orc");
    orc_metadata::utils::test_data::TestOrc::single_row_builder().write(&file);

    let mut cmd = cargo_bin_cmd!("orc-metadata");
    cmd.env("RUST_LOG", "orc_metadata=debug")
        .args(["inspect", file.to_str().unwrap(), "--format", "json"])
        .assert()
        .success()
        .stderr(predicate::str::contains("read trailer"))
        .stdout(predicate::str::contains("read trailer").not());
}
