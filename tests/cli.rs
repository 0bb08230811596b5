use assert_cmd::Command;
use predicates::prelude::*;

fn cache_cli() -> Command {
    Command::cargo_bin("cache-cli").unwrap()
}

#[test]
fn put_then_get_round_trips() {
    let tmp = tempfile::tempdir().unwrap();

    cache_cli()
        .args(["--dir", tmp.path().to_str().unwrap(), "put", "k", "v"])
        .assert()
        .success();

    cache_cli()
        .args(["--dir", tmp.path().to_str().unwrap(), "get", "k"])
        .assert()
        .success()
        .stdout(predicate::str::contains("v"));
}

#[test]
fn get_on_missing_key_reports_not_found() {
    let tmp = tempfile::tempdir().unwrap();

    cache_cli()
        .args(["--dir", tmp.path().to_str().unwrap(), "get", "missing"])
        .assert()
        .success()
        .stdout(predicate::str::contains("key not found"));
}

#[test]
fn rm_then_get_reports_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().to_str().unwrap();

    cache_cli().args(["--dir", dir, "put", "k", "v"]).assert().success();
    cache_cli().args(["--dir", dir, "rm", "k"]).assert().success();
    cache_cli()
        .args(["--dir", dir, "get", "k"])
        .assert()
        .success()
        .stdout(predicate::str::contains("key not found"));
}

#[test]
fn stat_reports_entry_count_after_put() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().to_str().unwrap();

    cache_cli().args(["--dir", dir, "put", "k", "hello"]).assert().success();
    cache_cli()
        .args(["--dir", dir, "stat"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 entries"));
}

#[test]
fn compact_leaves_data_readable() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().to_str().unwrap();

    cache_cli().args(["--dir", dir, "put", "k", "v"]).assert().success();
    cache_cli().args(["--dir", dir, "compact"]).assert().success();
    cache_cli()
        .args(["--dir", dir, "get", "k"])
        .assert()
        .success()
        .stdout(predicate::str::contains("v"));
}
