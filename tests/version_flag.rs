use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn prints_version() {
    Command::cargo_bin("recview")
        .expect("recview binary")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn prints_help() {
    Command::cargo_bin("recview")
        .expect("recview binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("RecView").and(predicate::str::contains("--version")));
}
