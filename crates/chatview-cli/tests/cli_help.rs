use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_shows_all_commands() {
    cargo_bin_cmd!("chatview")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("sessions"))
        .stdout(predicate::str::contains("send"))
        .stdout(predicate::str::contains("render"))
        .stdout(predicate::str::contains("--base-url"));
}

#[test]
fn test_sessions_help_shows_subcommands() {
    cargo_bin_cmd!("chatview")
        .args(["sessions", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("new"));
}

#[test]
fn test_chat_requires_terminal() {
    let home = tempfile::tempdir().unwrap();
    cargo_bin_cmd!("chatview")
        .env("CHATVIEW_HOME", home.path())
        .arg("chat")
        .assert()
        .failure()
        .stderr(predicate::str::contains("requires a terminal"));
}

#[test]
fn test_invalid_base_url_is_rejected() {
    let home = tempfile::tempdir().unwrap();
    cargo_bin_cmd!("chatview")
        .env("CHATVIEW_HOME", home.path())
        .args(["--base-url", "ftp://example.com", "sessions", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("http(s)"));
}
