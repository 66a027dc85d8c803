use std::io::Read;
use std::net::TcpListener;
use std::time::Duration;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn cmd(temp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("fnoter").unwrap();
    cmd.env("FNOTER_DIR", temp.path());
    cmd
}

#[test]
fn an_action_flag_is_required() {
    let temp = TempDir::new().unwrap();
    cmd(&temp)
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn add_and_view_require_a_path_value() {
    let temp = TempDir::new().unwrap();
    cmd(&temp).arg("--add").assert().failure();
    cmd(&temp).arg("--view").assert().failure();
}

#[test]
fn action_flags_are_mutually_exclusive() {
    let temp = TempDir::new().unwrap();
    cmd(&temp)
        .args(["--add", "a.txt", "--view-all"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn unknown_actions_are_rejected() {
    let temp = TempDir::new().unwrap();
    cmd(&temp)
        .arg("--frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unexpected argument"));
}

#[test]
fn help_lists_the_three_actions() {
    let temp = TempDir::new().unwrap();
    cmd(&temp)
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("--add")
                .and(predicate::str::contains("--view"))
                .and(predicate::str::contains("--view-all")),
        );
}

#[test]
fn version_reports_the_crate_version() {
    let temp = TempDir::new().unwrap();
    cmd(&temp)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

/// Runs the binary against a fake already-running instance and returns
/// the request it forwarded.
fn forwarded_request(args: &[&str]) -> serde_json::Value {
    let temp = TempDir::new().unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    std::fs::write(
        temp.path().join("config.toml"),
        format!("[server]\nport = {port}\n"),
    )
    .unwrap();

    let accept = std::thread::spawn(move || {
        let (mut conn, _) = listener.accept().unwrap();
        let mut buf = Vec::new();
        conn.read_to_end(&mut buf).unwrap();
        buf
    });

    cmd(&temp)
        .args(args)
        .timeout(Duration::from_secs(10))
        .assert()
        .success();

    let bytes = accept.join().unwrap();
    serde_json::from_slice(&bytes).expect("forwarded request parses as JSON")
}

#[test]
fn delivery_to_a_running_peer_exits_zero() {
    let request = forwarded_request(&["--view-all"]);
    assert_eq!(request["action"], "--view-all");
    assert_eq!(request["file_path"], serde_json::Value::Null);
}

#[test]
fn forwarded_add_carries_the_path() {
    let request = forwarded_request(&["--add", "/tmp/report.txt"]);
    assert_eq!(request["action"], "--add");
    assert_eq!(request["file_path"], "/tmp/report.txt");
}
