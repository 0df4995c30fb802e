// Integration tests for the `airsheet` binary.
// Run with: cargo test -p airsheet-cli --test cli_contract

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use httpmock::prelude::*;
use serde_json::{json, Value};

const PATH: &str = "/api/v3/ide/file/file-1/script/script-1/sync_task";

/// Binary with an empty config dir and no AIRSCRIPT_* leaking in.
fn airsheet(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_airsheet"));
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"));
    cmd.env("HOME", home);
    cmd.env("XDG_CONFIG_HOME", home.join(".config"));
    for var in ["AIRSCRIPT_BASE_URL", "AIRSCRIPT_FILE_ID", "AIRSCRIPT_SCRIPT_ID", "AIRSCRIPT_TOKEN"] {
        cmd.env_remove(var);
    }
    cmd
}

fn connected(home: &Path, server: &MockServer) -> Command {
    let mut cmd = airsheet(home);
    cmd.args([
        "--base-url", &server.base_url(),
        "--file-id", "file-1",
        "--script-id", "script-1",
        "--token", "tok-abc",
    ]);
    cmd
}

fn envelope(result: &str) -> Value {
    json!({ "data": { "result": result, "logs": [] }, "error": "", "status": "finished" })
}

fn assert_exit(output: &Output, code: i32) {
    assert_eq!(
        output.status.code(),
        Some(code),
        "expected exit {}, got {:?}\nstdout: {}\nstderr: {}",
        code,
        output.status.code(),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr),
    );
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

#[test]
fn missing_config_exits_10() {
    let home = tempfile::tempdir().unwrap();
    let output = airsheet(home.path()).args(["get", "A1"]).output().expect("failed to run airsheet");

    assert_exit(&output, 10);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not configured"), "stderr: {}", stderr);
    assert!(stderr.contains("airsheet login"), "stderr: {}", stderr);
}

#[test]
fn bad_start_cell_exits_3_without_request() {
    let home = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path(PATH);
        then.status(200).json_body(envelope("[]"));
    });

    let data = home.path().join("data.csv");
    std::fs::write(&data, "a,b\n1,2\n").unwrap();

    let output = connected(home.path(), &server)
        .args(["write", data.to_str().unwrap(), "--start", "1A"])
        .output()
        .expect("failed to run airsheet");

    assert_exit(&output, 3);
    mock.assert_calls(0);
}

#[test]
fn bad_column_exits_3() {
    let home = tempfile::tempdir().unwrap();
    let output = airsheet(home.path())
        .args(["cols", "insert", "B2"])
        .output()
        .expect("failed to run airsheet");
    assert_exit(&output, 3);
}

#[test]
fn get_prints_cell_value() {
    let home = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path(PATH)
            .header("AirScript-Token", "tok-abc")
            .json_body(json!({
                "Context": {
                    "argv": { "function": "getCellValue", "address": "B2" },
                    "active_sheet": "Data"
                }
            }));
        then.status(200)
            .json_body(envelope("[{\"success\":true,\"address\":\"B2\",\"value\":42}]"));
    });

    let output = connected(home.path(), &server)
        .args(["--sheet", "Data", "get", "B2"])
        .output()
        .expect("failed to run airsheet");

    assert_exit(&output, 0);
    mock.assert();
    assert_eq!(stdout_json(&output), json!(42));
}

#[test]
fn set_sends_text_when_forced() {
    let home = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path(PATH).json_body(json!({
            "Context": { "argv": { "function": "setCellValue", "address": "C3", "value": "007" } }
        }));
        then.status(200)
            .json_body(envelope("[{\"success\":true,\"message\":\"ok\"}]"));
    });

    let output = connected(home.path(), &server)
        .args(["set", "C3", "007", "--text"])
        .output()
        .expect("failed to run airsheet");

    assert_exit(&output, 0);
    mock.assert();
    assert_eq!(stdout_json(&output), json!({ "message": "ok" }));
}

#[test]
fn write_from_stdin_sizes_the_range() {
    let home = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path(PATH).json_body(json!({
            "Context": {
                "argv": {
                    "function": "setRangeValues",
                    "address": "B2:C4",
                    "values": [["Name", "Age"], ["Alice", 25], ["Bob", ""]]
                }
            }
        }));
        then.status(200).json_body(envelope("[{\"success\":true}]"));
    });

    let mut child = connected(home.path(), &server)
        .args(["write", "-f", "csv", "--start", "B2"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to run airsheet");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"Name,Age\nAlice,25\nBob\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();

    assert_exit(&output, 0);
    mock.assert();
    assert_eq!(stdout_json(&output), json!({ "range": "B2:C4", "rows": 3, "columns": 2 }));
}

#[test]
fn read_as_csv() {
    let home = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(PATH);
        then.status(200).json_body(envelope(
            "[{\"success\":true,\"address\":\"A1:B2\",\"values\":[[\"x\",1],[true,null]]}]",
        ));
    });

    let output = connected(home.path(), &server)
        .args(["read", "A1:B2", "--to", "csv"])
        .output()
        .expect("failed to run airsheet");

    assert_exit(&output, 0);
    assert_eq!(String::from_utf8_lossy(&output.stdout), "x,1\nTRUE,\n");
}

#[test]
fn call_passes_raw_arguments() {
    let home = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path(PATH).json_body(json!({
            "Context": { "argv": { "function": "customFn", "n": 3, "label": "hello" } }
        }));
        then.status(200).json_body(envelope("[[1,2,3]]"));
    });

    let output = connected(home.path(), &server)
        .args(["call", "customFn", "--arg", "n=3", "--arg", "label=hello"])
        .output()
        .expect("failed to run airsheet");

    assert_exit(&output, 0);
    mock.assert();
    assert_eq!(stdout_json(&output), json!([1, 2, 3]));
}

#[test]
fn call_with_undefined_result_prints_envelope() {
    let home = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(PATH);
        then.status(200).json_body(envelope("[Undefined]"));
    });

    let output = connected(home.path(), &server)
        .args(["call", "noop"])
        .output()
        .expect("failed to run airsheet");

    assert_exit(&output, 0);
    assert_eq!(stdout_json(&output)["status"], json!("finished"));
}

#[test]
fn remote_failure_exits_6() {
    let home = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(PATH);
        then.status(200)
            .json_body(envelope("[{\"success\":false,\"message\":\"sheet not found\"}]"));
    });

    let output = connected(home.path(), &server)
        .args(["sheets", "delete", "Missing"])
        .output()
        .expect("failed to run airsheet");

    assert_exit(&output, 6);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("sheet not found"), "stderr: {}", stderr);
}

#[test]
fn http_error_exits_12_with_body_hint() {
    let home = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(PATH);
        then.status(500).body("script crashed");
    });

    let output = connected(home.path(), &server)
        .args(["sheets", "count"])
        .output()
        .expect("failed to run airsheet");

    assert_exit(&output, 12);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("HTTP 500"), "stderr: {}", stderr);
    assert!(stderr.contains("script crashed"), "stderr: {}", stderr);
}

#[test]
fn unreachable_server_exits_11() {
    let home = tempfile::tempdir().unwrap();
    let output = airsheet(home.path())
        .args([
            "--base-url", "http://127.0.0.1:9",
            "--file-id", "f", "--script-id", "s", "--token", "t",
            "--timeout", "2",
            "sheets", "count",
        ])
        .output()
        .expect("failed to run airsheet");
    assert_exit(&output, 11);
}

#[test]
fn login_saves_config_for_later_commands() {
    let home = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    let count = server.mock(|when, then| {
        when.method(POST).path(PATH).json_body(json!({
            "Context": { "argv": { "function": "getWorksheetCount" } }
        }));
        then.status(200).json_body(envelope("[{\"success\":true,\"count\":3}]"));
    });

    let output = connected(home.path(), &server)
        .arg("login")
        .output()
        .expect("failed to run airsheet");
    assert_exit(&output, 0);
    count.assert();

    // No connection flags this time: everything comes from the saved file.
    let output = airsheet(home.path())
        .args(["sheets", "count"])
        .output()
        .expect("failed to run airsheet");
    assert_exit(&output, 0);
    assert_eq!(stdout_json(&output), json!(3));
    count.assert_calls(2);

    let output = airsheet(home.path()).arg("logout").output().expect("failed to run airsheet");
    assert_exit(&output, 0);

    let output = airsheet(home.path())
        .args(["sheets", "count"])
        .output()
        .expect("failed to run airsheet");
    assert_exit(&output, 10);
}

#[test]
fn format_without_options_exits_2() {
    let home = tempfile::tempdir().unwrap();
    let output = airsheet(home.path())
        .args(["format", "A1:B2"])
        .output()
        .expect("failed to run airsheet");
    assert_exit(&output, 2);
}

#[test]
fn write_keeps_lossy_numbers_as_text() {
    let home = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    let typed = server.mock(|when, then| {
        when.method(POST).path(PATH).json_body(json!({
            "Context": {
                "argv": {
                    "function": "setRangeValues",
                    "address": "A1:C1",
                    "values": [["007", "1e3", 42]]
                }
            }
        }));
        then.status(200).json_body(envelope("[{\"success\":true}]"));
    });

    let data = home.path().join("codes.csv");
    std::fs::write(&data, "007,1e3,42\n").unwrap();

    let output = connected(home.path(), &server)
        .args(["write", data.to_str().unwrap()])
        .output()
        .expect("failed to run airsheet");
    assert_exit(&output, 0);
    typed.assert();

    let text = server.mock(|when, then| {
        when.method(POST).path(PATH).json_body(json!({
            "Context": {
                "argv": {
                    "function": "setRangeValues",
                    "address": "A1:C1",
                    "values": [["007", "1e3", "42"]]
                }
            }
        }));
        then.status(200).json_body(envelope("[{\"success\":true}]"));
    });

    let output = connected(home.path(), &server)
        .args(["write", data.to_str().unwrap(), "--text"])
        .output()
        .expect("failed to run airsheet");
    assert_exit(&output, 0);
    text.assert();
}

#[test]
fn zero_timeout_flag_exits_2() {
    let home = tempfile::tempdir().unwrap();
    let output = airsheet(home.path())
        .args(["--file-id", "f", "--script-id", "s", "--token", "t", "--timeout", "0", "sheets", "count"])
        .output()
        .expect("failed to run airsheet");
    assert_exit(&output, 2);
}

fn write_config(home: &Path, contents: &str) {
    let dir = home.join(".config/airsheet");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.json"), contents).unwrap();
}

#[test]
fn zero_timeout_in_config_exits_2() {
    let home = tempfile::tempdir().unwrap();
    write_config(
        home.path(),
        r#"{"file_id":"f","script_id":"s","token":"t","timeout_secs":0}"#,
    );

    let output = airsheet(home.path())
        .args(["sheets", "count"])
        .output()
        .expect("failed to run airsheet");
    assert_exit(&output, 2);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("timeout_secs"), "stderr: {}", stderr);
}

#[test]
fn corrupt_config_is_reported_not_ignored() {
    let home = tempfile::tempdir().unwrap();
    write_config(home.path(), "{ not json");

    let output = airsheet(home.path())
        .args(["sheets", "count"])
        .output()
        .expect("failed to run airsheet");
    assert_exit(&output, 1);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid config"), "stderr: {}", stderr);
    assert!(!stderr.contains("not configured"), "stderr: {}", stderr);

    // login still repairs it
    let output = airsheet(home.path())
        .args(["--file-id", "f", "--script-id", "s", "--token", "t", "login", "--no-verify"])
        .output()
        .expect("failed to run airsheet");
    assert_exit(&output, 0);

    let output = airsheet(home.path()).arg("config").output().expect("failed to run airsheet");
    assert_exit(&output, 0);
    assert_eq!(stdout_json(&output)["file_id"], json!("f"));
}
