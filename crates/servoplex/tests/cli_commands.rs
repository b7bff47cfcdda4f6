#![cfg(all(unix, feature = "cli"))]

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::process::{Command, Output};
use std::thread::{self, JoinHandle};

fn servoplex(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_servoplex"))
        .args(["--log-level", "error"])
        .args(args)
        .env_remove("SERVOPLEX_SERVER")
        .env_remove("SERVOPLEX_ASSUME_ACTIVE")
        .env_remove("SERVOPLEX_LOG")
        .output()
        .expect("servoplex should run")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(stdout.trim()).expect("stdout should be one JSON document")
}

/// Answer `count` requests with 200 and return their request lines.
fn bridge(count: usize) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
    let addr = listener.local_addr().expect("local addr").to_string();
    let handle = thread::spawn(move || {
        let mut lines = Vec::new();
        for _ in 0..count {
            let (mut stream, _) = listener.accept().expect("accept should succeed");
            let mut reader = BufReader::new(stream.try_clone().expect("clone should succeed"));
            let mut request_line = String::new();
            reader.read_line(&mut request_line).expect("request line");
            loop {
                let mut header = String::new();
                reader.read_line(&mut header).expect("header line");
                if header == "\r\n" || header.is_empty() {
                    break;
                }
            }
            lines.push(request_line.trim_end().to_string());
            stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok")
                .expect("response should be written");
        }
        lines
    });
    (addr, handle)
}

#[test]
fn replay_reports_button_frame() {
    let output = servoplex(&["--format", "json", "replay", "--hex", "55 01 07 01 FF FF FF"]);

    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(
        json["events"],
        serde_json::json!([{"kind": "button", "id": 7, "pressed": true}])
    );
    assert_eq!(json["bytes"], 7);
    assert_eq!(json["resyncs"], 0);
    assert_eq!(json["leftover"], 0);
}

#[test]
fn replay_resyncs_over_leading_noise() {
    let output = servoplex(&[
        "--format",
        "json",
        "replay",
        "--hex",
        "00 13 55 03 40 00 FF FF FF 55 01 02 00 FF FF FF",
    ]);

    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(
        json["events"],
        serde_json::json!([
            {"kind": "slider", "channel": 1, "value": 64},
            {"kind": "button", "id": 2, "pressed": false}
        ])
    );
    assert_eq!(json["resyncs"], 2);
}

#[test]
fn replay_rejects_invalid_hex() {
    let output = servoplex(&["replay", "--hex", "55 0G"]);
    assert_eq!(output.status.code(), Some(64));
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid hex token"));
}

#[test]
fn move_rejects_out_of_range_actuator_before_contacting_bridge() {
    let output = servoplex(&["move", "9", "max", "--server", "127.0.0.1:1"]);
    assert_eq!(output.status.code(), Some(64));
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid actuator 9"));
}

#[test]
fn unreachable_bridge_is_transport_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
    let addr = listener.local_addr().expect("local addr").to_string();
    drop(listener);

    let output = servoplex(&["all-stop", "--server", &addr, "--link-timeout", "500ms"]);
    assert!(matches!(output.status.code(), Some(3) | Some(124)));
}

#[test]
fn move_walks_selection_then_acts() {
    let (addr, server) = bridge(3);

    let output = servoplex(&["--format", "json", "move", "2", "max", "--server", &addr]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let json = stdout_json(&output);
    assert_eq!(json["operation"], "move");
    assert_eq!(json["active_id"], 2);

    let lines = server.join().expect("bridge thread");
    assert_eq!(
        lines,
        vec![
            "GET /cmd?t=0&i=1&a=0&b=0 HTTP/1.1",
            "GET /cmd?t=0&i=1&a=0&b=0 HTTP/1.1",
            "GET /cmd?t=1&i=5&a=0&b=0 HTTP/1.1",
        ]
    );
}

#[test]
fn assumed_selection_walks_backwards() {
    let (addr, server) = bridge(2);

    let output = servoplex(&[
        "--format",
        "json",
        "active",
        "1",
        "--server",
        &addr,
        "--assume-active",
        "3",
    ]);

    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["active_id"], 1);
    let lines = server.join().expect("bridge thread");
    assert_eq!(lines, vec!["GET /cmd?t=0&i=-1&a=0&b=0 HTTP/1.1"; 2]);
}

#[test]
fn active_without_id_prints_assumed_selection() {
    let output = servoplex(&["--format", "json", "active", "--assume-active", "2"]);
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["active_id"], 2);

    let output = servoplex(&["active", "--assume-active", "4"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn wave_dry_run_prints_plan() {
    let output = servoplex(&["--format", "json", "wave", "1", "--dry-run"]);

    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["preset"], "wave");
    assert_eq!(json["actuators"], 4);

    let steps = json["steps"].as_array().expect("steps array");
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0]["step"], "sequence");
    assert_eq!(steps[0]["actions"].as_array().map(Vec::len), Some(8));
    assert_eq!(steps[0]["actions"][0]["speed"], "medium");
    assert_eq!(steps[0]["actions"][7]["actuator"], 0);
    assert_eq!(steps[0]["actions"][7]["position"], "min");
    assert_eq!(steps[1]["step"], "all_middle");
}

#[test]
fn self_test_dry_run_prints_plan() {
    let output = servoplex(&["--format", "json", "self-test", "--dry-run"]);

    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["preset"], "self_test");

    let steps = json["steps"].as_array().expect("steps array");
    let kinds: Vec<&str> = steps.iter().filter_map(|s| s["step"].as_str()).collect();
    assert_eq!(
        kinds,
        vec!["all_middle", "pause", "sequence", "sequence", "sequence", "all_middle", "all_middle"]
    );
    assert_eq!(steps[1]["ms"], 2000);
    assert_eq!(steps[2]["actions"].as_array().map(Vec::len), Some(12));
    assert_eq!(steps[3]["actions"][0]["speed"], "fast");
    assert_eq!(steps[6]["speed"], "medium");
}

#[test]
fn wave_rejects_zero_cycles() {
    let output = servoplex(&["wave", "0", "--dry-run"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn display_on_missing_port_is_transport_failure() {
    let output = servoplex(&[
        "display",
        "/dev/servoplex-does-not-exist",
        "message",
        "hello",
    ]);
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn version_prints_package_version() {
    let output = servoplex(&["version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        format!("servoplex {}", env!("CARGO_PKG_VERSION"))
    );
}
