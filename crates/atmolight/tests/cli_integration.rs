//! Integration tests for the `atmolight` binary.
//!
//! These tests exercise the CLI binary via `assert_cmd`. Everything runs
//! against temporary config files; nothing here needs lighting hardware.

use std::io::Read;
use std::net::TcpListener;
use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

fn cli() -> assert_cmd::Command {
    cargo_bin_cmd!("atmolight")
}

fn write_config(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("config.toml");
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
fn cli_help_succeeds() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("atmolight"))
        .stdout(predicate::str::contains("static-colors"));
}

#[test]
fn cli_version_prints_version() {
    cli()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

// ── config ──

#[test]
fn cli_config_json_produces_valid_json() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = write_config(dir.path(), "hue_port = 30000\n");
    let output = cli()
        .args(["--json", "--config"])
        .arg(&cfg)
        .arg("config")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value =
        serde_json::from_slice(&output).expect("config --json should produce valid JSON");
    assert_eq!(json["config_file_exists"], true);
    assert_eq!(json["settings"]["hue_port"], 30000);
    assert_eq!(json["settings"]["hue_ip"], "127.0.0.1");
}

#[test]
fn cli_config_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    cli()
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("not found, using defaults"))
        .stdout(predicate::str::contains("20123"));
}

#[test]
fn cli_config_path_prints_custom_path() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = dir.path().join("custom.toml");
    cli()
        .arg("--config")
        .arg(&cfg)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("custom.toml"));
}

#[test]
fn cli_validate_accepts_remote_helper_config() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = write_config(dir.path(), "hue_is_remote_machine = true\n");
    cli()
        .arg("--config")
        .arg(&cfg)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("valid"));
}

#[test]
fn cli_validate_reports_every_problem() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = write_config(
        dir.path(),
        "static_color = \"nope\"\nhue_port = 0\nhue_path = \"\"\natmowin_baud_rate = 0\n",
    );
    let output = cli()
        .args(["--json", "--config"])
        .arg(&cfg)
        .args(["config", "validate"])
        .assert()
        .failure()
        .get_output()
        .stdout
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["valid"], false);
    assert_eq!(json["errors"].as_array().unwrap().len(), 4);
}

#[test]
fn cli_config_init_writes_loadable_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = dir.path().join("sub").join("config.toml");
    cli()
        .arg("--config")
        .arg(&cfg)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
    let text = std::fs::read_to_string(&cfg).unwrap();
    assert!(text.starts_with("# AtmoLight configuration"));
    assert!(text.contains("hue_port"));
    let output = cli()
        .args(["--json", "--config"])
        .arg(&cfg)
        .arg("config")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["config_file_exists"], true);
    assert_eq!(json["settings"]["hue_start"], true);
}

#[test]
fn cli_config_init_keeps_existing_file_without_force() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = write_config(dir.path(), "hue_port = 30000\n");
    cli()
        .arg("--config")
        .arg(&cfg)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
    assert_eq!(std::fs::read_to_string(&cfg).unwrap(), "hue_port = 30000\n");

    cli()
        .arg("--config")
        .arg(&cfg)
        .args(["config", "init", "--force"])
        .assert()
        .success();
    let text = std::fs::read_to_string(&cfg).unwrap();
    assert!(text.starts_with("# AtmoLight configuration"));
    assert!(text.contains("hue_port = 30000"));
    assert!(text.contains("static_color"));
}

// ── --verbose flag ──

#[test]
fn cli_verbose_flag_accepted() {
    let dir = tempfile::tempdir().unwrap();
    cli()
        .args(["-vv", "--config"])
        .arg(dir.path().join("c.toml"))
        .arg("config")
        .assert()
        .success();
}

// ── frame ──

#[test]
fn cli_frame_reports_average_color() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = dir.path().join("config.toml");
    let raw = dir.path().join("frame.raw");
    // 2x1 BGRX: pure red and a gray pixel that is ignored
    std::fs::write(&raw, [0, 0, 255, 0, 128, 128, 128, 0]).unwrap();

    cli()
        .arg("--config")
        .arg(&cfg)
        .arg("frame")
        .arg(&raw)
        .args(["--width", "2", "--height", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#FF0000"))
        .stdout(predicate::str::contains("ATMOLIGHT,Color,255,0,0,200,0"));
}

#[test]
fn cli_frame_all_gray_has_no_color() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = dir.path().join("config.toml");
    let raw = dir.path().join("gray.raw");
    std::fs::write(&raw, [90u8; 12]).unwrap();

    let output = cli()
        .args(["--json", "--config"])
        .arg(&cfg)
        .arg("frame")
        .arg(&raw)
        .args(["--width", "2", "--height", "2", "--bpp", "3"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert!(json["color"].is_null());
    assert!(json["command"].is_null());
    assert_eq!(json["strategy"], "average");
}

#[test]
fn cli_frame_vu_meter_uses_edge_strategy() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = dir.path().join("config.toml");
    let raw = dir.path().join("vu.raw");
    // 1x1 BGR: a single blue pixel
    std::fs::write(&raw, [255, 0, 0]).unwrap();

    let output = cli()
        .args(["--json", "--config"])
        .arg(&cfg)
        .arg("frame")
        .arg(&raw)
        .args(["--width", "1", "--height", "1", "--bpp", "3"])
        .args(["--effect", "vu-meter"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["strategy"], "edge");
    assert_eq!(json["color"], "#0000FF");
}

#[test]
fn cli_frame_rejects_unknown_effect() {
    let dir = tempfile::tempdir().unwrap();
    let raw = dir.path().join("f.raw");
    std::fs::write(&raw, [0u8; 4]).unwrap();
    cli()
        .arg("--config")
        .arg(dir.path().join("config.toml"))
        .arg("frame")
        .arg(&raw)
        .args(["--width", "1", "--height", "1", "--effect", "disco"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown effect"));
}

// ── helper settings ──

#[test]
fn cli_groups_lists_helper_groups() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("settings.xml"),
        "<Settings><LedLocation><Location>Desk</Location></LedLocation>\
         <LedStaticColor><Name>Sunset</Name></LedStaticColor></Settings>",
    )
    .unwrap();
    let helper = dir.path().join("AtmoHue.exe");
    let cfg = write_config(
        dir.path(),
        &format!("hue_path = {:?}\n", helper.to_string_lossy()),
    );

    cli()
        .arg("--config")
        .arg(&cfg)
        .arg("groups")
        .assert()
        .success()
        .stdout(predicate::str::contains("Desk"));

    cli()
        .args(["--json", "--config"])
        .arg(&cfg)
        .arg("static-colors")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"Sunset\""));
}

#[test]
fn cli_groups_requires_helper_path() {
    let dir = tempfile::tempdir().unwrap();
    cli()
        .arg("--config")
        .arg(dir.path().join("config.toml"))
        .arg("groups")
        .assert()
        .failure()
        .stderr(predicate::str::contains("hue_path"));
}

// ── target control ──

#[test]
fn cli_color_sends_over_tcp() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let dir = tempfile::tempdir().unwrap();
    let cfg = write_config(
        dir.path(),
        &format!("hue_port = {port}\nhue_is_remote_machine = true\nhue_reconnect_attempts = 0\n"),
    );

    let server = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut buf = String::new();
        stream.read_to_string(&mut buf).unwrap();
        buf
    });

    cli()
        .arg("--config")
        .arg(&cfg)
        .args(["color", "#00FF00"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Sent #00FF00"));

    let received = server.join().unwrap();
    assert!(
        received.contains("ATMOLIGHT,Color,0,255,0,10,0"),
        "got: {received}"
    );
}

#[test]
fn cli_color_fails_without_helper() {
    let dir = tempfile::tempdir().unwrap();
    // Helper missing and launch disabled: setup error, no retries
    let cfg = write_config(
        dir.path(),
        "hue_start = false\nhue_path = \"/nonexistent/AtmoHue.exe\"\n",
    );
    cli()
        .arg("--config")
        .arg(&cfg)
        .args(["color", "red"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not connected"));
}

#[test]
fn cli_color_rejects_bad_color() {
    let dir = tempfile::tempdir().unwrap();
    cli()
        .arg("--config")
        .arg(dir.path().join("config.toml"))
        .args(["color", "notacolor"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid color"));
}

#[test]
fn cli_subcommand_help_succeeds() {
    for sub in ["connect", "effect", "power", "group", "group-color", "room"] {
        cli().args([sub, "--help"]).assert().success();
    }
}
