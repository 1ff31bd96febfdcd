//! CLI smoke tests for the radar-server binary.

use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;

fn run_radar_server(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_radar-server"))
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("Failed to execute radar-server")
}

/// Config file rooted in `dir`; `extra` is appended verbatim.
fn write_config(dir: &Path, name: &str, extra: &str) -> String {
    let home = dir.to_string_lossy().replace('\\', "/");
    let content = format!(
        r#"
server:
  home_dir: "{home}"
  host: "127.0.0.1"
  port: 8080

logging:
  default:
    console_level: info
    file: ""
    file_level: info
{extra}
"#
    );
    let path = dir.join(name);
    std::fs::write(&path, content).expect("Failed to write config file");
    path.to_string_lossy().to_string()
}

fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .map(|a| a.port())
        .expect("no free port")
}

#[test]
fn test_cli_help_command() {
    let output = run_radar_server(&["--help"]);
    assert!(output.status.success(), "Help command should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("radar-server"), "Should contain binary name");
    assert!(stdout.contains("Usage:"), "Should contain usage information");
    assert!(stdout.contains("run"), "Should contain 'run' subcommand");
    assert!(stdout.contains("check"), "Should contain 'check' subcommand");
    assert!(stdout.contains("--config"), "Should mention config option");
    assert!(stdout.contains("--mock"), "Should mention mock option");
}

#[test]
fn test_cli_version_command() {
    let output = run_radar_server(&["--version"]);
    assert!(output.status.success(), "Version command should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("radar-server"));
    assert!(stdout.chars().any(|c| c.is_ascii_digit()));
}

#[test]
fn test_cli_invalid_command() {
    let output = run_radar_server(&["invalid-command"]);
    assert!(!output.status.success(), "Invalid command should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("error") || stderr.contains("unrecognized"),
        "Should report the invalid command: {stderr}"
    );
}

#[test]
fn test_cli_config_validation_missing_file() {
    let output = run_radar_server(&["-c", "/nonexistent/config.yaml", "check"]);
    assert!(!output.status.success(), "Should fail with missing config");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("config file not found"),
        "Should mention the missing config file: {stderr}"
    );
}

#[test]
fn test_cli_config_validation_invalid_yaml() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("invalid.yaml");
    std::fs::write(&config_path, "invalid: yaml: content: [unclosed")
        .expect("Failed to write file");

    let output = run_radar_server(&["--config", config_path.to_str().unwrap(), "check"]);
    assert!(!output.status.success(), "Should fail with invalid YAML");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Failed to parse yaml config"),
        "Should mention YAML parsing issue: {stderr}"
    );
}

#[test]
fn test_cli_check_valid_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(
        temp_dir.path(),
        "valid.yaml",
        r#"
database:
  url: "sqlite://database/radar.db"

modules:
  radar:
    search_radius_meters: 2500
    freshness_window: 10m
"#,
    );

    let output = run_radar_server(&["--config", &config_path, "check"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        output.status.success(),
        "Should succeed with valid config\nSTDOUT: {stdout}\nSTDERR: {stderr}"
    );
    assert!(stdout.contains("Configuration check passed"));
}

#[test]
fn test_cli_check_rejects_bad_radar_settings() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(
        temp_dir.path(),
        "bad-radius.yaml",
        r#"
modules:
  radar:
    search_radius_meters: -1
"#,
    );

    let output = run_radar_server(&["--config", &config_path, "check"]);
    assert!(!output.status.success(), "Negative radius must be rejected");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("search_radius_meters"),
        "Should name the offending key: {stderr}"
    );
}

#[test]
fn test_cli_check_rejects_unknown_radar_keys() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(
        temp_dir.path(),
        "typo.yaml",
        r#"
modules:
  radar:
    search_radius: 100
"#,
    );

    let output = run_radar_server(&["--config", &config_path, "check"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid configuration for module 'radar'"), "{stderr}");
}

#[test]
fn test_cli_check_rejects_unsupported_database() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(
        temp_dir.path(),
        "mysql.yaml",
        r#"
database:
  url: "mysql://localhost/radar"
"#,
    );

    let output = run_radar_server(&["--config", &config_path, "check"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unsupported database type"), "{stderr}");
}

#[test]
fn test_cli_mock_flag_skips_database() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(
        temp_dir.path(),
        "mock.yaml",
        r#"
database:
  url: "mysql://localhost/nonexistent"
"#,
    );

    // --mock never touches the database section
    let output = run_radar_server(&["--config", &config_path, "--mock", "check"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        output.status.success(),
        "Should succeed with in-memory store: {stderr}"
    );
}

#[test]
fn test_cli_print_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(temp_dir.path(), "print.yaml", "");

    let output = run_radar_server(&["--config", &config_path, "--port", "9555", "--print-config"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("port: 9555"), "CLI port should win: {stdout}");
}

#[test]
fn test_cli_subcommand_help() {
    let output = run_radar_server(&["run", "--help"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Start the server"));

    let output = run_radar_server(&["check", "--help"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Check configuration"));
}

async fn probe(port: u16, request: &str) -> Option<String> {
    let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", port))
        .await
        .ok()?;
    stream.write_all(request.as_bytes()).await.ok()?;
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.ok()?;
    Some(String::from_utf8_lossy(&buf).to_string())
}

#[tokio::test]
async fn test_cli_run_serves_radar_api() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let port = free_port();
    let config_path = write_config(
        temp_dir.path(),
        "run.yaml",
        r#"
database:
  url: "sqlite://database/radar.db"
"#,
    );

    let mut child = tokio::process::Command::new(env!("CARGO_BIN_EXE_radar-server"))
        .args(["--config", &config_path, "--port", &port.to_string(), "run"])
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .expect("Failed to spawn radar-server");

    let health = timeout(Duration::from_secs(20), async {
        loop {
            let req = "GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n";
            if let Some(resp) = probe(port, req).await {
                return resp;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    })
    .await
    .expect("server did not come up");
    assert!(health.starts_with("HTTP/1.1 200"), "{health}");
    assert!(health.contains("healthy"));

    let body = r#"{"user_id":"alice","latitude":50.0755,"longitude":14.4378}"#;
    let req = format!(
        "POST /api/v1/update-location HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let scan = probe(port, &req).await.expect("update-location request failed");
    assert!(scan.starts_with("HTTP/1.1 200"), "{scan}");
    assert!(scan.contains("Radar scan complete"), "{scan}");

    assert!(
        temp_dir.path().join("database/radar.db").exists(),
        "relative SQLite path should resolve under home_dir"
    );

    child.kill().await.expect("Failed to stop radar-server");
}
