//! Command-line argument handling

use assert_cmd::Command;

fn cli() -> Command {
    Command::cargo_bin("fitbit-export").unwrap()
}

#[test]
fn test_help_lists_export_commands() {
    let output = cli().arg("--help").output().unwrap();
    assert!(output.status.success());
    let help = String::from_utf8_lossy(&output.stdout);
    for command in ["dump-activity-tcx", "dump-weight", "dump-activity", "dump-all"] {
        assert!(help.contains(command), "missing {command} in help");
    }
}

#[test]
fn test_start_date_is_required() {
    cli().arg("dump-weight").assert().failure();
}

#[test]
fn test_malformed_date_is_rejected() {
    let output = cli()
        .args(["dump-weight", "-s", "01/02/2023"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("YYYY-MM-DD"));
}

#[test]
fn test_start_after_end_fails_before_any_request() {
    let dir = tempfile::TempDir::new().unwrap();
    cli()
        .args(["dump-all", "-s", "2023-03-01", "-e", "2023-02-01"])
        .args(["--api-base-url", "http://127.0.0.1:1"])
        .arg("-c")
        .arg(dir.path().join("cache"))
        .arg("-d")
        .arg(dir.path().join("out"))
        .assert()
        .failure()
        .code(1);
    assert!(!dir.path().join("cache").exists());
}
