use std::process::Command;

fn outbreak() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_outbreak"));
    let _ = command.env("RUST_LOG", "off");
    command
}

#[test]
fn prints_json_report_for_headless_run() {
    let output = outbreak()
        .args(["--steps", "12", "--agents", "6", "--seed", "3"])
        .output()
        .expect("failed to launch the outbreak binary");

    assert!(output.status.success(), "outbreak run should succeed");
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout holds the JSON report");
    assert_eq!(report["steps"], 12);
    assert_eq!(report["timeline"].as_array().map(Vec::len), Some(12));
    assert_eq!(report["final_tally"]["susceptible"], 6);
}

#[test]
fn missing_map_fails_with_context() {
    let output = outbreak()
        .args(["--map", "missing/town.txt", "--steps", "1"])
        .output()
        .expect("failed to launch the outbreak binary");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to read map"), "stderr: {stderr}");
}
