//! Shared E2E test helpers for `cons` binary tests.

use assert_cmd::cargo::cargo_bin_cmd;
use std::path::Path;
use std::time::Duration;

/// Default timeout for CLI tests.
pub const TIMEOUT_BASIC: Duration = Duration::from_secs(10);

const CONS_ENV_VARS: &[&str] = &[
    "CONS_MODULE_NAME",
    "CONS_TITLE_CAPACITY",
    "CONS_WIDTH",
    "CONS_HEIGHT",
    "RUST_LOG",
];

/// Build a Command for the `cons` binary isolated from the user's config.
///
/// `HOME` points at a fresh temp dir (no global config) and the command runs
/// in a second temp dir used as the project root. Returns
/// (command, home guard, project dir); keep the guards alive for the test.
pub fn cons_cmd() -> (assert_cmd::Command, tempfile::TempDir, tempfile::TempDir) {
    let home = tempfile::tempdir().expect("create temp home");
    let project = tempfile::tempdir().expect("create temp project");
    let mut cmd: assert_cmd::Command = cargo_bin_cmd!("cons");
    cmd.timeout(TIMEOUT_BASIC);
    for var in CONS_ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.env("HOME", home.path());
    cmd.current_dir(project.path());
    (cmd, home, project)
}

/// Writes a script into `dir` and returns its path.
pub fn write_script(dir: &Path, name: &str, source: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, source).expect("write script");
    path
}

/// Writes `.cons/config.toml` under `root`.
pub fn write_project_config(root: &Path, toml: &str) {
    let dir = root.join(".cons");
    std::fs::create_dir_all(&dir).expect("create .cons");
    std::fs::write(dir.join("config.toml"), toml).expect("write config");
}

/// Parses stdout as JSON.
pub fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}
