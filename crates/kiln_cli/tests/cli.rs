//! End-to-end tests driving the `kiln` binary over on-disk projects.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn project() -> TempDir {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(
        tmp.path().join("kiln.toml"),
        "[project]\nname = \"demo\"\n\n[build]\nresources = [\"txt\"]\n",
    )
    .unwrap();
    fs::create_dir_all(tmp.path().join("src")).unwrap();
    fs::write(tmp.path().join("src/core.kd"), "def Core v1\n").unwrap();
    fs::write(tmp.path().join("src/app.kd"), "use Core\ndef App main\n").unwrap();
    fs::write(tmp.path().join("src/notes.txt"), "read me").unwrap();
    tmp
}

fn kiln(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_kiln"))
        .args(args)
        .arg("--config")
        .arg(root)
        .arg("--color")
        .arg("never")
        .env_remove("KILN_LOG")
        .output()
        .unwrap()
}

fn status_json(root: &Path) -> serde_json::Value {
    let out = kiln(root, &["status", "--format", "json"]);
    assert!(out.status.success());
    serde_json::from_slice(&out.stdout).unwrap()
}

#[test]
fn build_writes_artifacts_and_resources() {
    let tmp = project();
    let out = kiln(tmp.path(), &["build"]);
    assert_eq!(out.status.code(), Some(0));

    let output = tmp.path().join("out");
    assert_eq!(fs::read_to_string(output.join("Core.out")).unwrap(), "v1\n");
    assert_eq!(fs::read_to_string(output.join("App.out")).unwrap(), "main\n");
    assert_eq!(fs::read_to_string(output.join("src/notes.txt")).unwrap(), "read me");
    assert!(tmp.path().join(".kiln/snapshot.gz").exists());
    assert!(tmp.path().join(".kiln/graph.bin").exists());
}

#[test]
fn status_tracks_changes_and_dependents() {
    let tmp = project();
    assert_eq!(status_json(tmp.path())["to_recompile"].as_array().unwrap().len(), 3);

    kiln(tmp.path(), &["build"]);
    let status = status_json(tmp.path());
    assert_eq!(status["to_recompile"].as_array().unwrap().len(), 0);
    assert_eq!(status["full_rebuild"], false);

    fs::remove_file(tmp.path().join("src/core.kd")).unwrap();
    let status = status_json(tmp.path());
    assert_eq!(status["deleted"][0], "src/core.kd");
    assert_eq!(status["affected"][0], "src/app.kd");
}

#[test]
fn compile_error_fails_build_then_recovers() {
    let tmp = project();
    kiln(tmp.path(), &["build"]);

    fs::write(tmp.path().join("src/core.kd"), "def Core v2\nerror not yet\n").unwrap();
    let out = kiln(tmp.path(), &["build"]);
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("error[E101]: not yet"));
    assert!(stderr.contains("src/core.kd:2"));

    fs::write(tmp.path().join("src/core.kd"), "def Core v2\n").unwrap();
    let out = kiln(tmp.path(), &["build"]);
    assert_eq!(out.status.code(), Some(0));
    assert_eq!(
        fs::read_to_string(tmp.path().join("out/Core.out")).unwrap(),
        "v2\n"
    );
    let status = status_json(tmp.path());
    assert_eq!(status["to_recompile"].as_array().unwrap().len(), 0);
}

#[test]
fn clean_removes_state_and_output() {
    let tmp = project();
    kiln(tmp.path(), &["build"]);
    let out = kiln(tmp.path(), &["clean"]);
    assert!(out.status.success());
    assert!(!tmp.path().join(".kiln").exists());
    assert!(!tmp.path().join("out").exists());
}

#[test]
fn missing_config_is_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    let out = kiln(tmp.path(), &["build"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).starts_with("error:"));
}
