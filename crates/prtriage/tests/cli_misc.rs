//! Integration tests for `prtriage rules`, `changed-lines` and `init`.

use assert_cmd::Command;
use assert_cmd::cargo;
use predicates::prelude::*;
use tempfile::TempDir;

use prtriage_testkit::fixtures::sample_patches;

fn prtriage_cmd() -> Command {
    Command::new(cargo::cargo_bin!("prtriage"))
}

#[test]
fn rules_lists_the_catalog() {
    let output = prtriage_cmd()
        .args(["rules", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let rules: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rules = rules.as_array().unwrap();
    assert_eq!(rules.len(), 24);
    let eval = rules.iter().find(|r| r["id"] == "no-eval").unwrap();
    assert_eq!(eval["category"], "security");
    assert_eq!(eval["cross_language"], true);
}

#[test]
fn rules_text_marks_scope() {
    prtriage_cmd()
        .arg("rules")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"(?m)^no-eval\s+security\s+any\s").unwrap())
        .stdout(predicate::str::is_match(r"(?m)^eqeqeq\s+lint\s+js/ts\s").unwrap());
}

#[test]
fn rules_respect_disabled_list() {
    let td = TempDir::new().expect("temp");
    let config = td.path().join("prtriage.toml");
    std::fs::write(&config, "[analysis]\ndisabled_rules = [\"semi\"]\n").unwrap();

    prtriage_cmd()
        .arg("rules")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"(?m)^semi\s").unwrap().not());
}

#[test]
fn changed_lines_per_file() {
    let td = TempDir::new().expect("temp");
    let patch = td.path().join("change.diff");
    std::fs::write(&patch, sample_patches::TWO_FILES).unwrap();

    prtriage_cmd()
        .arg("changed-lines")
        .arg(&patch)
        .assert()
        .success()
        .stdout("src/a.js: 2\nsrc/b.js: 10\n");
}

#[test]
fn changed_lines_from_stdin_hunks() {
    prtriage_cmd()
        .args(["changed-lines", "-"])
        .write_stdin(sample_patches::EQ_AND_EVAL_ADDED)
        .assert()
        .success()
        .stdout("2-3\n");
}

#[test]
fn changed_lines_json() {
    let output = prtriage_cmd()
        .args(["changed-lines", "-", "--format", "json"])
        .write_stdin(sample_patches::TWO_FILES)
        .output()
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["src/a.js"], serde_json::json!([2]));
    assert_eq!(json["src/b.js"], serde_json::json!([10]));
}

#[test]
fn init_creates_default_config() {
    let td = TempDir::new().expect("temp");

    prtriage_cmd()
        .current_dir(td.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created prtriage.toml"));

    let content = std::fs::read_to_string(td.path().join("prtriage.toml")).unwrap();
    assert!(content.contains("[analysis]"));
    assert!(content.contains("[review]"));
    assert!(content.contains("merge_method = \"squash\""));
}

#[test]
fn init_declined_overwrite_aborts() {
    let td = TempDir::new().expect("temp");
    let path = td.path().join("prtriage.toml");
    std::fs::write(&path, "# mine\n").unwrap();

    prtriage_cmd()
        .current_dir(td.path())
        .arg("init")
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Aborted."));

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "# mine\n");
}

#[test]
fn init_force_overwrites() {
    let td = TempDir::new().expect("temp");
    let path = td.path().join("custom.toml");
    std::fs::write(&path, "# mine\n").unwrap();

    prtriage_cmd()
        .arg("init")
        .arg("--output")
        .arg(&path)
        .arg("--force")
        .assert()
        .success();

    assert!(std::fs::read_to_string(&path).unwrap().contains("[analysis]"));
}

#[test]
fn generated_config_is_accepted_by_analyze() {
    let td = TempDir::new().expect("temp");
    prtriage_cmd()
        .current_dir(td.path())
        .arg("init")
        .assert()
        .success();
    std::fs::write(td.path().join("a.js"), "const a = 1;\nexport default a;\n").unwrap();

    prtriage_cmd()
        .current_dir(td.path())
        .args(["analyze", "a.js"])
        .assert()
        .success();
}
