use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn tree_clones() -> Command {
    Command::cargo_bin("tree-clones").unwrap()
}

fn write(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

/// Two renamed copies of one function plus an unrelated one.
fn clone_fixture() -> TempDir {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "a.rs",
        r#"
fn alpha(x: i32) -> i32 {
    let y = x * 2;
    y + 1
}
"#,
    );
    write(
        tmp.path(),
        "b.rs",
        r#"
fn beta(value: i32) -> i32 {
    let doubled = value * 2;
    doubled + 1
}
"#,
    );
    write(
        tmp.path(),
        "c.rs",
        r#"
fn gamma(flag: bool) -> bool {
    !flag
}
"#,
    );
    tmp
}

#[test]
fn report_shows_cluster_with_similarity() {
    let fixture = clone_fixture();
    tree_clones()
        .args(["--path", fixture.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Structural Clones"))
        .stdout(predicate::str::contains("Cluster 1"))
        .stdout(predicate::str::contains("2 occurrences"))
        .stdout(predicate::str::contains("similarity: 100%"))
        .stdout(predicate::str::contains("a.rs"))
        .stdout(predicate::str::contains("b.rs"));
}

#[test]
fn no_clones_message() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "solo.rs",
        "fn solo(x: i32) -> i32 { x * 3 + 7 }",
    );
    tree_clones()
        .args(["--path", tmp.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("No structural clones found"));
}

#[test]
fn json_format_is_parseable() {
    let fixture = clone_fixture();
    let output = tree_clones()
        .args([
            "--path",
            fixture.path().to_str().unwrap(),
            "--format",
            "json",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let parsed: serde_json::Value =
        serde_json::from_str(&String::from_utf8(output).unwrap()).unwrap();
    let clones = parsed.as_array().unwrap();
    assert_eq!(clones.len(), 1);
    assert_eq!(clones[0]["origins"].as_array().unwrap().len(), 2);
}

#[test]
fn min_weight_filters_small_clones() {
    let fixture = clone_fixture();
    tree_clones()
        .args([
            "--path",
            fixture.path().to_str().unwrap(),
            "--min-weight",
            "1000",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("No structural clones found"));
}

#[test]
fn exclude_pattern_removes_files() {
    let fixture = clone_fixture();
    tree_clones()
        .args([
            "--path",
            fixture.path().to_str().unwrap(),
            "--exclude",
            "b.rs",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("No structural clones found"));
}

#[test]
fn error_on_nonexistent_path() {
    tree_clones()
        .args(["--path", "/nonexistent/path/that/does/not/exist"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No Rust source files"));
}

#[test]
fn error_on_unknown_strategy() {
    let fixture = clone_fixture();
    tree_clones()
        .args([
            "--path",
            fixture.path().to_str().unwrap(),
            "--strategy",
            "token-based",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains(
            "Unknown clone detection strategy",
        ));
}

#[test]
fn database_flag_records_patterns() {
    let fixture = clone_fixture();
    let db_path = fixture.path().join("patterns.db");
    tree_clones()
        .args([
            "--path",
            fixture.path().to_str().unwrap(),
            "--database",
            db_path.to_str().unwrap(),
            "--commit",
            "abc123",
        ])
        .assert()
        .success();
    assert!(db_path.exists());
}

#[test]
fn max_clusters_check_fails() {
    let fixture = clone_fixture();
    tree_clones()
        .args([
            "--path",
            fixture.path().to_str().unwrap(),
            "--max-clusters",
            "0",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Check FAILED"));
}

#[test]
fn max_clusters_check_passes() {
    let fixture = clone_fixture();
    tree_clones()
        .args([
            "--path",
            fixture.path().to_str().unwrap(),
            "--max-clusters",
            "10",
        ])
        .assert()
        .success();
}

#[test]
fn config_file_is_honored() {
    let fixture = clone_fixture();
    write(fixture.path(), "clones.toml", "min_weight = 1000\n");
    tree_clones()
        .args(["--path", fixture.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("No structural clones found"));
}

#[test]
fn help_works() {
    tree_clones()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Detect structural code clones"));
}
