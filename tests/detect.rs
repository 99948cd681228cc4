use std::fs;
use std::path::Path;

use tempfile::TempDir;

use tree_clones::config::Config;
use tree_clones::registry::SqliteStore;
use tree_clones::{analyze, persist};

const ALPHA: &str = r#"
fn alpha(x: i32) -> i32 {
    let y = x * 2;
    y + 1
}
"#;

// Same structure as ALPHA with every identifier renamed.
const BETA: &str = r#"
fn beta(value: i32) -> i32 {
    let doubled = value * 2;
    doubled + 1
}
"#;

// Same structure as ALPHA with one literal changed.
const BETA_LITERAL: &str = r#"
fn beta(value: i32) -> i32 {
    let doubled = value * 2;
    doubled + 5
}
"#;

// Structurally unrelated to ALPHA.
const GAMMA: &str = r#"
fn gamma(flag: bool) -> bool {
    !flag
}
"#;

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

fn config_for(root: &Path) -> Config {
    Config {
        root: root.to_path_buf(),
        min_unit_size: 1,
        ..Default::default()
    }
}

#[test]
fn renamed_copies_form_one_full_similarity_cluster() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "a.rs", ALPHA);
    write(tmp.path(), "b.rs", BETA);

    let result = analyze(&config_for(tmp.path())).unwrap();
    assert_eq!(result.detection.clones.len(), 1);

    let clone = &result.detection.clones[0];
    assert_eq!(clone.origins.len(), 2);
    assert!(!clone.value.contains("hole"));
    for (_, sim) in &clone.origins {
        assert!((sim - 1.0).abs() < f64::EPSILON);
    }
}

#[test]
fn literal_change_clusters_with_one_hole() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "a.rs", ALPHA);
    write(tmp.path(), "b.rs", BETA_LITERAL);

    let result = analyze(&config_for(tmp.path())).unwrap();
    assert_eq!(result.detection.clones.len(), 1);

    let clone = &result.detection.clones[0];
    assert_eq!(clone.value.matches("hole").count(), 1);
    for (_, sim) in &clone.origins {
        assert!(*sim > 0.0 && *sim < 1.0);
    }
}

#[test]
fn unit_without_structural_peer_stays_out() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "a.rs", ALPHA);
    write(tmp.path(), "b.rs", BETA);
    write(tmp.path(), "c.rs", GAMMA);

    let result = analyze(&config_for(tmp.path())).unwrap();
    assert_eq!(result.detection.clones.len(), 1);

    let clone = &result.detection.clones[0];
    assert_eq!(clone.origins.len(), 2);
    assert!(
        !clone
            .origins
            .keys()
            .any(|origin| origin.file.ends_with("c.rs"))
    );
}

#[test]
fn three_copies_share_one_cluster() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "a.rs", ALPHA);
    write(tmp.path(), "b.rs", BETA);
    write(
        tmp.path(),
        "c.rs",
        r#"
fn third(input: i32) -> i32 {
    let out = input * 2;
    out + 1
}
"#,
    );

    let result = analyze(&config_for(tmp.path())).unwrap();
    assert_eq!(result.detection.clones.len(), 1);
    assert_eq!(result.detection.clones[0].origins.len(), 3);
}

#[test]
fn patterns_intern_once_across_snapshots() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "a.rs", ALPHA);
    write(tmp.path(), "b.rs", BETA);

    let db_path = tmp.path().join("patterns.db");
    let mut config = config_for(tmp.path());
    config.database = Some(db_path.clone());

    config.commit = Some("commit-1".to_string());
    let result = analyze(&config).unwrap();
    persist(&config, &result).unwrap();

    let patterns_after_first;
    let instances_after_first;
    {
        let store = SqliteStore::open(&db_path).unwrap();
        patterns_after_first = store.pattern_count().unwrap();
        instances_after_first = store.instance_count().unwrap();
        assert!(patterns_after_first > 0);
        assert!(instances_after_first >= patterns_after_first);
    }

    // Second snapshot of the same code: shapes are already interned, so
    // only instances grow.
    config.commit = Some("commit-2".to_string());
    let result = analyze(&config).unwrap();
    persist(&config, &result).unwrap();

    let store = SqliteStore::open(&db_path).unwrap();
    assert_eq!(store.pattern_count().unwrap(), patterns_after_first);
    assert_eq!(store.instance_count().unwrap(), instances_after_first * 2);
}

#[test]
fn empty_root_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let err = analyze(&config_for(tmp.path())).unwrap_err();
    assert!(matches!(
        err,
        tree_clones::error::Error::NoSourceFiles(_)
    ));
}

#[test]
fn unparseable_file_becomes_a_warning() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "a.rs", ALPHA);
    write(tmp.path(), "b.rs", BETA);
    write(tmp.path(), "broken.rs", "fn broken( {");

    let result = analyze(&config_for(tmp.path())).unwrap();
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("broken.rs"));
    // The rest of the corpus is still analyzed.
    assert_eq!(result.detection.clones.len(), 1);
}

#[test]
fn unknown_strategy_is_an_error() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "a.rs", ALPHA);

    let mut config = config_for(tmp.path());
    config.strategy = "token-based".to_string();
    let err = analyze(&config).unwrap_err();
    assert!(matches!(
        err,
        tree_clones::error::Error::UnsupportedStrategy(_)
    ));
}
