pub mod algorithm;
pub mod canon;
pub mod config;
pub mod error;
pub mod extract;
pub mod node;
pub mod output;
pub mod parser;
pub mod pattern;
pub mod registry;
pub mod result;
pub mod scanner;

use algorithm::DetectionParams;
use config::Config;
use node::Module;
use registry::{PatternStore, SqliteStore};
use result::DetectionResult;

/// The result of a full analysis run.
#[derive(Debug)]
pub struct AnalysisResult {
    pub detection: DetectionResult,
    pub modules: Vec<Module>,
    pub warnings: Vec<String>,
}

/// Run the full detection pipeline: scan, parse, detect.
pub fn analyze(config: &Config) -> error::Result<AnalysisResult> {
    let files = scanner::scan_rust_files(&config.root, &config.exclude);
    if files.is_empty() {
        return Err(error::Error::NoSourceFiles(config.root.clone()));
    }
    tracing::debug!(files = files.len(), root = %config.root.display(), "scanned");

    let (modules, warnings) =
        parser::parse_files(&files, config.min_unit_size, config.exclude_tests);
    let units: usize = modules.iter().map(|m| m.units.len()).sum();
    tracing::info!(modules = modules.len(), units, "parsed analyzable units");

    let params = DetectionParams {
        min_weight: config.min_weight,
    };
    let detection = algorithm::run_detection(&modules, &config.strategy, &params)?;
    tracing::info!(clusters = detection.clones.len(), "detection complete");

    Ok(AnalysisResult {
        detection,
        modules,
        warnings,
    })
}

/// Record the run in the configured pattern database, if any: every subtree
/// of every unit is interned and instanced, then the detected clusters are
/// stored alongside.
pub fn persist(config: &Config, result: &AnalysisResult) -> error::Result<()> {
    let Some(db_path) = &config.database else {
        return Ok(());
    };

    let mut store = SqliteStore::open(db_path)?;
    let commit_id = match &config.commit {
        Some(label) => Some(store.record_commit(label)?),
        None => None,
    };
    let stats = extract::extract_patterns(&mut store, &result.modules, commit_id)?;
    store.persist_result(commit_id, &result.detection)?;
    tracing::info!(
        instances = stats.instances,
        db = %db_path.display(),
        "recorded patterns"
    );
    Ok(())
}
