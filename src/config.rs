use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Settings for one detection run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root path to analyze.
    pub root: PathBuf,
    /// Name of the clone detection strategy to run.
    pub strategy: String,
    /// Minimum exactly-matched weight for a pair of subtrees to count as
    /// a clone.
    pub min_weight: usize,
    /// Minimum node count for a function to be analyzed at all.
    pub min_unit_size: usize,
    /// Path patterns to exclude from scanning.
    pub exclude: Vec<String>,
    /// Exclude test code (#[test] functions and #[cfg(test)] modules).
    pub exclude_tests: bool,
    /// SQLite database to record canonical patterns in, if any.
    pub database: Option<PathBuf>,
    /// Label for the snapshot being analyzed (e.g. a commit hash).
    pub commit: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            strategy: "structural".to_string(),
            min_weight: 10,
            min_unit_size: 5,
            exclude: Vec::new(),
            exclude_tests: false,
            database: None,
            commit: None,
        }
    }
}

/// Config as stored in clones.toml or Cargo.toml metadata.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FileConfig {
    strategy: Option<String>,
    min_weight: Option<usize>,
    min_unit_size: Option<usize>,
    exclude: Option<Vec<String>>,
    exclude_tests: Option<bool>,
    database: Option<PathBuf>,
}

/// Cargo.toml metadata section.
#[derive(Debug, Deserialize)]
struct CargoMetadata {
    #[serde(default)]
    package: Option<CargoPackage>,
}

#[derive(Debug, Deserialize)]
struct CargoPackage {
    #[serde(default)]
    metadata: Option<CargoPackageMetadata>,
}

#[derive(Debug, Deserialize)]
struct CargoPackageMetadata {
    #[serde(default)]
    clones: Option<FileConfig>,
}

impl Config {
    /// Load config with the following precedence:
    /// 1. CLI overrides (applied by the caller after this method)
    /// 2. clones.toml in the project root
    /// 3. [package.metadata.clones] in Cargo.toml
    /// 4. Defaults
    ///
    /// Malformed config files are an error, not a silent fallback.
    pub fn load(root: &Path) -> Result<Self> {
        let mut config = Config {
            root: root.to_path_buf(),
            ..Default::default()
        };

        let cargo_toml = root.join("Cargo.toml");
        if cargo_toml.exists() {
            let content = std::fs::read_to_string(&cargo_toml)?;
            let cargo: CargoMetadata =
                toml::from_str(&content).map_err(|e| Error::ConfigParse {
                    path: cargo_toml.clone(),
                    message: e.to_string(),
                })?;
            if let Some(fc) = cargo
                .package
                .and_then(|pkg| pkg.metadata)
                .and_then(|meta| meta.clones)
            {
                config.apply_file_config(&fc);
            }
        }

        let clones_toml = root.join("clones.toml");
        if clones_toml.exists() {
            let content = std::fs::read_to_string(&clones_toml)?;
            let fc: FileConfig = toml::from_str(&content).map_err(|e| Error::ConfigParse {
                path: clones_toml.clone(),
                message: e.to_string(),
            })?;
            config.apply_file_config(&fc);
        }

        Ok(config)
    }

    fn apply_file_config(&mut self, fc: &FileConfig) {
        if let Some(ref v) = fc.strategy {
            self.strategy = v.clone();
        }
        if let Some(v) = fc.min_weight {
            self.min_weight = v;
        }
        if let Some(v) = fc.min_unit_size {
            self.min_unit_size = v;
        }
        if let Some(ref v) = fc.exclude {
            self.exclude = v.clone();
        }
        if let Some(v) = fc.exclude_tests {
            self.exclude_tests = v;
        }
        if let Some(ref v) = fc.database {
            self.database = Some(v.clone());
        }
    }
}
