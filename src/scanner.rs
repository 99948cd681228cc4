use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Recursively collect Rust source files under `root`.
///
/// Always skips `target/` and hidden directories (the root itself may be
/// hidden). Exclusion patterns are simple substring matches against the
/// full path. The result is sorted so downstream output is deterministic
/// regardless of filesystem iteration order.
pub fn scan_rust_files(root: &Path, exclude_patterns: &[String]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| {
            let path = e.path();
            if path.is_dir() {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    if name == "target" {
                        return false;
                    }
                    if name.starts_with('.') && path != root {
                        return false;
                    }
                }
            }
            true
        })
        .flatten()
    {
        let path = entry.path();
        if path.is_file()
            && path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("rs"))
            && !is_excluded(path, exclude_patterns)
        {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    files
}

/// Check if a path matches any exclusion pattern.
pub fn is_excluded(path: &Path, patterns: &[String]) -> bool {
    let path_str = path.to_string_lossy();
    patterns
        .iter()
        .any(|pattern| path_str.contains(pattern.as_str()))
}
