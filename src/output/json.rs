use std::io;

use crate::output::Reporter;
use crate::result::DetectionResult;

pub struct JsonReporter {
    pub base_path: Option<std::path::PathBuf>,
}

impl JsonReporter {
    pub fn new(base_path: Option<std::path::PathBuf>) -> Self {
        Self { base_path }
    }

    fn relative_path(&self, path: &std::path::Path) -> String {
        if let Some(base) = &self.base_path {
            if let Ok(rel) = path.strip_prefix(base) {
                return rel.to_string_lossy().to_string();
            }
        }
        path.to_string_lossy().to_string()
    }
}

#[derive(serde::Serialize)]
struct JsonClone {
    value: String,
    weight: usize,
    origins: Vec<JsonOrigin>,
}

#[derive(serde::Serialize)]
struct JsonOrigin {
    file: String,
    line: usize,
    column: usize,
    similarity: f64,
}

impl Reporter for JsonReporter {
    fn report(&self, result: &DetectionResult, writer: &mut dyn io::Write) -> io::Result<()> {
        let clones: Vec<JsonClone> = result
            .clones
            .iter()
            .map(|clone| JsonClone {
                value: clone.value.clone(),
                weight: clone.match_weight,
                origins: clone
                    .origins
                    .iter()
                    .map(|(origin, similarity)| JsonOrigin {
                        file: self.relative_path(&origin.file),
                        line: origin.line,
                        column: origin.column,
                        similarity: *similarity,
                    })
                    .collect(),
            })
            .collect();
        let json = serde_json::to_string_pretty(&clones).map_err(io::Error::other)?;
        writeln!(writer, "{json}")
    }
}
