use std::io;
use std::path::Path;

use crate::output::Reporter;
use crate::result::DetectionResult;

pub struct TextReporter {
    /// Base path for displaying relative paths.
    pub base_path: Option<std::path::PathBuf>,
}

impl TextReporter {
    pub fn new(base_path: Option<std::path::PathBuf>) -> Self {
        Self { base_path }
    }

    fn relative_path<'a>(&self, path: &'a Path) -> std::borrow::Cow<'a, str> {
        if let Some(base) = &self.base_path {
            if let Ok(rel) = path.strip_prefix(base) {
                return rel.to_string_lossy();
            }
        }
        path.to_string_lossy()
    }
}

impl Reporter for TextReporter {
    fn report(&self, result: &DetectionResult, writer: &mut dyn io::Write) -> io::Result<()> {
        if result.is_empty() {
            writeln!(writer, "No structural clones found.")?;
            return Ok(());
        }

        writeln!(writer, "Structural Clones")?;
        writeln!(writer, "=================")?;
        writeln!(writer)?;

        for (i, clone) in result.clones.iter().enumerate() {
            writeln!(
                writer,
                "Cluster {} ({}, weight: {}, {} occurrences):",
                i + 1,
                clone.value,
                clone.match_weight,
                clone.origins.len()
            )?;
            for (origin, similarity) in &clone.origins {
                writeln!(
                    writer,
                    "  - {}:{}:{} (similarity: {:.0}%)",
                    self.relative_path(&origin.file),
                    origin.line,
                    origin.column,
                    similarity * 100.0,
                )?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }
}
