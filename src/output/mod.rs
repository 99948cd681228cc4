pub mod json;
pub mod text;

use std::io;

use crate::result::DetectionResult;

/// Trait for rendering detection results.
pub trait Reporter {
    fn report(&self, result: &DetectionResult, writer: &mut dyn io::Write) -> io::Result<()>;
}
