use std::fs;
use std::path::PathBuf;

use sync_core::domain::ExtractedRecord;
use sync_core::error::Error;
use sync_core::extractor::{extract_records, ExtractStrategy};
use sync_core::ports::{RecordSource, Result};
use tracing::debug;

/// Reads app records out of a TypeScript data module
pub struct TypeScriptRecordSource {
    source_path: PathBuf,
    strategy: ExtractStrategy,
}

impl TypeScriptRecordSource {
    /// Creates a new TypeScriptRecordSource for the given file and strategy
    pub fn new(source_path: impl Into<PathBuf>, strategy: ExtractStrategy) -> Self {
        Self {
            source_path: source_path.into(),
            strategy,
        }
    }
}

impl RecordSource for TypeScriptRecordSource {
    fn fetch_all_records(&self) -> Result<Vec<ExtractedRecord>> {
        debug!(
            "Reading {} with {:?}",
            self.source_path.display(),
            self.strategy
        );
        let content = fs::read_to_string(&self.source_path)
            .map_err(|e| Error::io(&self.source_path, e))?;

        // Editors on Windows like to leave a BOM in front of the module
        let content = content.strip_prefix('\u{feff}').unwrap_or(&content);

        let records = extract_records(content, &self.strategy)?;
        Ok(records)
    }
}
