use crate::domain::ExtractedRecord;
use crate::error::Error;

pub type Result<T> = std::result::Result<T, Error>;

pub trait RecordSource {
    // Reads the source file and maps every named record to ExtractedRecord
    fn fetch_all_records(&self) -> Result<Vec<ExtractedRecord>>;
}

/// Trait for the human-edited file that gets patched
/// This is a port (interface) that defines how the core reads and replaces the target
pub trait TargetDocument: Send + Sync {
    /// Human-readable location, used in log lines
    fn location(&self) -> String;

    fn read(&self) -> Result<String>;

    /// Replaces the whole document with `content`
    fn write(&self, content: &str) -> Result<()>;
}
