use tracing::{debug, info, warn};

use crate::domain::{ExtractedRecord, ExtractedRecordIndex};
use crate::patcher::{patch_text, PatchOptions, PatchReport};
use crate::ports::{RecordSource, Result, TargetDocument};

// How many extracted records get echoed before patching
const SAMPLE_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    pub patch: PatchOptions,
    /// Compute and report the patch without writing the target
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct SyncSummary {
    pub records_found: usize,
    pub report: PatchReport,
    pub written: bool,
}

/// Application service that copies social links from the app data into the target document
pub struct SyncServiceImpl {
    record_source: Box<dyn RecordSource>,
    target_document: Box<dyn TargetDocument>,
    options: SyncOptions,
}

impl SyncServiceImpl {
    /// Creates a new SyncServiceImpl with the given dependencies
    pub fn new(
        record_source: Box<dyn RecordSource>,
        target_document: Box<dyn TargetDocument>,
        options: SyncOptions,
    ) -> Self {
        Self {
            record_source,
            target_document,
            options,
        }
    }

    /// Executes the sync: extracts records, patches the target and writes it back
    pub fn execute_sync(&self) -> Result<SyncSummary> {
        info!("Extracting apps data from source file...");
        let records = self.record_source.fetch_all_records()?;
        info!("Found {} apps in source file", records.len());
        log_sample(&records);

        let index = ExtractedRecordIndex::from_records(&records);
        for name in index.duplicates() {
            warn!("Duplicate app name {name:?} in source; the later record wins");
        }

        let location = self.target_document.location();
        info!("Updating {location}...");
        let content = self.target_document.read()?;
        let outcome = patch_text(&content, &index, self.options.patch);
        log_report(&outcome.report);

        let written = if self.options.dry_run {
            info!(
                "Dry run: {} line(s) would change in {location}",
                outcome.report.changed_lines
            );
            false
        } else if outcome.report.is_unchanged() {
            info!("{location} is already up to date");
            false
        } else {
            self.target_document.write(&outcome.text)?;
            info!(
                "Wrote {location} ({} line(s) changed)",
                outcome.report.changed_lines
            );
            true
        };

        Ok(SyncSummary {
            records_found: records.len(),
            report: outcome.report,
            written,
        })
    }
}

fn log_sample(records: &[ExtractedRecord]) {
    for (i, record) in records.iter().take(SAMPLE_SIZE).enumerate() {
        info!(
            "  {}. {} - website: {} - x: {:?} - discord: {:?}",
            i + 1,
            record.name,
            record.website.as_deref().unwrap_or("None"),
            record.socials.x,
            record.socials.discord,
        );
    }
}

fn log_report(report: &PatchReport) {
    for entry in &report.entries {
        let name = entry.name.as_deref().unwrap_or("<unquoted name>");
        if !entry.matched {
            info!("No match found for: {name}");
            continue;
        }
        info!("Found match for: {name}");
        for update in &entry.updates {
            debug!("  Updated {} (line {}): {}", update.field, update.line, update.value);
        }
    }
    info!(
        "{} matched, {} unmatched, {} line(s) changed",
        report.matched(),
        report.unmatched(),
        report.changed_lines
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SocialField, Socials};
    use crate::error::{Error, FormatError};
    use std::sync::{Arc, Mutex};

    struct FixedSource(Vec<ExtractedRecord>);

    impl RecordSource for FixedSource {
        fn fetch_all_records(&self) -> Result<Vec<ExtractedRecord>> {
            Ok(self.0.clone())
        }
    }

    struct FailingSource;

    impl RecordSource for FailingSource {
        fn fetch_all_records(&self) -> Result<Vec<ExtractedRecord>> {
            Err(FormatError::ContainerNotFound {
                marker: "APPS_DATA".into(),
            }
            .into())
        }
    }

    #[derive(Clone, Default)]
    struct MemoryDocument {
        content: Arc<Mutex<String>>,
        writes: Arc<Mutex<usize>>,
    }

    impl MemoryDocument {
        fn with(content: &str) -> Self {
            let doc = Self::default();
            *doc.content.lock().unwrap() = content.to_string();
            doc
        }

        fn content(&self) -> String {
            self.content.lock().unwrap().clone()
        }

        fn writes(&self) -> usize {
            *self.writes.lock().unwrap()
        }
    }

    impl TargetDocument for MemoryDocument {
        fn location(&self) -> String {
            "memory".to_string()
        }

        fn read(&self) -> Result<String> {
            Ok(self.content())
        }

        fn write(&self, content: &str) -> Result<()> {
            *self.content.lock().unwrap() = content.to_string();
            *self.writes.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn foo() -> ExtractedRecord {
        ExtractedRecord {
            name: "Foo".into(),
            website: Some("https://a.io".into()),
            socials: Socials {
                x: SocialField::Present("@foo".into()),
                discord: SocialField::Cleared,
            },
        }
    }

    const TARGET: &str = "- name: \"Foo\"\n    website: \"\"\n    twitter: \"\"\n    discord: \"\"\n- name: \"Bar\"\n    twitter: \"@bar\"\n";

    fn service(document: &MemoryDocument, options: SyncOptions) -> SyncServiceImpl {
        SyncServiceImpl::new(
            Box::new(FixedSource(vec![foo()])),
            Box::new(document.clone()),
            options,
        )
    }

    #[test]
    fn test_execute_sync_writes_patched_document() {
        let document = MemoryDocument::with(TARGET);
        let summary = service(&document, SyncOptions::default()).execute_sync().unwrap();

        assert!(summary.written);
        assert_eq!(summary.records_found, 1);
        assert_eq!(summary.report.matched(), 1);
        assert_eq!(summary.report.unmatched(), 1);
        assert_eq!(
            document.content(),
            "- name: \"Foo\"\n    website: \"https://a.io\"\n    twitter: \"@foo\"\n    discord: \"\"\n- name: \"Bar\"\n    twitter: \"@bar\"\n"
        );
    }

    #[test]
    fn test_dry_run_does_not_write() {
        let document = MemoryDocument::with(TARGET);
        let options = SyncOptions {
            dry_run: true,
            ..SyncOptions::default()
        };
        let summary = service(&document, options).execute_sync().unwrap();

        assert!(!summary.written);
        assert_eq!(summary.report.changed_lines, 2);
        assert_eq!(document.content(), TARGET);
        assert_eq!(document.writes(), 0);
    }

    #[test]
    fn test_second_run_skips_write() {
        let document = MemoryDocument::with(TARGET);
        let first = service(&document, SyncOptions::default()).execute_sync().unwrap();
        let second = service(&document, SyncOptions::default()).execute_sync().unwrap();

        assert!(first.written);
        assert!(!second.written);
        assert_eq!(document.writes(), 1);
    }

    #[test]
    fn test_source_error_propagates() {
        let document = MemoryDocument::with(TARGET);
        let service = SyncServiceImpl::new(
            Box::new(FailingSource),
            Box::new(document.clone()),
            SyncOptions::default(),
        );
        let err = service.execute_sync().unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::ContainerNotFound { .. })));
        assert_eq!(document.content(), TARGET);
    }
}
