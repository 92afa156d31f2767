use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use sync_core::error::Error;
use sync_core::ports::{Result, TargetDocument};
use tempfile::NamedTempFile;
use tracing::debug;

/// The ecosystem YAML file, replaced atomically on write
pub struct YamlTargetDocument {
    path: PathBuf,
}

impl YamlTargetDocument {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    // Writing through a symlink replaces the file it points at, not the link
    fn resolved_path(&self) -> PathBuf {
        fs::canonicalize(&self.path).unwrap_or_else(|_| self.path.clone())
    }
}

// The temp file has to live on the same filesystem for the rename to be atomic
fn staging_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

impl TargetDocument for YamlTargetDocument {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn read(&self) -> Result<String> {
        fs::read_to_string(&self.path).map_err(|e| Error::io(&self.path, e))
    }

    /// Writes `content` to a temp file next to the target, syncs it, and
    /// renames it over the target. The temp file is removed if any step fails.
    fn write(&self, content: &str) -> Result<()> {
        let io_err = |e| Error::io(&self.path, e);
        let destination = self.resolved_path();

        let mut staged = NamedTempFile::new_in(staging_dir(&destination)).map_err(io_err)?;
        debug!("Staging {} via {}", destination.display(), staged.path().display());

        staged.write_all(content.as_bytes()).map_err(io_err)?;
        staged.flush().map_err(io_err)?;
        staged.as_file().sync_all().map_err(io_err)?;

        // NamedTempFile is created 0600; keep whatever mode the target had
        if let Ok(metadata) = fs::metadata(&destination) {
            fs::set_permissions(staged.path(), metadata.permissions()).map_err(io_err)?;
        }

        staged.persist(&destination).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}
