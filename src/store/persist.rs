//! Write-new-then-replace file persistence.
//!
//! A [`StagedFile`] is fully written and synced to a sibling temp file before
//! anything at the destination changes. Dropping it without committing
//! removes the temp file.

use std::ffi::OsString;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};

#[derive(Debug)]
pub(crate) struct StagedFile {
    tmp: PathBuf,
    dest: PathBuf,
    committed: bool,
}

/// Write `bytes` next to `dest` without touching `dest` itself.
pub(crate) fn stage(dest: &Path, bytes: &[u8]) -> Result<StagedFile> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }

    let tmp = sibling(dest, ".tmp");
    let staged = StagedFile {
        tmp: tmp.clone(),
        dest: dest.to_path_buf(),
        committed: false,
    };

    let mut file = File::create(&tmp).map_err(|e| StoreError::io(&tmp, e))?;
    file.write_all(bytes).map_err(|e| StoreError::io(&tmp, e))?;
    file.sync_all().map_err(|e| StoreError::io(&tmp, e))?;

    Ok(staged)
}

impl StagedFile {
    /// Replace the destination with the staged content.
    pub(crate) fn commit(mut self) -> Result<()> {
        std::fs::rename(&self.tmp, &self.dest).map_err(|e| StoreError::io(&self.dest, e))?;
        self.committed = true;
        tracing::debug!(path = %self.dest.display(), "file replaced");
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.tmp);
        }
    }
}

/// `dest` with `suffix` appended to its file name (`index` → `index.tmp`).
pub(crate) fn sibling(dest: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(dest.file_name().unwrap_or_default());
    name.push(suffix);
    dest.with_file_name(name)
}
