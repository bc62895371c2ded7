//! Scoped temporary files for decode work.
//!
//! Decoders want a filesystem path, submissions arrive as in-memory buffers.
//! A [`ScratchFile`] bridges the two and removes its backing file on every
//! exit path, including unwinding.

use std::io::{self, Write};
use std::path::Path;
use tempfile::TempPath;
use tracing::warn;

pub struct ScratchFile {
    path: Option<TempPath>,
}

impl ScratchFile {
    pub fn create(bytes: &[u8], suffix: &str) -> io::Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("keyframer-")
            .suffix(suffix)
            .tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;

        Ok(Self {
            path: Some(file.into_temp_path()),
        })
    }

    pub fn path(&self) -> &Path {
        match &self.path {
            Some(path) => &**path,
            None => Path::new(""),
        }
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let shown = path.to_path_buf();
            if let Err(e) = path.close() {
                warn!(path = %shown.display(), error = %e, "failed to remove scratch file");
            }
        }
    }
}

/// Writes `bytes` to a fresh scratch file, runs `work` against its path and
/// removes the file afterwards, however `work` exits.
pub fn with_scratch_file<T, F>(bytes: &[u8], suffix: &str, work: F) -> io::Result<T>
where
    F: FnOnce(&Path) -> T,
{
    let scratch = ScratchFile::create(bytes, suffix)?;
    Ok(work(scratch.path()))
}
