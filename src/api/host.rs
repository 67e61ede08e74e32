use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SegError, SegResult};

/// Metadata of a host file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStat {
    pub len: u64,
    /// Modification time in milliseconds since the Unix epoch, when known.
    pub modified_ms: Option<u64>,
    pub is_dir: bool,
}

/// File-system and dialog capabilities provided by the embedding host.
///
/// The session only reads tabular input and reads/writes segmented exports
/// through this trait. Dialogs default to "cancelled" for headless hosts.
pub trait HostFs {
    fn read_file(&self, path: &Path) -> SegResult<String>;

    fn write_file(&self, path: &Path, contents: &str) -> SegResult<()>;

    /// File names (not paths) directly inside `dir`, sorted.
    fn list_files(&self, dir: &Path) -> SegResult<Vec<String>>;

    fn stat(&self, path: &Path) -> SegResult<FileStat>;

    fn is_directory(&self, path: &Path) -> bool;

    fn open_file_dialog(&self) -> Option<Vec<PathBuf>> {
        None
    }

    fn open_folder_dialog(&self) -> Option<PathBuf> {
        None
    }

    fn save_file_dialog(&self, _suggested_name: &str) -> Option<PathBuf> {
        None
    }
}

/// [`HostFs`] over `std::fs`, without dialogs.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdHost;

fn io_error(path: &Path, err: &std::io::Error) -> SegError {
    SegError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

impl HostFs for StdHost {
    fn read_file(&self, path: &Path) -> SegResult<String> {
        fs::read_to_string(path).map_err(|e| io_error(path, &e))
    }

    /// Writes through a sibling `.partial` file and renames it into place,
    /// so a failed write never leaves a truncated target behind.
    fn write_file(&self, path: &Path, contents: &str) -> SegResult<()> {
        let mut partial = path.as_os_str().to_owned();
        partial.push(".partial");
        let partial = PathBuf::from(partial);
        if let Err(err) = fs::write(&partial, contents) {
            let _ = fs::remove_file(&partial);
            return Err(io_error(&partial, &err));
        }
        fs::rename(&partial, path).map_err(|e| {
            let _ = fs::remove_file(&partial);
            io_error(path, &e)
        })?;
        debug!(path = %path.display(), bytes = contents.len(), "file written");
        Ok(())
    }

    fn list_files(&self, dir: &Path) -> SegResult<Vec<String>> {
        let entries = fs::read_dir(dir).map_err(|e| io_error(dir, &e))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_error(dir, &e))?;
            if entry.file_type().is_ok_and(|t| t.is_file()) {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    fn stat(&self, path: &Path) -> SegResult<FileStat> {
        let meta = fs::metadata(path).map_err(|e| io_error(path, &e))?;
        let modified_ms = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .and_then(|d| u64::try_from(d.as_millis()).ok());
        Ok(FileStat {
            len: meta.len(),
            modified_ms,
            is_dir: meta.is_dir(),
        })
    }

    fn is_directory(&self, path: &Path) -> bool {
        path.is_dir()
    }
}
