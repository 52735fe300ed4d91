//! JSON document persistence shared by the alias store and the cache tiers
//!
//! Reads never panic and report *why* nothing was loaded, so callers can
//! degrade to an empty document while tests still tell "missing" from "corrupt".

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Reason a persisted document could not be read
#[derive(Debug, Error)]
pub enum ReadFailure {
    #[error("{0:?} does not exist")]
    Missing(PathBuf),

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed JSON in {path:?}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ReadFailure {
    /// A missing file is the normal "nothing saved yet" state
    pub fn is_missing(&self) -> bool {
        matches!(self, ReadFailure::Missing(_))
    }
}

/// Read and deserialize a JSON document
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ReadFailure> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ReadFailure::Missing(path.to_path_buf()))
        }
        Err(e) => {
            return Err(ReadFailure::Io {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    serde_json::from_str(&contents).map_err(|e| ReadFailure::Corrupt {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Read a JSON document, degrading to `T::default()` on any failure
///
/// Missing files are silent; unreadable or corrupt files are logged.
pub fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    match read_json(path) {
        Ok(value) => value,
        Err(failure) => {
            if failure.is_missing() {
                tracing::trace!(path = %path.display(), "no document yet");
            } else {
                tracing::warn!("{}; treating as empty", failure);
            }
            T::default()
        }
    }
}

/// Serialize a document as pretty JSON, creating parent directories as needed
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut content = serde_json::to_string_pretty(value)?;
    content.push('\n');
    fs::write(path, content)
}
