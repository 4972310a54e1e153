use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use ananke_core::InputError;

#[derive(Debug)]
pub enum StoreError {
    /// A filesystem operation failed on `path`.
    Io { path: PathBuf, source: io::Error },
    /// Validation or derivation rejected the input.
    Input(InputError),
    /// An archive or descriptor on disk could not be decoded.
    Malformed { path: PathBuf, detail: String },
    /// A staged link or manifest already exists with different content.
    Conflict { path: PathBuf, detail: String },
    /// Settings could not be loaded.
    Config(String),
}

impl StoreError {
    /// Adapter for `map_err` that attaches the path an I/O call touched.
    pub fn io(path: &Path) -> impl FnOnce(io::Error) -> StoreError + '_ {
        move |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io { path, source } => write!(f, "I/O error on {}: {source}", path.display()),
            StoreError::Input(e) => write!(f, "{e}"),
            StoreError::Malformed { path, detail } => {
                write!(f, "malformed file {}: {detail}", path.display())
            }
            StoreError::Conflict { path, detail } => {
                write!(f, "conflict at {}: {detail}", path.display())
            }
            StoreError::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io { source, .. } => Some(source),
            StoreError::Input(e) => Some(e),
            _ => None,
        }
    }
}

impl From<InputError> for StoreError {
    fn from(e: InputError) -> Self {
        StoreError::Input(e)
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
