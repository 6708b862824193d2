use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{}: file not found", .0.display())]
    NotFound(PathBuf),

    #[error("{}: unsupported format '{extension}'", path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("{}: {message}", path.display())]
    ParseFailure { path: PathBuf, message: String },
}

impl LoadError {
    pub(crate) fn io(path: &Path, e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            LoadError::NotFound(path.to_path_buf())
        } else {
            LoadError::parse(path, e)
        }
    }

    pub(crate) fn parse(path: &Path, e: impl std::fmt::Display) -> Self {
        LoadError::ParseFailure { path: path.to_path_buf(), message: e.to_string() }
    }
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
