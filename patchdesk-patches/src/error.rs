use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("not found: '{name}'")]
    NotFound { name: String },

    /// Name is not a plain file name, or does not encode a target path.
    #[error("invalid name: '{name}'")]
    InvalidName { name: String },

    #[error("invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: &'static str },

    #[error("path traversal detected: '{path}' resolves outside the project root")]
    PathTraversal { path: String },

    #[error("already exists: '{name}'")]
    Conflict { name: String },
}

impl PatchError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> PatchError {
        let path = path.into();
        move |source| PatchError::Io { path, source }
    }
}
