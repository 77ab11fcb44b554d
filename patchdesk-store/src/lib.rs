use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

pub mod memory;
pub use memory::MemoryStore;

pub mod settings;
pub use settings::SettingsStore;

pub mod users;
pub use users::UserStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Persisted content exists but is not valid for the record type.
    #[error("malformed record at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("email already registered: {email}")]
    Conflict { email: String },

    #[error("invalid credentials")]
    Unauthorized,

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: &'static str },

    #[error("store lock poisoned")]
    Poisoned,
}

/// Whole-record persistence: every `save` replaces what `load` returns.
pub trait RecordStore<T>: Send + Sync {
    /// Current record; a missing record is created from `T::default()`.
    fn load(&self) -> Result<T, StoreError>;

    fn save(&self, record: &T) -> Result<(), StoreError>;
}

/// A record kept as one pretty-printed JSON file.
pub struct JsonFileStore<T> {
    path: PathBuf,
    _record: PhantomData<fn() -> T>,
}

impl<T> JsonFileStore<T> {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            _record: PhantomData,
        }
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl<T> RecordStore<T> for JsonFileStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    fn load(&self) -> Result<T, StoreError> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "creating empty record");
            let record = T::default();
            self.save(&record)?;
            return Ok(record);
        }
        let text = fs::read_to_string(&self.path).map_err(|e| self.io_err(e))?;
        serde_json::from_str(&text).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, record: &T) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }
        let text = serde_json::to_string_pretty(record).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, text).map_err(|e| self.io_err(e))
    }
}
