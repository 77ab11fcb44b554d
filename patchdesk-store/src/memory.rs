use std::sync::Mutex;

use crate::{RecordStore, StoreError};

/// Non-durable record store for tests and dry runs.
pub struct MemoryStore<T> {
    record: Mutex<T>,
}

impl<T: Default> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            record: Mutex::new(T::default()),
        }
    }
}

impl<T: Default> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MemoryStore<T> {
    pub fn with_record(record: T) -> Self {
        Self {
            record: Mutex::new(record),
        }
    }
}

impl<T> RecordStore<T> for MemoryStore<T>
where
    T: Clone + Send,
{
    fn load(&self) -> Result<T, StoreError> {
        let inner = self.record.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.clone())
    }

    fn save(&self, record: &T) -> Result<(), StoreError> {
        let mut inner = self.record.lock().map_err(|_| StoreError::Poisoned)?;
        *inner = record.clone();
        Ok(())
    }
}
