use std::path::Path;

use patchdesk_types::{Settings, API_KEY_MASK};
use serde_json::{Map, Value};

use crate::{JsonFileStore, RecordStore, StoreError};

pub struct SettingsStore {
    record: Box<dyn RecordStore<Settings>>,
}

impl SettingsStore {
    pub fn new(record: impl RecordStore<Settings> + 'static) -> Self {
        Self {
            record: Box::new(record),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> Self {
        Self::new(JsonFileStore::<Settings>::new(path))
    }

    /// Raw settings, including the real API key.
    pub fn load(&self) -> Result<Settings, StoreError> {
        self.record.load()
    }

    /// Settings safe to hand to a client: a stored API key reads as the mask.
    pub fn masked(&self) -> Result<Settings, StoreError> {
        let mut settings = self.record.load()?;
        if settings.api_key.is_some() {
            settings.api_key = Some(API_KEY_MASK.to_string());
        }
        Ok(settings)
    }

    /// Apply `updates` key by key and persist the result.
    ///
    /// An `api_key` that is blank, not a string, or equal to the mask is
    /// skipped so that echoing back a masked form never clobbers the key.
    /// A `model` that is neither a string nor null rejects the whole update.
    pub fn merge(&self, updates: Map<String, Value>) -> Result<Settings, StoreError> {
        let mut settings = self.record.load()?;
        for (key, value) in updates {
            match key.as_str() {
                "api_key" => match value.as_str() {
                    Some(k) if !k.trim().is_empty() && k != API_KEY_MASK => {
                        settings.api_key = Some(k.to_string());
                    }
                    _ => tracing::debug!("ignoring api_key update"),
                },
                "model" => match value {
                    Value::String(m) => settings.model = Some(m),
                    Value::Null => settings.model = None,
                    _ => {
                        return Err(StoreError::InvalidValue {
                            key,
                            reason: "expected a string or null",
                        })
                    }
                },
                _ => {
                    settings.extra.insert(key, value);
                }
            }
        }
        self.record.save(&settings)?;
        Ok(settings)
    }
}
