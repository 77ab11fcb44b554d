//! Prompt gateway: one model call per request, with any proposed file change
//! stored as a patch.

use std::sync::Arc;

use patchdesk_infer::{ChatMessage, CompletionEngine, CompletionError, CompletionRequest};
use patchdesk_patches::{PatchEngine, PatchError};
use patchdesk_store::{SettingsStore, StoreError};
use serde_json::{Map, Value};
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

pub const SYSTEM_PROMPT: &str = "You are a coding assistant for a small web backend. \
Always answer with a single JSON object. To propose a change to a project file, \
answer with {\"file\": \"<path relative to the project root>\", \"code\": \"<full new file content>\"}. \
Otherwise answer with {\"message\": \"<your answer>\"}.";

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error("settings unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("could not save patch: {0}")]
    Patch(#[from] PatchError),
}

pub struct AgentGateway {
    settings: Arc<SettingsStore>,
    engine: Arc<dyn CompletionEngine>,
    patches: Arc<PatchEngine>,
    env_api_key: Option<String>,
    default_model: String,
}

impl AgentGateway {
    pub fn new(
        settings: Arc<SettingsStore>,
        engine: Arc<dyn CompletionEngine>,
        patches: Arc<PatchEngine>,
    ) -> Self {
        Self {
            settings,
            engine,
            patches,
            env_api_key: None,
            default_model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Key that takes precedence over the one in settings. Blank means unset.
    pub fn with_env_api_key(mut self, key: Option<String>) -> Self {
        self.env_api_key = key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Send `prompt` to the model and return its reply as a JSON object.
    ///
    /// A reply carrying string `file` and `code` fields is saved as a patch and
    /// the patch name is added under `patch_saved`.
    pub async fn ask(&self, prompt: &str) -> Result<Map<String, Value>, AgentError> {
        let settings = self.settings.load()?;
        let api_key = match (&self.env_api_key, settings.api_key()) {
            (Some(key), _) => key.clone(),
            (None, Some(key)) => key.to_string(),
            (None, None) => {
                return Err(AgentError::Configuration(
                    "no API key: set OPENAI_API_KEY or save api_key in settings".into(),
                ))
            }
        };
        let model = settings
            .model()
            .map(str::to_string)
            .unwrap_or_else(|| self.default_model.clone());

        tracing::info!(%model, prompt_chars = prompt.chars().count(), "agent request");
        let raw = self
            .engine
            .complete(CompletionRequest {
                api_key,
                model,
                messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)],
            })
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "completion failed"))?;

        let mut reply = parse_reply(&raw);
        let proposal = match (reply.get("file"), reply.get("code")) {
            (Some(Value::String(file)), Some(Value::String(code))) => {
                Some((file.clone(), code.clone()))
            }
            _ => None,
        };
        if let Some((file, code)) = proposal {
            let name = self.patches.create_patch(&file, code.as_bytes())?;
            tracing::info!(patch = %name, %file, "agent proposal saved");
            reply.insert("patch_saved".into(), Value::String(name));
        }
        Ok(reply)
    }
}

/// The reply as a JSON object; anything else becomes `{"message": raw}`.
pub fn parse_reply(raw: &str) -> Map<String, Value> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        _ => {
            let mut map = Map::new();
            map.insert("message".into(), Value::String(raw.to_string()));
            map
        }
    }
}
