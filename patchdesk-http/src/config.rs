use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

/// Server settings: defaults, then an optional YAML file named by
/// `PATCHDESK_CONFIG`, then individual environment variables.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Holds users.json, settings.json, journal.jsonl, patches/ and backups/.
    pub data_dir: PathBuf,
    /// Patch targets resolve under this directory.
    pub project_root: PathBuf,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub default_model: String,
    pub llm_stub: bool,
    pub llm_timeout_secs: u64,
    pub admin_email: String,
    pub admin_password: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 7000)),
            data_dir: PathBuf::from("backend/app"),
            project_root: PathBuf::from("."),
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".into(),
            default_model: patchdesk_agent::DEFAULT_MODEL.into(),
            llm_stub: false,
            llm_timeout_secs: 60,
            admin_email: "admin@example.com".into(),
            admin_password: "admin".into(),
        }
    }
}

impl ServerConfig {
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var("PATCHDESK_CONFIG") {
            Ok(path) if !path.is_empty() => Self::from_path(&path)?,
            _ => Self::default(),
        };
        cfg.apply_env(|key| std::env::var(key).ok())?;
        Ok(cfg)
    }

    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let cfg = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(cfg)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(v) = lookup("PATCHDESK_BIND") {
            self.bind = v.parse().with_context(|| format!("PATCHDESK_BIND={v}"))?;
        }
        if let Some(v) = lookup("PATCHDESK_DATA_DIR") {
            self.data_dir = v.into();
        }
        if let Some(v) = lookup("PATCHDESK_PROJECT_ROOT") {
            self.project_root = v.into();
        }
        if let Some(v) = lookup("OPENAI_API_KEY").filter(|v| !v.trim().is_empty()) {
            self.openai_api_key = Some(v);
        }
        if let Some(v) = lookup("OPENAI_BASE_URL") {
            self.openai_base_url = v;
        }
        if let Some(v) = lookup("LLM_STUB") {
            self.llm_stub = v == "1" || v.to_lowercase() == "true";
        }
        if let Some(v) = lookup("LLM_TIMEOUT_SECS") {
            self.llm_timeout_secs = v.parse().with_context(|| format!("LLM_TIMEOUT_SECS={v}"))?;
        }
        if let Some(v) = lookup("ADMIN_EMAIL") {
            self.admin_email = v;
        }
        if let Some(v) = lookup("ADMIN_PASSWORD") {
            self.admin_password = v;
        }
        Ok(())
    }

    pub fn users_file(&self) -> PathBuf {
        self.data_dir.join("users.json")
    }

    pub fn settings_file(&self) -> PathBuf {
        self.data_dir.join("settings.json")
    }

    pub fn journal_file(&self) -> PathBuf {
        self.data_dir.join("journal.jsonl")
    }
}
