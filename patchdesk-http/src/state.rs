use std::fs;
use std::sync::Arc;

use anyhow::Context;
use patchdesk_agent::AgentGateway;
use patchdesk_infer::CompletionEngine;
use patchdesk_journal::Journal;
use patchdesk_patches::PatchEngine;
use patchdesk_store::{SettingsStore, UserStore};

use crate::config::ServerConfig;

/// Services shared by all handlers, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserStore>,
    pub settings: Arc<SettingsStore>,
    pub engine: Arc<PatchEngine>,
    pub agent: Arc<AgentGateway>,
}

impl AppState {
    pub fn build(cfg: &ServerConfig, llm: Arc<dyn CompletionEngine>) -> anyhow::Result<Self> {
        fs::create_dir_all(&cfg.data_dir)
            .with_context(|| format!("creating {}", cfg.data_dir.display()))?;

        let users = Arc::new(UserStore::open(cfg.users_file()));
        if users.ensure_default_admin(&cfg.admin_email, &cfg.admin_password)? {
            tracing::info!(email = %cfg.admin_email, "default admin created");
        }
        let settings = Arc::new(SettingsStore::open(cfg.settings_file()));

        let journal = Arc::new(Journal::open(cfg.journal_file())?);
        let engine = Arc::new(
            PatchEngine::open(&cfg.data_dir, cfg.project_root.clone())?.with_journal(journal),
        );

        let agent = Arc::new(
            AgentGateway::new(settings.clone(), llm, engine.clone())
                .with_env_api_key(cfg.openai_api_key.clone())
                .with_default_model(cfg.default_model.clone()),
        );

        Ok(Self {
            users,
            settings,
            engine,
            agent,
        })
    }
}
