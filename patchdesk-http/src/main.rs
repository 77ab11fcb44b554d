use std::sync::Arc;
use std::time::Duration;

use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use patchdesk_infer::{CompletionEngine, HttpChatEngine, StubEngine};

mod config;
mod error;
mod routes;
mod state;

use config::ServerConfig;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("patchdesk_http=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    let cfg = ServerConfig::load()?;
    tracing::info!(
        data_dir = %cfg.data_dir.display(),
        project_root = %cfg.project_root.display(),
        "starting patchdesk"
    );

    let llm: Arc<dyn CompletionEngine> = if cfg.llm_stub {
        tracing::info!("LLM stub enabled, no model calls will be made");
        Arc::new(StubEngine::default())
    } else {
        Arc::new(HttpChatEngine::new(
            cfg.openai_base_url.clone(),
            Duration::from_secs(cfg.llm_timeout_secs),
        )?)
    };

    let state = AppState::build(&cfg, llm)?;
    let app = routes::app(state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(cfg.bind).await?;
    tracing::info!(addr = %cfg.bind, "patchdesk HTTP server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
