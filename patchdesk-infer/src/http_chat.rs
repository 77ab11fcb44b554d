use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{ChatMessage, CompletionEngine, CompletionError, CompletionRequest};

#[derive(Serialize)]
struct OpenAIChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Non-streaming client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct HttpChatEngine {
    client: reqwest::Client,
    base_url: String,
}

impl HttpChatEngine {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CompletionError::new(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CompletionEngine for HttpChatEngine {
    async fn complete(&self, req: CompletionRequest) -> Result<String, CompletionError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = OpenAIChatRequest {
            model: &req.model,
            messages: &req.messages,
            stream: false,
        };

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&req.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::new(format!("HTTP error: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            tracing::warn!(%status, model = %req.model, "completion request rejected");
            return Err(CompletionError::new(format!("HTTP status {status}: {detail}")));
        }

        let completion: ChatCompletion = resp
            .json()
            .await
            .map_err(|e| CompletionError::new(format!("bad response body: {e}")))?;
        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CompletionError::new("response has no choices"))?;
        choice
            .message
            .content
            .ok_or_else(|| CompletionError::new("first choice has no content"))
    }
}
