use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::phrase::{PhraseRequest, PhraseSource, SYSTEM_PROMPT};
use crate::config::GuideConfig;
use crate::error::PhraseError;

const API_VERSION: &str = "2023-06-01";

/// Messages-API client for guide phrases.
#[derive(Clone)]
pub struct PhraseClient {
    client: Client,
    endpoint: String,
    model: String,
    max_tokens: u32,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [Message; 1],
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

impl PhraseClient {
    pub fn new(config: &GuideConfig) -> Self {
        let api_key = std::env::var(&config.api_key_env).ok().filter(|k| !k.is_empty());
        Self {
            client: Client::builder()
                .timeout(Duration::from_millis(config.timeout_ms)) // Network-level cap; the scheduler enforces its own
                .build()
                .unwrap_or_default(),
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            api_key,
        }
    }

    pub async fn generate(&self, request: &PhraseRequest) -> Result<String, PhraseError> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: SYSTEM_PROMPT,
            messages: [Message {
                role: "user",
                content: request.user_prompt(),
            }],
        };

        let mut req = self
            .client
            .post(&self.endpoint)
            .header("anthropic-version", API_VERSION)
            .json(&body);
        if let Some(key) = &self.api_key {
            req = req.header("x-api-key", key);
        }

        let response = req.send().await?;
        if !response.status().is_success() {
            return Err(PhraseError::Status(response.status().as_u16()));
        }

        let parsed: MessagesResponse = response.json().await?;
        let text = parsed
            .content
            .into_iter()
            .next()
            .and_then(|b| b.text)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(PhraseError::Empty)?;

        debug!("Phrase service answered for cycle {}", request.cycle);
        Ok(text)
    }
}

impl PhraseSource for PhraseClient {
    async fn fetch(&self, request: PhraseRequest) -> Result<String, PhraseError> {
        self.generate(&request).await
    }
}
