use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::clients::traits::{BackendError, CallOptions, GenerationBackend};
use crate::config::GenerationConfig;

const REFINE_INSTRUCTION: &str = "The previous message is your draft. Revise it into the final \
     document: fix schema problems, drop unsupported claims, keep citation IDs. Return the \
     complete JSON object only.";

/// OpenAI-compatible chat-completions backend in JSON-object mode
#[derive(Clone, Debug)]
pub struct OpenAiBackend {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    max_tokens: u32,
    timeout_ms: u64,
}

impl OpenAiBackend {
    pub fn new(cfg: &GenerationConfig, api_key: Option<String>) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| BackendError::Transport(format!("build http client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", cfg.base_url.trim_end_matches('/')),
            model: cfg.model.clone(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            max_tokens: cfg.max_tokens,
            timeout_ms: cfg.timeout_ms,
        })
    }

    fn messages(system: &str, user: &str, prior: Option<&Value>) -> Value {
        let mut messages = vec![
            json!({"role": "system", "content": system}),
            json!({"role": "user", "content": user}),
        ];
        if let Some(draft) = prior {
            messages.push(json!({"role": "assistant", "content": draft.to_string()}));
            messages.push(json!({"role": "user", "content": REFINE_INSTRUCTION}));
        }
        Value::Array(messages)
    }
}

#[async_trait]
impl GenerationBackend for OpenAiBackend {
    async fn call(
        &self,
        system: &str,
        user: &str,
        options: &CallOptions,
    ) -> Result<Value, BackendError> {
        let api_key = self.api_key.as_deref().ok_or(BackendError::MissingApiKey)?;
        let body = json!({
            "model": self.model,
            "messages": Self::messages(system, user, options.prior.as_ref()),
            "temperature": options.temperature,
            "max_tokens": self.max_tokens,
            "response_format": {"type": "json_object"}
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Timeout {
                        timeout_ms: self.timeout_ms,
                    }
                } else {
                    BackendError::Transport(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            return Err(BackendError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let v: Value = resp
            .json()
            .await
            .map_err(|e| BackendError::Parse(format!("response envelope: {}", e)))?;
        let content = v["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| BackendError::Parse("missing choices[0].message.content".into()))?;
        parse_json_payload(content)
    }
}

/// Parse a JSON object from model text, stripping code fences if present
pub fn parse_json_payload(text: &str) -> Result<Value, BackendError> {
    let trimmed = text
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    serde_json::from_str(trimmed).map_err(|e| BackendError::Parse(format!("payload JSON: {}", e)))
}
