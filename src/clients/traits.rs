use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Per-call generation options
#[derive(Debug, Clone, PartialEq)]
pub struct CallOptions {
    pub temperature: f32,
    /// Earlier candidate the backend should refine, if any
    pub prior: Option<Value>,
}

impl CallOptions {
    pub fn new(temperature: f32) -> Self {
        Self {
            temperature,
            prior: None,
        }
    }

    pub fn with_prior(mut self, prior: Value) -> Self {
        self.prior = Some(prior);
        self
    }
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("API key not configured")]
    MissingApiKey,
}

/// A text-generation backend returning an opaque JSON payload.
///
/// Implementations must not assume the payload matches any schema.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn call(
        &self,
        system: &str,
        user: &str,
        options: &CallOptions,
    ) -> Result<Value, BackendError>;
}
