//! Two-pass generation: a higher-temperature draft refined by a lower-temperature finalize pass

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::clients::{CallOptions, GenerationBackend};
use crate::config::GenerationConfig;
use crate::error::{ChiralityError, Pass, Result};

pub const DEFAULT_DRAFT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_FINAL_TEMPERATURE: f32 = 0.5;

#[derive(Clone)]
pub struct GenerationEngine {
    backend: Arc<dyn GenerationBackend>,
    draft_temperature: f32,
    final_temperature: f32,
}

impl GenerationEngine {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            backend,
            draft_temperature: DEFAULT_DRAFT_TEMPERATURE,
            final_temperature: DEFAULT_FINAL_TEMPERATURE,
        }
    }

    pub fn with_temperatures(mut self, draft: f32, finalize: f32) -> Self {
        self.draft_temperature = draft;
        self.final_temperature = finalize;
        self
    }

    pub fn from_config(backend: Arc<dyn GenerationBackend>, cfg: &GenerationConfig) -> Self {
        Self::new(backend).with_temperatures(cfg.draft_temperature, cfg.final_temperature)
    }

    /// Run draft then finalize. Returns the finalize pass output, not validated.
    pub async fn generate(&self, system: &str, user: &str) -> Result<Value> {
        debug!(
            system_len = system.len(),
            user_len = user.len(),
            "starting draft pass"
        );
        let draft = self
            .backend
            .call(system, user, &CallOptions::new(self.draft_temperature))
            .await
            .map_err(|e| ChiralityError::Generation {
                pass: Pass::Draft,
                message: e.to_string(),
            })?;
        info!(temperature = self.draft_temperature, "draft pass complete");

        let options = CallOptions::new(self.final_temperature).with_prior(draft);
        let finalized = self
            .backend
            .call(system, user, &options)
            .await
            .map_err(|e| ChiralityError::Generation {
                pass: Pass::Finalize,
                message: e.to_string(),
            })?;
        info!(temperature = self.final_temperature, "finalize pass complete");

        Ok(finalized)
    }
}

impl std::fmt::Debug for GenerationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationEngine")
            .field("draft_temperature", &self.draft_temperature)
            .field("final_temperature", &self.final_temperature)
            .finish_non_exhaustive()
    }
}
