use serde::{Deserialize, Serialize};

/// Main configuration loaded from chirality.toml and environment variables
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Runtime configuration loaded from environment variables
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// Backend endpoint and two-pass sampling settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub base_url: String,
    pub model: String,
    pub draft_temperature: f32,
    pub final_temperature: f32,
    pub timeout_ms: u64,
    pub max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            draft_temperature: 0.7,
            final_temperature: 0.5,
            timeout_ms: 60_000,
            max_tokens: 2048,
        }
    }
}

/// Evidence retrieval settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Remote search endpoint; retrieval is skipped when unset
    pub url: Option<String>,
    pub top_k: usize,
    pub snippet_max_chars: usize,
    pub timeout_ms: u64,
    pub min_score: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            url: None,
            top_k: crate::orchestrate::DEFAULT_TOP_K,
            snippet_max_chars: crate::rag::SNIPPET_MAX_CHARS,
            timeout_ms: 5_000,
            min_score: 0.0,
        }
    }
}

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub api_key: Option<String>,
    pub produce_timeout_ms: u64,
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            produce_timeout_ms: 180_000,
            log_level: "chirality_core=info".to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn load_from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            api_key: lookup("CHIR_API_KEY")
                .or_else(|| lookup("OPENAI_API_KEY"))
                .filter(|k| !k.trim().is_empty()),
            produce_timeout_ms: lookup("CHIR_PRODUCE_TIMEOUT_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.produce_timeout_ms),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
        }
    }
}

impl Config {
    /// Load configuration from TOML file and environment variables.
    /// Uses CHIRALITY_CONFIG or defaults to "chirality.toml".
    pub fn load() -> anyhow::Result<Self> {
        crate::load_env();

        let config_path =
            std::env::var("CHIRALITY_CONFIG").unwrap_or_else(|_| "chirality.toml".to_string());

        let mut config: Config = if let Ok(content) = std::fs::read_to_string(&config_path) {
            toml::from_str(&content)?
        } else {
            tracing::debug!("Config file {} not found, using defaults", config_path);
            Self::default()
        };

        config.apply_overrides(|k| std::env::var(k).ok());
        config.runtime = RuntimeConfig::load_from_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply `CHIR_*` overrides. Unparsable numeric values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let g = &mut self.generation;
        if let Some(v) = lookup("CHIR_BASE_URL") {
            g.base_url = v;
        }
        if let Some(v) = lookup("CHIR_MODEL") {
            g.model = v;
        }
        if let Some(v) = lookup("CHIR_DRAFT_TEMPERATURE").and_then(|v| v.parse().ok()) {
            g.draft_temperature = v;
        }
        if let Some(v) = lookup("CHIR_FINAL_TEMPERATURE").and_then(|v| v.parse().ok()) {
            g.final_temperature = v;
        }
        if let Some(v) = lookup("CHIR_GEN_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            g.timeout_ms = v;
        }

        let r = &mut self.retrieval;
        if let Some(v) = lookup("CHIR_RETRIEVAL_URL") {
            r.url = Some(v).filter(|u| !u.trim().is_empty());
        }
        if let Some(v) = lookup("CHIR_TOPK").and_then(|v| v.parse().ok()) {
            r.top_k = v;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        let g = &self.generation;
        if !(0.0..=2.0).contains(&g.draft_temperature) {
            anyhow::bail!("CHIR_DRAFT_TEMPERATURE must be between 0.0 and 2.0");
        }
        if !(0.0..=2.0).contains(&g.final_temperature) {
            anyhow::bail!("CHIR_FINAL_TEMPERATURE must be between 0.0 and 2.0");
        }
        if g.timeout_ms == 0 {
            anyhow::bail!("CHIR_GEN_TIMEOUT_MS must be > 0");
        }
        if !g.base_url.starts_with("http://") && !g.base_url.starts_with("https://") {
            anyhow::bail!("CHIR_BASE_URL must be an http(s) URL: {}", g.base_url);
        }
        if !(1..=50).contains(&self.retrieval.top_k) {
            anyhow::bail!("CHIR_TOPK must be between 1 and 50");
        }
        if self.retrieval.timeout_ms == 0 {
            anyhow::bail!("retrieval.timeout_ms must be > 0");
        }
        if self.runtime.produce_timeout_ms == 0 {
            anyhow::bail!("CHIR_PRODUCE_TIMEOUT_MS must be > 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_validate() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retrieval.top_k, 12);
        assert_eq!(config.generation.draft_temperature, 0.7);
        assert_eq!(config.generation.final_temperature, 0.5);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [generation]
            model = "local-model"

            [retrieval]
            top_k = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.generation.model, "local-model");
        assert_eq!(config.generation.final_temperature, 0.5);
        assert_eq!(config.retrieval.top_k, 4);
        assert!(config.retrieval.url.is_none());
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[
            ("CHIR_MODEL", "m2"),
            ("CHIR_DRAFT_TEMPERATURE", "0.9"),
            ("CHIR_TOPK", "not-a-number"),
            ("CHIR_RETRIEVAL_URL", "http://localhost:9000/search"),
        ]));
        assert_eq!(config.generation.model, "m2");
        assert_eq!(config.generation.draft_temperature, 0.9);
        assert_eq!(config.retrieval.top_k, crate::prompts::MAX_EVIDENCE);
        assert_eq!(
            config.retrieval.url.as_deref(),
            Some("http://localhost:9000/search")
        );
    }

    #[test]
    fn out_of_range_values_rejected() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[("CHIR_FINAL_TEMPERATURE", "2.5")]));
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.retrieval.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn api_key_prefers_chir_key() {
        let rt = RuntimeConfig::from_lookup(lookup(&[
            ("CHIR_API_KEY", "chir"),
            ("OPENAI_API_KEY", "openai"),
        ]));
        assert_eq!(rt.api_key.as_deref(), Some("chir"));
        let rt = RuntimeConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "openai")]));
        assert_eq!(rt.api_key.as_deref(), Some("openai"));
    }

    #[test]
    fn log_level_comes_from_rust_log() {
        let rt = RuntimeConfig::from_lookup(lookup(&[("RUST_LOG", "chirality_core=debug")]));
        assert_eq!(rt.log_level, "chirality_core=debug");
        assert_eq!(
            RuntimeConfig::from_lookup(lookup(&[])).log_level,
            "chirality_core=info"
        );
    }
}
