//! Configuration for a game session.

use std::path::PathBuf;

/// Environment variable holding the Gemini API key.
pub const ENV_API_KEY: &str = "GEMINI_API_KEY";
/// Environment variable overriding the model.
pub const ENV_MODEL: &str = "IQ_MODEL";
/// Environment variable naming a cache provisioning endpoint.
pub const ENV_CACHE_ENDPOINT: &str = "IQ_CACHE_ENDPOINT";
/// Environment variable pointing at the idiom dataset.
pub const ENV_DATASET: &str = "IQ_DATASET";

/// Dataset location relative to the working directory.
pub const DEFAULT_DATASET: &str = "data/idioms_filtered.csv";

/// Configuration for a game session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    /// Model used when no cache dictates one.
    pub model: String,
    /// API key for direct provider calls.
    pub api_key: Option<String>,
    /// Provisioning endpoint; when unset the cache is provisioned directly.
    pub cache_endpoint: Option<String>,
    /// Idiom dataset CSV.
    pub dataset: PathBuf,
    /// Fail turns when the cache cannot be provisioned instead of continuing
    /// without it.
    pub require_cache: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            model: iq_gemini::DEFAULT_MODEL.to_string(),
            api_key: None,
            cache_endpoint: None,
            dataset: PathBuf::from(DEFAULT_DATASET),
            require_cache: false,
        }
    }
}

impl GameConfig {
    /// Default config overlaid with the process environment.
    pub fn from_env() -> Self {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    /// Overlay values from `lookup`. Blank values are ignored.
    pub fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(key) = get(ENV_API_KEY) {
            self.api_key = Some(key);
        }
        if let Some(model) = get(ENV_MODEL) {
            self.model = model;
        }
        if let Some(endpoint) = get(ENV_CACHE_ENDPOINT) {
            self.cache_endpoint = Some(endpoint);
        }
        if let Some(dataset) = get(ENV_DATASET) {
            self.dataset = PathBuf::from(dataset);
        }
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Provision the cache through an endpoint.
    pub fn with_cache_endpoint(mut self, url: impl Into<String>) -> Self {
        self.cache_endpoint = Some(url.into());
        self
    }

    /// Set the dataset path.
    pub fn with_dataset(mut self, path: impl Into<PathBuf>) -> Self {
        self.dataset = path.into();
        self
    }

    /// Make cache provisioning failures fatal.
    pub fn with_require_cache(mut self, require: bool) -> Self {
        self.require_cache = require;
        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn default_config() {
        let cfg = GameConfig::default();
        assert_eq!(cfg.model, "gemini-2.5-pro");
        assert_eq!(cfg.dataset, PathBuf::from(DEFAULT_DATASET));
        assert!(cfg.api_key.is_none());
        assert!(!cfg.require_cache);
    }

    #[test]
    fn builder_methods() {
        let cfg = GameConfig::default()
            .with_model("gemini-2.5-flash")
            .with_api_key("k")
            .with_cache_endpoint("http://localhost/init-cache")
            .with_require_cache(true);
        assert_eq!(cfg.model, "gemini-2.5-flash");
        assert_eq!(cfg.api_key.as_deref(), Some("k"));
        assert!(cfg.require_cache);
    }

    #[test]
    fn overlay_skips_blank_values() {
        let env: HashMap<&str, &str> = [(ENV_MODEL, "gemini-2.5-flash"), (ENV_API_KEY, " ")]
            .into_iter()
            .collect();
        let cfg = GameConfig::default()
            .with_api_key("stored")
            .overlay(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.model, "gemini-2.5-flash");
        assert_eq!(cfg.api_key.as_deref(), Some("stored"));
        assert_eq!(cfg.dataset, PathBuf::from(DEFAULT_DATASET));
    }
}
