pub mod cache;
pub mod config;
pub mod dataset;
pub mod lookup;
pub mod play;
pub mod scenarios;

use std::path::{Path, PathBuf};

use iq_core::Difficulty;
use iq_game::GameConfig;
use iq_gemini::{
    CacheProvisioner, DirectProvisioner, EndpointProvisioner, JsonFileStore, KeyValueStore,
};

/// The settings store at `path`, or the default location.
pub fn settings_store(path: Option<&Path>) -> JsonFileStore {
    match path {
        Some(path) => JsonFileStore::new(path),
        None => JsonFileStore::default_location(),
    }
}

/// Parse an optional difficulty argument.
fn parse_difficulty(value: Option<&str>) -> Result<Option<Difficulty>, String> {
    value
        .map(|v| Difficulty::parse(v).map_err(|e| e.to_string()))
        .transpose()
}

/// Build the game configuration: stored settings, then the environment,
/// then command-line flags.
fn resolve_config(
    settings: &JsonFileStore,
    model: Option<String>,
    api_key: Option<String>,
    dataset: Option<PathBuf>,
) -> Result<GameConfig, String> {
    let mut config = GameConfig::default().with_model(settings.model().map_err(|e| e.to_string())?);
    if let Some(key) = settings.api_key().map_err(|e| e.to_string())? {
        config = config.with_api_key(key);
    }
    config = config.overlay(|key| std::env::var(key).ok());

    if let Some(model) = model {
        config = config.with_model(model);
    }
    if let Some(key) = api_key {
        config = config.with_api_key(key);
    }
    if let Some(dataset) = dataset {
        config = config.with_dataset(dataset);
    }
    Ok(config)
}

/// File holding the cache descriptor when the player opts into reuse.
fn cache_file(settings: &JsonFileStore, session_file: Option<&Path>) -> PathBuf {
    session_file
        .map(Path::to_path_buf)
        .unwrap_or_else(|| settings.path().with_file_name("cache.json"))
}

/// The provisioner matching the configuration.
fn provisioner(config: &GameConfig) -> Box<dyn CacheProvisioner> {
    match &config.cache_endpoint {
        Some(url) => Box::new(EndpointProvisioner::new(url.clone())),
        None => Box::new(
            DirectProvisioner::new(config.api_key.clone(), &config.dataset)
                .with_model(config.model.clone()),
        ),
    }
}

/// Truncate to `max` characters, marking the cut.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate("成語故事", 10), "成語故事");
        assert_eq!(truncate("一二三四五六", 4), "一二三…");
    }

    #[test]
    fn difficulty_argument() {
        assert_eq!(parse_difficulty(None).unwrap(), None);
        assert_eq!(parse_difficulty(Some("困難")).unwrap(), Some(Difficulty::Hard));
        assert!(parse_difficulty(Some("extreme")).is_err());
    }
}
