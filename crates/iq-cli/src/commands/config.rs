use comfy_table::{ContentArrangement, Table};

use iq_gemini::store::{API_KEY_KEY, MODEL_KEY};
use iq_gemini::{JsonFileStore, KeyValueStore};

/// Store the API key.
pub fn set_key(settings: &JsonFileStore, key: &str) -> Result<(), String> {
    let key = key.trim();
    if key.is_empty() {
        return Err("API key must not be empty".into());
    }
    settings.set(API_KEY_KEY, key).map_err(|e| e.to_string())?;
    println!("  Stored API key in {}", settings.path().display());
    Ok(())
}

/// Store the model used for new games.
pub fn set_model(settings: &JsonFileStore, model: &str) -> Result<(), String> {
    let model = model.trim();
    if model.is_empty() {
        return Err("model must not be empty".into());
    }
    settings.set(MODEL_KEY, model).map_err(|e| e.to_string())?;
    println!("  Model set to {model}");
    Ok(())
}

pub fn show(settings: &JsonFileStore) -> Result<(), String> {
    let key = settings.api_key().map_err(|e| e.to_string())?;
    let model = settings.model().map_err(|e| e.to_string())?;

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Setting", "Value"]);
    table.add_row(vec!["settings file".to_string(), settings.path().display().to_string()]);
    table.add_row(vec![
        "api key".to_string(),
        key.as_deref().map(mask).unwrap_or_else(|| "not set".to_string()),
    ]);
    table.add_row(vec!["model".to_string(), model]);

    println!("{table}");
    Ok(())
}

/// Show only the ends of a secret.
fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_secrets() {
        assert_eq!(mask("abc"), "***");
        assert_eq!(mask("AIzaSyDEADBEEF1234"), "AIza…1234");
    }
}
