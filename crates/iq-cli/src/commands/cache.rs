use std::path::Path;

use chrono::{Local, Utc};
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use iq_gemini::{CacheBootstrapper, CacheError, JsonFileStore, ProviderFailure, classify};

/// Provision a context cache, reusing a valid one unless `force` is set.
pub async fn init(
    settings: &JsonFileStore,
    session_file: Option<&Path>,
    dataset: Option<&Path>,
    force: bool,
) -> Result<(), String> {
    let config = super::resolve_config(settings, None, None, dataset.map(Path::to_path_buf))?;
    let store = JsonFileStore::new(super::cache_file(settings, session_file));
    let boot = CacheBootstrapper::new(super::provisioner(&config), store);

    if force {
        boot.invalidate().map_err(|e| e.to_string())?;
    }
    let descriptor = boot.ensure_cache().await.map_err(describe)?;

    println!(
        "  {} {} ({} tokens, model {})",
        "Cache ready:".green().bold(),
        descriptor.cache_handle,
        descriptor.token_count,
        descriptor.model_id
    );
    println!(
        "  Expires {}",
        descriptor.expires_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
    );
    Ok(())
}

/// Show the stored cache descriptor and whether it is still valid.
pub fn status(settings: &JsonFileStore, session_file: Option<&Path>) -> Result<(), String> {
    let path = super::cache_file(settings, session_file);
    let config = super::resolve_config(settings, None, None, None)?;
    let boot = CacheBootstrapper::new(super::provisioner(&config), JsonFileStore::new(&path));

    let Some(descriptor) = boot.stored().map_err(|e| e.to_string())? else {
        println!("  No cache stored in {}", path.display());
        return Ok(());
    };

    let now = Utc::now();
    let state = if descriptor.is_valid_at(now) {
        let left = descriptor.remaining_at(now);
        format!("valid, {} min left", left.num_minutes())
            .green()
            .to_string()
    } else {
        "expired".yellow().to_string()
    };

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec!["handle".to_string(), descriptor.cache_handle.clone()]);
    table.add_row(vec!["model".to_string(), descriptor.model_id.clone()]);
    table.add_row(vec!["tokens".to_string(), descriptor.token_count.to_string()]);
    table.add_row(vec![
        "expires".to_string(),
        descriptor
            .expires_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
            .to_string(),
    ]);
    table.add_row(vec!["status".to_string(), state]);

    println!("{table}");
    Ok(())
}

/// Forget the stored cache descriptor.
pub fn clear(settings: &JsonFileStore, session_file: Option<&Path>) -> Result<(), String> {
    let path = super::cache_file(settings, session_file);
    let config = super::resolve_config(settings, None, None, None)?;
    let boot = CacheBootstrapper::new(super::provisioner(&config), JsonFileStore::new(&path));
    boot.invalidate().map_err(|e| e.to_string())?;
    println!("  Cleared cache descriptor in {}", path.display());
    Ok(())
}

/// Message for a provisioning failure.
fn describe(err: CacheError) -> String {
    match err {
        CacheError::MissingCredential => {
            classify(&ProviderFailure::missing_credential()).user_message
        }
        other => other.to_string(),
    }
}
