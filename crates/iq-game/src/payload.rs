//! Decoding the JSON payload that trails each model response.

use std::collections::HashSet;

use serde::Deserialize;
use thiserror::Error;

use iq_core::{IdiomOption, OptionId, TurnResult};

/// Number of options offered while the game is running.
pub const OPTIONS_PER_ROUND: usize = 3;

/// Why a payload could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    /// Nothing followed the separator.
    #[error("payload is empty")]
    Empty,

    /// The text after the separator is not JSON.
    #[error("payload is not valid JSON: {0}")]
    Syntax(String),

    /// JSON that does not have the turn shape.
    #[error("payload does not match the turn schema: {0}")]
    Schema(String),

    /// A running game offered the wrong number of options.
    #[error("expected 3 options during play, got {0}")]
    OptionCount(usize),

    /// A finished game still offered options.
    #[error("game is over but {0} options were offered")]
    OptionsAfterGameOver(usize),

    /// Two options share an id.
    #[error("option {0} appears more than once")]
    DuplicateOption(OptionId),

    /// An option without an idiom.
    #[error("option {0} has an empty idiom")]
    EmptyIdiom(OptionId),
}

#[derive(Deserialize)]
struct RawTurn {
    round: u32,
    #[serde(default)]
    is_game_over: bool,
    #[serde(default)]
    options: Vec<IdiomOption>,
}

/// Remove Markdown code fences the model sometimes wraps the JSON in.
pub fn strip_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

/// Strictly decode a payload.
pub fn decode_payload(text: &str) -> Result<TurnResult, PayloadError> {
    let cleaned = strip_fences(text);
    if cleaned.is_empty() {
        return Err(PayloadError::Empty);
    }

    let value: serde_json::Value =
        serde_json::from_str(&cleaned).map_err(|e| PayloadError::Syntax(e.to_string()))?;
    let raw: RawTurn =
        serde_json::from_value(value).map_err(|e| PayloadError::Schema(e.to_string()))?;

    let mut seen = HashSet::new();
    for option in &raw.options {
        if !seen.insert(option.id) {
            return Err(PayloadError::DuplicateOption(option.id));
        }
        if option.idiom.trim().is_empty() {
            return Err(PayloadError::EmptyIdiom(option.id));
        }
    }
    if raw.is_game_over && !raw.options.is_empty() {
        return Err(PayloadError::OptionsAfterGameOver(raw.options.len()));
    }
    if !raw.is_game_over && raw.options.len() != OPTIONS_PER_ROUND {
        return Err(PayloadError::OptionCount(raw.options.len()));
    }

    Ok(TurnResult {
        round: raw.round,
        is_game_over: raw.is_game_over,
        options: raw.options,
    })
}

/// Decode a payload, falling back to the safe-empty result.
pub fn parse_payload(text: &str) -> TurnResult {
    decode_payload(text).unwrap_or_else(|err| {
        tracing::warn!(%err, payload = %text, "falling back to empty turn result");
        TurnResult::safe_empty()
    })
}
