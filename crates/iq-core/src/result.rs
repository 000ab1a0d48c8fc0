use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Label of one of the three choices offered each round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OptionId {
    /// First choice.
    A,
    /// Second choice.
    B,
    /// Third choice.
    C,
}

impl OptionId {
    /// All ids in display order.
    pub const ALL: [OptionId; 3] = [OptionId::A, OptionId::B, OptionId::C];

    /// Parse an id, accepting lowercase input.
    pub fn parse(s: &str) -> CoreResult<Self> {
        match s.trim() {
            "A" | "a" => Ok(Self::A),
            "B" | "b" => Ok(Self::B),
            "C" | "c" => Ok(Self::C),
            other => Err(CoreError::InvalidOptionId(other.to_string())),
        }
    }
}

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
            Self::C => write!(f, "C"),
        }
    }
}

/// A choice offered to the player: an idiom framed as a strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdiomOption {
    /// Choice label.
    pub id: OptionId,
    /// The idiom, usually followed by its pinyin in parentheses.
    pub idiom: String,
    /// Plain word-for-word meaning.
    #[serde(rename = "literal")]
    pub literal_meaning: String,
    /// Why a player would take this action.
    #[serde(rename = "strategy")]
    pub strategy: String,
}

impl IdiomOption {
    /// The idiom without a trailing pinyin annotation.
    ///
    /// `開門見山 (kāi mén jiàn shān)` becomes `開門見山`.
    pub fn bare_idiom(&self) -> &str {
        strip_annotation(&self.idiom)
    }
}

/// Drop a trailing parenthesized annotation (ASCII or full-width parentheses).
pub fn strip_annotation(text: &str) -> &str {
    let cut = text
        .find(" (")
        .or_else(|| text.find('('))
        .or_else(|| text.find('（'))
        .unwrap_or(text.len());
    text[..cut].trim()
}

/// Structured half of a model response.
///
/// The default value is the safe-empty result used whenever the structured
/// suffix cannot be decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnResult {
    /// Round number reported by the model (1-based; 0 means unknown).
    pub round: u32,
    /// Whether the story has concluded.
    pub is_game_over: bool,
    /// Exactly three options during play, none once the game is over.
    pub options: Vec<IdiomOption>,
}

impl TurnResult {
    /// The fallback result `{ round: 0, is_game_over: false, options: [] }`.
    pub fn safe_empty() -> Self {
        Self::default()
    }

    /// Whether this is the safe-empty fallback.
    pub fn is_safe_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Look up an option by id.
    pub fn option(&self, id: OptionId) -> Option<&IdiomOption> {
        self.options.iter().find(|o| o.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(id: OptionId, idiom: &str) -> IdiomOption {
        IdiomOption {
            id,
            idiom: idiom.to_string(),
            literal_meaning: "literal".to_string(),
            strategy: "strategy".to_string(),
        }
    }

    #[test]
    fn parse_option_ids() {
        assert_eq!(OptionId::parse("a").unwrap(), OptionId::A);
        assert_eq!(OptionId::parse(" C ").unwrap(), OptionId::C);
        assert!(OptionId::parse("D").is_err());
    }

    #[test]
    fn safe_empty_default() {
        let r = TurnResult::safe_empty();
        assert_eq!(r.round, 0);
        assert!(!r.is_game_over);
        assert!(r.options.is_empty());
        assert!(r.is_safe_empty());
    }

    #[test]
    fn wire_names() {
        let json = serde_json::to_value(option(OptionId::B, "順藤摸瓜")).unwrap();
        assert_eq!(json["id"], "B");
        assert_eq!(json["literal"], "literal");
        assert_eq!(json["strategy"], "strategy");
    }

    #[test]
    fn bare_idiom_strips_pinyin() {
        let o = option(OptionId::A, "開門見山 (kāi mén jiàn shān)");
        assert_eq!(o.bare_idiom(), "開門見山");
        assert_eq!(strip_annotation("一石二鳥（yī shí èr niǎo）"), "一石二鳥");
        assert_eq!(strip_annotation("守株待兔"), "守株待兔");
    }

    #[test]
    fn option_lookup() {
        let r = TurnResult {
            round: 1,
            is_game_over: false,
            options: vec![option(OptionId::A, "甲"), option(OptionId::C, "丙")],
        };
        assert_eq!(r.option(OptionId::C).unwrap().idiom, "丙");
        assert!(r.option(OptionId::B).is_none());
    }
}
