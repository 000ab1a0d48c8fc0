//! The player-facing record of a game.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use iq_core::{IdiomOption, OptionId};

/// One line of the story as the player saw it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoryEntry {
    /// Narrative text: the scenario's opening context or a generated segment.
    Narrative {
        /// Prose shown to the player.
        text: String,
        /// When it was recorded.
        timestamp: DateTime<Utc>,
    },
    /// An option the player picked.
    Choice {
        /// Slot the option was offered in.
        id: OptionId,
        /// Idiom as offered, pinyin included.
        idiom: String,
        /// Strategy the option described.
        strategy: String,
        /// When the choice was made.
        timestamp: DateTime<Utc>,
    },
    /// A failure shown inline instead of a story segment.
    Error {
        /// User-facing message.
        message: String,
        /// When the failure happened.
        timestamp: DateTime<Utc>,
    },
}

impl StoryEntry {
    /// Whether the player produced this entry.
    pub fn is_player(&self) -> bool {
        matches!(self, Self::Choice { .. })
    }

    /// The text as displayed.
    pub fn text(&self) -> String {
        match self {
            Self::Narrative { text, .. } => text.clone(),
            Self::Choice {
                idiom, strategy, ..
            } => format!("選擇【{idiom}】\n策略：{strategy}"),
            Self::Error { message, .. } => message.clone(),
        }
    }
}

/// Chronological log of a game.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoryLog {
    entries: Vec<StoryEntry>,
}

impl StoryLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a narrative segment.
    pub fn narrate(&mut self, text: impl Into<String>) {
        self.entries.push(StoryEntry::Narrative {
            text: text.into(),
            timestamp: Utc::now(),
        });
    }

    /// Record the player's choice.
    pub fn choose(&mut self, option: &IdiomOption) {
        self.entries.push(StoryEntry::Choice {
            id: option.id,
            idiom: option.idiom.clone(),
            strategy: option.strategy.clone(),
            timestamp: Utc::now(),
        });
    }

    /// Record a failure.
    pub fn error(&mut self, message: impl Into<String>) {
        self.entries.push(StoryEntry::Error {
            message: message.into(),
            timestamp: Utc::now(),
        });
    }

    /// Get all entries.
    pub fn entries(&self) -> &[StoryEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Idioms the player picked, in order.
    pub fn chosen_idioms(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|e| match e {
                StoryEntry::Choice { idiom, .. } => Some(idiom.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Export the log as markdown.
    pub fn export_markdown(&self, title: &str) -> String {
        let mut out = format!("# {title}\n\n");
        for entry in &self.entries {
            match entry {
                StoryEntry::Narrative { text, .. } => {
                    out.push_str(&format!("{text}\n\n"));
                }
                StoryEntry::Choice {
                    id,
                    idiom,
                    strategy,
                    ..
                } => {
                    out.push_str(&format!("> **{id}. {idiom}**  \n> {strategy}\n\n"));
                }
                StoryEntry::Error { message, .. } => {
                    let quoted = message.replace('\n', "\n> ");
                    out.push_str(&format!("> *{quoted}*\n\n"));
                }
            }
        }
        out
    }

    /// Export the log as plain text, one entry per paragraph.
    pub fn export_text(&self) -> String {
        self.entries
            .iter()
            .map(|e| e.text())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option() -> IdiomOption {
        IdiomOption {
            id: OptionId::A,
            idiom: "開門見山".to_string(),
            literal_meaning: "打開門就看到山".to_string(),
            strategy: "直接說重點".to_string(),
        }
    }

    #[test]
    fn records_in_order() {
        let mut log = StoryLog::new();
        assert!(log.is_empty());
        log.narrate("你走進辦公室。");
        log.choose(&option());
        log.error("連線中斷");
        assert_eq!(log.len(), 3);
        assert!(log.entries()[1].is_player());
        assert_eq!(log.chosen_idioms(), vec!["開門見山"]);
    }

    #[test]
    fn choice_text_matches_display() {
        let mut log = StoryLog::new();
        log.choose(&option());
        assert_eq!(log.entries()[0].text(), "選擇【開門見山】\n策略：直接說重點");
    }

    #[test]
    fn markdown_export() {
        let mut log = StoryLog::new();
        log.narrate("開場");
        log.choose(&option());
        let md = log.export_markdown("辦公室生存戰");
        assert!(md.starts_with("# 辦公室生存戰\n\n開場\n\n"));
        assert!(md.contains("> **A. 開門見山**"));
    }

    #[test]
    fn text_export() {
        let mut log = StoryLog::new();
        log.narrate("一");
        log.narrate("二");
        assert_eq!(log.export_text(), "一\n\n二");
    }
}
