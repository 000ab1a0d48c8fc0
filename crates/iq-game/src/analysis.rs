//! End-of-game analysis of the player's choices.

use serde::{Deserialize, Serialize};

use iq_gemini::ClassifiedError;

use crate::payload::strip_fences;
use crate::story::StoryLog;

/// Title given when no analysis could be produced.
pub const FALLBACK_TITLE: &str = "未知旅人";

/// Counts of the strategy styles the player leaned on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyStats {
    /// Bold, risk-taking choices.
    #[serde(default)]
    pub aggressive: u32,
    /// Careful, steady choices.
    #[serde(default)]
    pub conservative: u32,
    /// Evasive or self-defeating choices.
    #[serde(default)]
    pub negative: u32,
}

/// The model's verdict on a finished game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameAnalysis {
    /// Player archetype, e.g. `深思熟慮的智者`.
    pub title: String,
    /// Short prose evaluation of how the player used idioms.
    pub evaluation: String,
    /// Strategy counts over the whole game.
    #[serde(default)]
    pub stats: StrategyStats,
}

impl GameAnalysis {
    /// Placeholder analysis used whenever generation fails.
    pub fn fallback(error: &ClassifiedError) -> Self {
        Self {
            title: FALLBACK_TITLE.to_string(),
            evaluation: format!(
                "無法連接 AI 進行分析。但你完成了一次精彩的冒險！\n\n{}",
                error.user_message
            ),
            stats: StrategyStats::default(),
        }
    }

    /// Parse the model's reply.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(&strip_fences(text))
    }
}

/// Prompt asking the model to analyze `story`.
pub fn analysis_prompt(story: &StoryLog) -> String {
    let history = story
        .entries()
        .iter()
        .map(|entry| {
            let label = if entry.is_player() {
                "User Choice"
            } else {
                "System Story"
            };
            format!("{label}: {}", entry.text())
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Analyze the following gameplay session of the "Idiom Survival Guide".

History:
{history}

Task:
1. Determine the player's style (e.g., The Thinker, The Doer, The Learner).
2. Provide a detailed evaluation of their understanding of idioms and strategy.
3. Count the types of strategies used (Aggressive, Conservative, Negative).

Output Format (JSON):
{{
  "title": "Player Title (e.g., 深思熟慮的智者)",
  "evaluation": "Detailed evaluation text...",
  "stats": {{
    "aggressive": 2,
    "conservative": 1,
    "negative": 0
  }}
}}

IMPORTANT: Return ONLY valid JSON."#
    )
}

#[cfg(test)]
mod tests {
    use iq_core::{IdiomOption, OptionId};
    use iq_gemini::{ProviderFailure, classify};

    use super::*;

    #[test]
    fn parses_fenced_reply() {
        let reply = "```json\n{\"title\":\"果斷的行動派\",\"evaluation\":\"很好\",\"stats\":{\"aggressive\":3,\"conservative\":1,\"negative\":0}}\n```";
        let analysis = GameAnalysis::parse(reply).unwrap();
        assert_eq!(analysis.title, "果斷的行動派");
        assert_eq!(analysis.stats.aggressive, 3);
    }

    #[test]
    fn missing_stats_default_to_zero() {
        let analysis = GameAnalysis::parse(r#"{"title":"t","evaluation":"e"}"#).unwrap();
        assert_eq!(analysis.stats, StrategyStats::default());
    }

    #[test]
    fn fallback_embeds_user_message() {
        let error = classify(&ProviderFailure::new("socket closed"));
        let analysis = GameAnalysis::fallback(&error);
        assert_eq!(analysis.title, FALLBACK_TITLE);
        assert!(analysis.evaluation.contains("socket closed"));
        assert_eq!(analysis.stats, StrategyStats::default());
    }

    #[test]
    fn prompt_labels_entries() {
        let mut story = StoryLog::new();
        story.narrate("你在森林裡迷路了。");
        story.choose(&IdiomOption {
            id: OptionId::C,
            idiom: "按圖索驥".to_string(),
            literal_meaning: "照著圖找馬".to_string(),
            strategy: "照地圖走".to_string(),
        });
        let prompt = analysis_prompt(&story);
        assert!(prompt.contains("System Story: 你在森林裡迷路了。"));
        assert!(prompt.contains("User Choice: 選擇【按圖索驥】\n策略：照地圖走"));
        assert!(prompt.ends_with("IMPORTANT: Return ONLY valid JSON."));
    }
}
