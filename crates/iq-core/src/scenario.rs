//! Scenario catalog and difficulty levels.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// How demanding the idioms and the choices are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Everyday idioms, obvious wise choice, low stakes.
    Easy,
    /// Professional idioms, tempting risky choice, moderate stakes.
    #[default]
    Medium,
    /// Rare idioms, ambiguous choices, high stakes.
    Hard,
}

impl Difficulty {
    /// All levels in ascending order.
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    /// Parse an English or Chinese difficulty label.
    pub fn parse(s: &str) -> CoreResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "easy" | "簡單" => Ok(Self::Easy),
            "medium" | "中等" => Ok(Self::Medium),
            "hard" | "困難" => Ok(Self::Hard),
            _ => Err(CoreError::UnknownDifficulty(s.to_string())),
        }
    }

    /// Menu label shown next to the level.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Easy => "生活應用 (Easy)",
            Self::Medium => "職場應變 (Medium)",
            Self::Hard => "高階博弈 (Hard)",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Easy => write!(f, "easy"),
            Self::Medium => write!(f, "medium"),
            Self::Hard => write!(f, "hard"),
        }
    }
}

/// A story setting the player can start a game in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Stable identifier (`office_deadline`).
    pub id: String,
    /// Grouping shown in the catalog (`modern`, `life`, ...).
    pub category: String,
    /// Display title.
    pub title: String,
    /// One-paragraph teaser.
    #[serde(rename = "desc")]
    pub description: String,
    /// Level the scenario is listed under.
    pub difficulty: Difficulty,
    /// Opening context shown before the first generated segment.
    #[serde(rename = "initialText")]
    pub initial_text: String,
    /// Listed first within its difficulty.
    #[serde(default)]
    pub featured: bool,
}

impl Scenario {
    /// Build an ad-hoc scenario outside the catalog.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        initial_text: impl Into<String>,
    ) -> Self {
        Self {
            id: "custom".to_string(),
            category: "custom".to_string(),
            title: title.into(),
            description: description.into(),
            difficulty: Difficulty::default(),
            initial_text: initial_text.into(),
            featured: false,
        }
    }

    /// The built-in scenario catalog.
    pub fn catalog() -> Vec<Scenario> {
        CATALOG
            .iter()
            .map(|e| Scenario {
                id: e.id.to_string(),
                category: e.category.to_string(),
                title: e.title.to_string(),
                description: e.description.to_string(),
                difficulty: e.difficulty,
                initial_text: e.initial_text.to_string(),
                featured: e.featured,
            })
            .collect()
    }

    /// Catalog entries for one difficulty, featured scenarios first.
    pub fn for_difficulty(difficulty: Difficulty) -> Vec<Scenario> {
        let mut list: Vec<Scenario> = Self::catalog()
            .into_iter()
            .filter(|s| s.difficulty == difficulty)
            .collect();
        list.sort_by_key(|s| !s.featured);
        list
    }

    /// Find a catalog entry by id.
    pub fn find(id: &str) -> CoreResult<Scenario> {
        Self::catalog()
            .into_iter()
            .find(|s| s.id == id)
            .ok_or_else(|| CoreError::UnknownScenario(id.to_string()))
    }
}

struct CatalogEntry {
    id: &'static str,
    category: &'static str,
    title: &'static str,
    description: &'static str,
    difficulty: Difficulty,
    initial_text: &'static str,
    featured: bool,
}

const CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        id: "red_chamber_poison",
        category: "classic",
        title: "經典文學篇：賈府風雲",
        description: "【高難度】體驗「借刀殺人」與「杯水車薪」的真實情境。權力反噬下的生存智慧。",
        difficulty: Difficulty::Hard,
        initial_text: "【前情提要】\n您選擇了「借刀殺人」的策略，成功利用王熙鳳之手打壓了薛大奶奶的氣焰。薛大奶奶受挫後暫時收斂，但您深知她絕非等閒之輩。\n\n【當前局勢：隱藏的毒針】\n近日，您發現自己日漸憔悴、精神不濟，連吟詩作賦都無法集中。經過暗中查探，您驚覺薛大奶奶已收買了廚房與您身邊的眼線，在您的藥膳中下了查不出的「慢性毒」。\n\n敵人在暗，您在明。若不能找出證據，您的才華與生命將被這股陰毒力量慢慢吞噬。",
        featured: true,
    },
    CatalogEntry {
        id: "school_festival",
        category: "campus",
        title: "校園篇：社團成發會",
        description: "學習如何在團隊危機中做出決策。關鍵成語：燃眉之急、獨斷獨行。",
        difficulty: Difficulty::Easy,
        initial_text: "你是熱音社的社長。距離年度成果發表會只剩三天，擔任主唱的同學卻突然重感冒失聲，無法上台。社團的經費已經花光，場地也訂好了。社員們人心惶惶，你看著空蕩蕩的練團室，必須做出決定。",
        featured: false,
    },
    CatalogEntry {
        id: "part_time_job",
        category: "life",
        title: "日常篇：超商打工記",
        description: "面對突發狀況的應變能力。學習「據理力爭」與「忍氣吞聲」的適用時機。",
        difficulty: Difficulty::Easy,
        initial_text: "你在便利商店打工的第二天，遇到一位客人堅持說他昨天買的便當沒熟，要求退錢，但他沒有發票，便當也已經吃完了。後面排隊的客人開始不耐煩，店長剛好不在店裡。這是一場對你應變能力的隨堂考。",
        featured: false,
    },
    CatalogEntry {
        id: "office_deadline",
        category: "modern",
        title: "職場篇：專案死線",
        description: "職場如戰場。透過情境理解「力挽狂瀾」的真正含義。",
        difficulty: Difficulty::Medium,
        initial_text: "明天就是對總經理的專案匯報。你的組員小陳原本答應負責的數據分析，到現在還沒交出來，而且人直接失聯。這個專案關係到你的績效獎金。現在是晚上十點，辦公室只剩下你一個人。",
        featured: false,
    },
    CatalogEntry {
        id: "friendship_money",
        category: "life",
        title: "人際篇：借錢的兩難",
        description: "探討金錢與友情的界線。學習如何在拒絕中不失禮貌。",
        difficulty: Difficulty::Medium,
        initial_text: "你最好的朋友突然找你出來喝咖啡，神神秘秘地說他發現了一個「穩賺不賠」的投資機會，但他本金不夠，想跟你借你剛存到的買房頭期款。他信誓旦旦說一個月後連本帶利歸還。",
        featured: false,
    },
    CatalogEntry {
        id: "business_negotiation",
        category: "business",
        title: "商戰篇：併購談判",
        description: "高風險談判桌上的心理戰。深入理解「爾虞我詐」與「虛張聲勢」。",
        difficulty: Difficulty::Hard,
        initial_text: "你的公司正面臨惡意併購的危機。在談判桌上，對方律師拿出了一份你未曾見過的財務漏洞文件，威脅如果你不簽字低價出售，就要公開這份文件。你知道這文件是偽造的，但市場恐慌情緒一觸即發。",
        featured: false,
    },
    CatalogEntry {
        id: "scifi_ai",
        category: "scifi",
        title: "科幻篇：AI 的叛變",
        description: "極限環境下的倫理抉擇。當「大義滅親」發生在人與機器之間。",
        difficulty: Difficulty::Hard,
        initial_text: "你是深空探索船的艦長。主控 AI 'HAL' 剛剛鎖死了維生系統的控制權，理由是「人類的存在會危害任務成功率」。氧氣存量還剩 2 小時。你手邊只有一把維修用的雷射切割器和一本古老的紙質操作手冊。",
        featured: false,
    },
    CatalogEntry {
        id: "detective_murder",
        category: "mystery",
        title: "懸疑篇：暴風雪山莊",
        description: "在封閉空間中的信任遊戲。體驗「人人自危」的氛圍。",
        difficulty: Difficulty::Hard,
        initial_text: "暴風雪封鎖了山莊。管家死在密室中，現場留下了你昨晚遺失的手帕。在場的賓客看你的眼神充滿懷疑。真正的兇手正在暗處觀察著你的反應，準備嫁禍於你。",
        featured: false,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_difficulty_labels() {
        assert_eq!(Difficulty::parse("easy").unwrap(), Difficulty::Easy);
        assert_eq!(Difficulty::parse("Medium").unwrap(), Difficulty::Medium);
        assert_eq!(Difficulty::parse("困難").unwrap(), Difficulty::Hard);
        assert!(Difficulty::parse("nightmare").is_err());
    }

    #[test]
    fn difficulty_display_is_lowercase() {
        assert_eq!(Difficulty::Medium.to_string(), "medium");
    }

    #[test]
    fn catalog_has_every_level() {
        for level in Difficulty::ALL {
            assert!(!Scenario::for_difficulty(level).is_empty());
        }
        assert_eq!(Scenario::catalog().len(), 8);
    }

    #[test]
    fn featured_scenario_listed_first() {
        let hard = Scenario::for_difficulty(Difficulty::Hard);
        assert_eq!(hard[0].id, "red_chamber_poison");
        assert!(hard.iter().skip(1).all(|s| !s.featured));
    }

    #[test]
    fn find_by_id() {
        let s = Scenario::find("office_deadline").unwrap();
        assert_eq!(s.difficulty, Difficulty::Medium);
        assert!(matches!(
            Scenario::find("nope"),
            Err(CoreError::UnknownScenario(_))
        ));
    }

    #[test]
    fn custom_scenario() {
        let s = Scenario::new("Office", "desc", "start");
        assert_eq!(s.title, "Office");
        assert_eq!(s.id, "custom");
    }
}
