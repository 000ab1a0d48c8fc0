use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use rand::seq::IndexedRandom;

use iq_core::{Difficulty, IdiomOption, OptionId, SEPARATOR, Scenario};
use iq_game::{GameAnalysis, GameSession, StreamedTurn};
use iq_gemini::{
    CacheBootstrapper, GeminiClient, JsonFileStore, KeyValueStore, MemoryStore, classify,
};
use iq_idioms::IdiomIndex;

/// Flags of the `play` subcommand.
pub struct PlayOptions {
    /// Scenario id, `random`, or `None` to ask.
    pub scenario: Option<String>,
    /// Difficulty, or `None` to ask.
    pub difficulty: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub dataset: Option<PathBuf>,
    pub cache: bool,
    pub require_cache: bool,
    /// Where the cache descriptor is kept between runs.
    pub session_file: Option<PathBuf>,
    /// Markdown file the story is written to at the end.
    pub export: Option<PathBuf>,
}

/// Play one game interactively on stdin/stdout.
pub async fn run(settings: &JsonFileStore, opts: PlayOptions) -> Result<(), String> {
    let config = super::resolve_config(settings, opts.model, opts.api_key, opts.dataset)?
        .with_require_cache(opts.require_cache);
    let client = GeminiClient::from_key(config.api_key.clone())
        .map_err(|failure| classify(&failure).user_message)?;

    let mut session = GameSession::new(client, config.clone());
    if opts.cache {
        let store: Box<dyn KeyValueStore> = match &opts.session_file {
            Some(path) => Box::new(JsonFileStore::new(path)),
            None => Box::new(MemoryStore::new()),
        };
        session = session.with_cache(CacheBootstrapper::new(super::provisioner(&config), store));
    }

    let stdin = io::stdin();
    let mut input = Input(stdin.lock());

    let difficulty = match super::parse_difficulty(opts.difficulty.as_deref())? {
        Some(d) => d,
        None => pick_difficulty(&mut input)?,
    };
    let scenario = match opts.scenario.as_deref() {
        Some("random") => random_scenario(difficulty)?,
        Some(id) => Scenario::find(id).map_err(|e| e.to_string())?,
        None => pick_scenario(&mut input, difficulty)?,
    };
    let index = IdiomIndex::global(&config.dataset)
        .inspect_err(|e| tracing::info!(%e, "idiom explanations unavailable"))
        .ok();

    println!();
    println!("  {}", scenario.title.bold());
    println!("  {}", scenario.initial_text.dimmed());
    println!();

    let mut printer = NarrativePrinter::stdout();
    let mut turn = session
        .start_game(&scenario, difficulty, |text| printer.update(text))
        .await
        .map_err(|e| e.user_message())?;
    printer.finish();

    loop {
        if turn.result.is_game_over {
            println!("  {}", "— 故事結束 —".bold());
            break;
        }
        if turn.result.options.is_empty() {
            println!("  {}", "無法解析本回合的選項，遊戲提前結束。".yellow());
            break;
        }

        show_options(&turn, index, difficulty);
        let Some(option) = pick_option(&mut input, &turn)? else {
            println!("  已離開遊戲。");
            break;
        };

        let mut printer = NarrativePrinter::stdout();
        match session
            .submit_choice(&option, |text| printer.update(text))
            .await
        {
            Ok(next) => {
                printer.finish();
                turn = next;
            }
            Err(e) => {
                printer.finish();
                println!("  {}\n", e.user_message().yellow());
            }
        }
    }

    println!();
    println!("  {}", "分析中…".dimmed());
    show_analysis(&session.analyze().await);

    if let Some(path) = opts.export {
        let markdown = session.story().export_markdown(&scenario.title);
        std::fs::write(&path, markdown)
            .map_err(|e| format!("failed to write {}: {e}", path.display()))?;
        println!("  Story written to {}", path.display());
    }

    Ok(())
}

/// Prints the growing narrative as it streams in.
///
/// Every update carries the whole narrative so far. The last few bytes of an
/// update may be the start of the separator, so they stay unprinted until a
/// later update or [`NarrativePrinter::finish`] settles them.
struct NarrativePrinter<W: Write> {
    out: W,
    shown: String,
    latest: String,
}

impl NarrativePrinter<io::Stdout> {
    fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> NarrativePrinter<W> {
    fn new(out: W) -> Self {
        Self {
            out,
            shown: String::new(),
            latest: String::new(),
        }
    }

    fn update(&mut self, text: &str) {
        self.latest.clear();
        self.latest.push_str(text);
        self.emit(settled(text));
    }

    fn finish(&mut self) {
        let latest = std::mem::take(&mut self.latest);
        self.emit(&latest);
        if !self.shown.is_empty() {
            let _ = writeln!(self.out, "\n");
        }
    }

    fn emit(&mut self, text: &str) {
        if let Some(delta) = delta(&self.shown, text) {
            let _ = write!(self.out, "{delta}");
            let _ = self.out.flush();
            self.shown.push_str(delta);
        }
    }
}

/// `text` without the tail that could still turn into the separator.
fn settled(text: &str) -> &str {
    let mut cut = text.len().saturating_sub(SEPARATOR.len() - 1);
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    &text[..cut]
}

/// The part of `update` that extends `shown`, if it does.
fn delta<'a>(shown: &str, update: &'a str) -> Option<&'a str> {
    update
        .strip_prefix(shown)
        .filter(|rest| !rest.is_empty())
}

struct Input<R>(R);

impl<R: BufRead> Input<R> {
    /// Prompt and read one trimmed line. `None` on end of input.
    fn ask(&mut self, prompt: &str) -> Result<Option<String>, String> {
        print!("{prompt}");
        io::stdout().flush().map_err(|e| e.to_string())?;
        let mut line = String::new();
        match self.0.read_line(&mut line) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(line.trim().to_string())),
            Err(e) => Err(e.to_string()),
        }
    }
}

fn pick_difficulty<R: BufRead>(input: &mut Input<R>) -> Result<Difficulty, String> {
    loop {
        let Some(answer) = input.ask("  難度 [easy/medium/hard] (medium): ")? else {
            return Ok(Difficulty::default());
        };
        if answer.is_empty() {
            return Ok(Difficulty::default());
        }
        match Difficulty::parse(&answer) {
            Ok(d) => return Ok(d),
            Err(e) => println!("  {}", e.to_string().yellow()),
        }
    }
}

fn pick_scenario<R: BufRead>(input: &mut Input<R>, difficulty: Difficulty) -> Result<Scenario, String> {
    let scenarios = Scenario::for_difficulty(difficulty);
    println!();
    for (i, scenario) in scenarios.iter().enumerate() {
        println!("  {}. {}", i + 1, scenario.title.bold());
        println!("     {}", super::truncate(&scenario.description, 60).dimmed());
    }
    println!();

    loop {
        let Some(answer) = input.ask("  選擇場景編號 (Enter 隨機): ")? else {
            return random_scenario(difficulty);
        };
        if answer.is_empty() {
            return random_scenario(difficulty);
        }
        match answer.parse::<usize>() {
            Ok(n) if (1..=scenarios.len()).contains(&n) => return Ok(scenarios[n - 1].clone()),
            _ => println!("  {}", "請輸入列表中的編號。".yellow()),
        }
    }
}

fn random_scenario(difficulty: Difficulty) -> Result<Scenario, String> {
    Scenario::for_difficulty(difficulty)
        .choose(&mut rand::rng())
        .cloned()
        .ok_or_else(|| format!("no scenarios for difficulty {difficulty}"))
}

fn show_options(turn: &StreamedTurn, index: Option<&IdiomIndex>, difficulty: Difficulty) {
    println!("  {}", format!("第 {} 回合", turn.result.round).bold());
    for option in &turn.result.options {
        println!();
        println!("  {}. {}", option.id.to_string().cyan().bold(), option.idiom.bold());
        println!("     {}", option.literal_meaning.dimmed());
        println!("     策略：{}", option.strategy);
        if let Some(record) = index.and_then(|i| i.lookup_option(&option.idiom)) {
            let (label, text) = record.explanation_for(difficulty);
            if !text.is_empty() {
                println!("     {}：{}", label.italic(), super::truncate(text, 80));
            }
        }
    }
    println!();
}

fn pick_option<R: BufRead>(
    input: &mut Input<R>,
    turn: &StreamedTurn,
) -> Result<Option<IdiomOption>, String> {
    loop {
        let Some(answer) = input.ask("  你的選擇 [A/B/C] (q 離開): ")? else {
            return Ok(None);
        };
        if answer.eq_ignore_ascii_case("q") || answer.eq_ignore_ascii_case("quit") {
            return Ok(None);
        }
        let chosen = OptionId::parse(&answer)
            .ok()
            .and_then(|id| turn.result.option(id));
        match chosen {
            Some(option) => return Ok(Some(option.clone())),
            None => println!("  {}", "請輸入 A、B 或 C。".yellow()),
        }
    }
}

fn show_analysis(analysis: &GameAnalysis) {
    println!();
    println!("  {}", analysis.title.bold().green());
    println!();
    for line in analysis.evaluation.lines() {
        println!("  {line}");
    }
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["積極 Aggressive", "保守 Conservative", "消極 Negative"]);
    table.add_row(vec![
        analysis.stats.aggressive.to_string(),
        analysis.stats.conservative.to_string(),
        analysis.stats.negative.to_string(),
    ]);
    println!("{table}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_prints_only_new_text() {
        assert_eq!(delta("", "你站"), Some("你站"));
        assert_eq!(delta("你站", "你站在門口"), Some("在門口"));
        assert_eq!(delta("你站在門口 ", "你站在門口"), None);
        assert_eq!(delta("abc", "abc"), None);
    }

    fn printed(printer: NarrativePrinter<Vec<u8>>) -> String {
        String::from_utf8(printer.out).unwrap()
    }

    #[test]
    fn split_separator_is_never_printed() {
        let mut printer = NarrativePrinter::new(Vec::new());
        printer.update("故事 ");
        printer.update("故事 ---JS");
        printer.update("故事");
        printer.finish();

        assert_eq!(printer.shown, "故事");
        assert_eq!(printed(printer), "故事\n\n");
    }

    #[test]
    fn unseparated_narrative_is_flushed_on_finish() {
        let mut printer = NarrativePrinter::new(Vec::new());
        printer.update("你站在門口，");
        printer.update("你站在門口，看著窗外的雨。");
        assert!(printer.shown.len() < "你站在門口，看著窗外的雨。".len());
        printer.finish();

        assert_eq!(printed(printer), "你站在門口，看著窗外的雨。\n\n");
    }

    #[test]
    fn settled_keeps_char_boundaries() {
        assert_eq!(settled("短"), "");
        assert_eq!(settled("abcdefghijk"), "ab");
        assert_eq!(settled("一二三四五"), "一二");
    }

    #[test]
    fn input_reads_trimmed_lines() {
        let mut input = Input(io::Cursor::new("  b \n"));
        assert_eq!(input.ask("").unwrap().as_deref(), Some("b"));
        assert_eq!(input.ask("").unwrap(), None);
    }

    #[test]
    fn difficulty_prompt_defaults_to_medium() {
        let mut input = Input(io::Cursor::new("\n"));
        assert_eq!(pick_difficulty(&mut input).unwrap(), Difficulty::Medium);
        let mut input = Input(io::Cursor::new("nope\n困難\n"));
        assert_eq!(pick_difficulty(&mut input).unwrap(), Difficulty::Hard);
    }
}
