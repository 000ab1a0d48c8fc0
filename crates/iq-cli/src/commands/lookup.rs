use std::path::Path;

use colored::Colorize;

use iq_game::GameConfig;
use iq_idioms::IdiomIndex;

/// Print the dataset entry for one idiom.
pub fn run(idiom: &str, dataset: Option<&Path>, difficulty: Option<&str>) -> Result<(), String> {
    let difficulty = super::parse_difficulty(difficulty)?;
    let path = dataset
        .map(Path::to_path_buf)
        .unwrap_or_else(|| GameConfig::from_env().dataset);
    let index = IdiomIndex::global(&path).map_err(|e| e.to_string())?;

    let record = index
        .lookup_option(idiom)
        .ok_or_else(|| format!("idiom '{idiom}' not found in {}", path.display()))?;

    println!("  {} {}", record.idiom.bold(), format!("#{}", record.id).dimmed());
    println!();
    print_section("釋義 / Definition", &record.definition);

    match difficulty {
        Some(d) => {
            let (label, text) = record.explanation_for(d);
            print_section(label, text);
        }
        None => {
            print_section("簡單解釋 / Simple Explanation", &record.simplified_explanation);
            print_section("用法說明 / Usage", &record.usage_note);
        }
    }

    Ok(())
}

fn print_section(label: &str, text: &str) {
    if text.is_empty() {
        return;
    }
    println!("  {}", label.underline());
    for line in text.lines() {
        println!("  {line}");
    }
    println!();
}
