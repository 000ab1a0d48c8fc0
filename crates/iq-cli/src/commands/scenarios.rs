use comfy_table::{ContentArrangement, Table};

use iq_core::Scenario;

/// List the scenario catalog as a table.
pub fn run(difficulty: Option<&str>) -> Result<(), String> {
    let scenarios = match super::parse_difficulty(difficulty)? {
        Some(d) => Scenario::for_difficulty(d),
        None => Scenario::catalog(),
    };

    if scenarios.is_empty() {
        println!("  No scenarios found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["ID", "Difficulty", "Title", "Description"]);

    for scenario in &scenarios {
        let title = if scenario.featured {
            format!("★ {}", scenario.title)
        } else {
            scenario.title.clone()
        };
        table.add_row(vec![
            scenario.id.clone(),
            scenario.difficulty.label().to_string(),
            title,
            super::truncate(&scenario.description, 40),
        ]);
    }

    println!("{table}");
    println!();
    println!("  {} scenarios", scenarios.len());

    Ok(())
}
