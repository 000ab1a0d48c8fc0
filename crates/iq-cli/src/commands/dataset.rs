use std::fs;
use std::path::Path;

use iq_idioms::filter_dataset;

/// Write the rows of `source` whose idiom is listed in `keep`.
pub fn filter(source: &Path, keep: &Path, output: Option<&Path>) -> Result<(), String> {
    let read = |path: &Path| {
        fs::read_to_string(path).map_err(|e| format!("failed to read {}: {e}", path.display()))
    };
    let filtered = filter_dataset(&read(source)?, &read(keep)?).map_err(|e| e.to_string())?;
    let csv = filtered.to_csv();

    match output {
        Some(path) => {
            fs::write(path, csv).map_err(|e| format!("failed to write {}: {e}", path.display()))?;
            eprintln!(
                "  Kept {} of {} idioms ({} approved) in {}",
                filtered.rows.len(),
                filtered.total,
                filtered.approved,
                path.display()
            );
        }
        None => print!("{csv}"),
    }
    Ok(())
}
