//! Narrowing a large idiom dataset down to an approved list.

use std::collections::HashSet;

use crate::csv::{parse_csv, write_csv};
use crate::error::{IdiomError, IdiomResult};

/// Column of the full dataset holding the idiom.
const SOURCE_IDIOM_COLUMN: usize = 1;

/// Header names accepted for the idiom column of an approved list.
const KEEP_COLUMN_NAMES: [&str; 2] = ["idiom", "成語"];

/// Result of [`filter_dataset`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredDataset {
    /// Source header, unchanged.
    pub header: Vec<String>,
    /// Source rows whose idiom is on the approved list.
    pub rows: Vec<Vec<String>>,
    /// Number of data rows in the source.
    pub total: usize,
    /// Number of distinct approved idioms.
    pub approved: usize,
}

impl FilteredDataset {
    /// Render header and rows as CSV.
    pub fn to_csv(&self) -> String {
        write_csv(std::iter::once(&self.header).chain(&self.rows))
    }
}

/// Keep the rows of `source` whose idiom appears in `approved`.
///
/// `approved` is a CSV with a header naming an `idiom` (or `成語`) column.
pub fn filter_dataset(source: &str, approved: &str) -> IdiomResult<FilteredDataset> {
    let approved_rows = parse_csv(approved);
    let Some((keep_header, keep_rows)) = approved_rows.split_first() else {
        return Err(IdiomError::MissingColumn("idiom".to_string()));
    };
    let column = keep_header
        .iter()
        .position(|h| KEEP_COLUMN_NAMES.contains(&h.as_str()))
        .ok_or_else(|| IdiomError::MissingColumn("idiom".to_string()))?;

    let keep: HashSet<&str> = keep_rows
        .iter()
        .filter_map(|row| row.get(column))
        .map(|idiom| idiom.as_str())
        .filter(|idiom| !idiom.is_empty())
        .collect();

    let mut source_rows = parse_csv(source).into_iter();
    let header = source_rows.next().unwrap_or_default();
    let mut total = 0;
    let rows: Vec<Vec<String>> = source_rows
        .inspect(|_| total += 1)
        .filter(|row| {
            row.get(SOURCE_IDIOM_COLUMN)
                .is_some_and(|idiom| keep.contains(idiom.as_str()))
        })
        .collect();

    tracing::info!(total, kept = rows.len(), approved = keep.len(), "filtered idiom dataset");
    Ok(FilteredDataset {
        header,
        rows,
        total,
        approved: keep.len(),
    })
}
