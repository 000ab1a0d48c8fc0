//! Keyed idiom index built from the reference dataset.

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use serde::Serialize;

use iq_core::Difficulty;
use iq_core::result::strip_annotation;

use crate::csv::parse_csv;
use crate::error::{IdiomError, IdiomResult};

/// Minimum number of fields a data row needs to become a record.
const MIN_FIELDS: usize = 5;

static GLOBAL: OnceLock<IdiomIndex> = OnceLock::new();

/// One row of the reference dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdiomRecord {
    /// Dataset identifier.
    pub id: String,
    /// The idiom itself.
    pub idiom: String,
    /// Full definition, often citing the classical source.
    pub definition: String,
    /// Usage note, including whether the idiom is commendatory or derogatory.
    pub usage_note: String,
    /// Explanation simple enough for a young child.
    pub simplified_explanation: String,
}

impl IdiomRecord {
    /// The explanation suited to a difficulty: the simplified one on easy
    /// (when present), the usage note otherwise.
    pub fn explanation_for(&self, difficulty: Difficulty) -> (&'static str, &str) {
        if difficulty == Difficulty::Easy && !self.simplified_explanation.is_empty() {
            ("簡單解釋 / Simple Explanation", &self.simplified_explanation)
        } else {
            ("用法說明 / Usage", &self.usage_note)
        }
    }
}

/// In-memory map from idiom text to its record.
#[derive(Debug, Clone, Default)]
pub struct IdiomIndex {
    records: HashMap<String, IdiomRecord>,
}

impl IdiomIndex {
    /// Build an index from dataset text. The header row is skipped; short
    /// rows and rows without an idiom are dropped.
    pub fn from_csv(text: &str) -> Self {
        let rows = parse_csv(text);
        tracing::debug!(rows = rows.len(), "parsed idiom dataset");

        let mut records = HashMap::new();
        for row in rows.into_iter().skip(1) {
            if row.len() < MIN_FIELDS {
                continue;
            }
            let mut fields = row.into_iter();
            let mut next = || fields.next().unwrap_or_default();
            let id = next();
            let idiom = next().trim().to_string();
            if idiom.is_empty() {
                continue;
            }
            let record = IdiomRecord {
                id,
                idiom: idiom.clone(),
                definition: next(),
                usage_note: next(),
                simplified_explanation: next(),
            };
            records.insert(idiom, record);
        }

        tracing::debug!(idioms = records.len(), "built idiom index");
        Self { records }
    }

    /// Read and index a dataset file.
    pub fn load(path: &Path) -> IdiomResult<Self> {
        if !path.exists() {
            return Err(IdiomError::DatasetNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).map_err(|source| IdiomError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_csv(&text))
    }

    /// The process-wide index, built from `path` on first use.
    ///
    /// Later calls return the memoized index regardless of `path`.
    pub fn global(path: &Path) -> IdiomResult<&'static IdiomIndex> {
        if let Some(index) = GLOBAL.get() {
            return Ok(index);
        }
        let index = Self::load(path)?;
        Ok(GLOBAL.get_or_init(|| index))
    }

    /// Exact lookup by idiom text.
    pub fn lookup(&self, idiom: &str) -> Option<&IdiomRecord> {
        let found = self.records.get(idiom.trim());
        if found.is_none() {
            tracing::debug!(idiom, "idiom not in dataset");
        }
        found
    }

    /// Lookup for idiom text as the model writes it, which may carry a
    /// pinyin annotation.
    pub fn lookup_option(&self, text: &str) -> Option<&IdiomRecord> {
        self.records
            .get(text.trim())
            .or_else(|| self.lookup(strip_annotation(text)))
    }

    /// Number of indexed idioms.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Up to `n` idioms, sorted, for diagnostics.
    pub fn sample(&self, n: usize) -> Vec<&str> {
        let mut keys: Vec<&str> = self.records.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys.truncate(n);
        keys
    }
}
