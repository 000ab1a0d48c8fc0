//! Idiom reference dataset for Idiom Quest.
//!
//! Parses the delimited idiom dataset (quoted fields may contain commas,
//! doubled quotes and newlines) and serves point lookups by idiom text
//! without touching the network.

pub mod csv;
pub mod error;
pub mod filter;
pub mod index;

pub use error::{IdiomError, IdiomResult};
pub use filter::{FilteredDataset, filter_dataset};
pub use index::{IdiomIndex, IdiomRecord};
