//! Idiom Quest game engine.
//!
//! Drives a streamed, stateful conversation with a generative model:
//! splitting each response into narrative and payload, keeping the history
//! the model needs on every turn, and degrading gracefully when the model or
//! network misbehaves.

pub mod analysis;
pub mod config;
pub mod error;
pub mod payload;
pub mod prompts;
pub mod session;
pub mod splitter;
pub mod story;

pub use analysis::{GameAnalysis, StrategyStats};
pub use config::GameConfig;
pub use error::{GameError, GameResult};
pub use payload::{PayloadError, decode_payload, parse_payload};
pub use session::{GameSession, StreamedTurn};
pub use splitter::{ResponseSplitter, SplitResponse, consume_stream};
pub use story::{StoryEntry, StoryLog};
