//! Core types for Idiom Quest: conversation turns, idiom options, turn results,
//! and scenarios.
//!
//! This crate holds the data model shared by the provider boundary
//! (`iq-gemini`) and the game engine (`iq-game`). It performs no I/O.

/// Error types used throughout the crate.
pub mod error;
/// Idiom options offered to the player and the structured turn result.
pub mod result;
/// Scenario catalog and difficulty levels.
pub mod scenario;
/// Conversation turns exchanged with the model.
pub mod turn;

/// Re-export error types.
pub use error::{CoreError, CoreResult};
/// Re-export turn result types.
pub use result::{IdiomOption, OptionId, TurnResult};
/// Re-export scenario types.
pub use scenario::{Difficulty, Scenario};
/// Re-export conversation types.
pub use turn::{ConversationTurn, Role};

/// Literal marker dividing a model response into narrative prose and the
/// trailing JSON payload.
pub const SEPARATOR: &str = "---JSON---";
