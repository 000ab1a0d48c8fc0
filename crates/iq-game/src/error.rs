//! Error types for the game engine.

use thiserror::Error;

use iq_gemini::{CacheError, ClassifiedError, ProviderFailure, classify};

/// Result type for game operations.
pub type GameResult<T> = Result<T, GameError>;

/// Errors surfaced by a [`GameSession`](crate::GameSession).
#[derive(Debug, Error)]
pub enum GameError {
    /// A choice was submitted before any game was started.
    #[error("no game in progress")]
    SessionNotStarted,

    /// Another turn on this session has not finished yet.
    #[error("a turn is already in progress")]
    TurnInFlight,

    /// The provider failed; carries the classified error for display.
    #[error("{0}")]
    Provider(ClassifiedError),

    /// The context cache could not be provisioned and was required.
    #[error("context cache unavailable: {0}")]
    Cache(#[from] CacheError),
}

impl GameError {
    /// Message to show the player inline.
    pub fn user_message(&self) -> String {
        match self {
            Self::Provider(classified) => classified.user_message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<ProviderFailure> for GameError {
    fn from(failure: ProviderFailure) -> Self {
        Self::Provider(classify(&failure))
    }
}

impl From<ClassifiedError> for GameError {
    fn from(classified: ClassifiedError) -> Self {
        Self::Provider(classified)
    }
}
