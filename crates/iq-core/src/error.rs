/// Alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while interpreting player-facing input against the data model.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The difficulty label is not one of easy, medium, or hard.
    #[error("unknown difficulty: \"{0}\" (expected easy, medium, or hard)")]
    UnknownDifficulty(String),

    /// No scenario in the catalog has this id.
    #[error("unknown scenario: \"{0}\"")]
    UnknownScenario(String),

    /// An option id outside A, B, C.
    #[error("invalid option id: \"{0}\" (expected A, B, or C)")]
    InvalidOptionId(String),
}
