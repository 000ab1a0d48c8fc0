//! The seam between the game engine and whatever produces model text.

use async_trait::async_trait;
use futures::stream::BoxStream;

use iq_core::ConversationTurn;

use crate::classify::ProviderFailure;

/// Incremental text fragments of one streamed response.
pub type FragmentStream = BoxStream<'static, Result<String, ProviderFailure>>;

/// One request against the model: the whole history, optionally bound to a
/// server-side context cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    /// Model identifier (`gemini-2.5-pro`).
    pub model: String,
    /// Full conversation, oldest first. The last turn is the new message.
    pub history: Vec<ConversationTurn>,
    /// Cache handle (`cachedContents/...`) to bind the request to.
    pub cached_content: Option<String>,
}

impl ChatRequest {
    /// A request over `history` without a cache.
    pub fn new(model: impl Into<String>, history: Vec<ConversationTurn>) -> Self {
        Self {
            model: model.into(),
            history,
            cached_content: None,
        }
    }

    /// A single-prompt request.
    pub fn prompt(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(model, vec![ConversationTurn::user(text)])
    }

    /// Bind the request to a cache handle.
    pub fn with_cache(mut self, handle: impl Into<String>) -> Self {
        self.cached_content = Some(handle.into());
        self
    }
}

/// A source of model output.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Open a streaming generation over the request's history.
    async fn stream_chat(&self, request: ChatRequest) -> Result<FragmentStream, ProviderFailure>;

    /// Generate a complete response in one call.
    async fn generate(&self, request: ChatRequest) -> Result<String, ProviderFailure>;
}
