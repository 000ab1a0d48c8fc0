//! Conversation session management.
//!
//! A [`GameSession`] owns one game's conversation with the model. Every turn
//! resends the whole history, so the model turn appended after each response
//! is the raw text (narrative, separator and payload) exactly as received.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use uuid::Uuid;

use iq_core::{ConversationTurn, Difficulty, IdiomOption, Scenario, TurnResult};
use iq_gemini::{CacheSource, ChatRequest, GenerativeBackend, ProviderFailure, classify};

use crate::analysis::{GameAnalysis, analysis_prompt};
use crate::config::GameConfig;
use crate::error::{GameError, GameResult};
use crate::payload::{PayloadError, decode_payload};
use crate::prompts::{ACKNOWLEDGEMENT, GAME_SYSTEM_PROMPT, choice_message, opening_message};
use crate::splitter::consume_stream;
use crate::story::StoryLog;

/// Outcome of one completed turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamedTurn {
    /// Parsed payload, safe-empty when it could not be decoded.
    pub result: TurnResult,
    /// Narrative shown to the player.
    pub narrative: String,
    /// Full model response as stored in the history.
    pub raw: String,
    /// Why the payload was replaced by the safe-empty result, if it was.
    pub payload_error: Option<PayloadError>,
    /// Idioms in this round that were already offered earlier in the game.
    pub repeated_idioms: Vec<String>,
}

#[derive(Debug, Default)]
struct SessionState {
    history: Vec<ConversationTurn>,
    story: StoryLog,
    used_idioms: Vec<String>,
    scenario: Option<Scenario>,
    difficulty: Difficulty,
    round: u32,
    game_over: bool,
    cache_disabled: bool,
}

/// Held for the duration of a turn. Clears the busy flag on drop.
struct TurnGuard<'a>(&'a AtomicBool);

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One game's conversation with the model.
pub struct GameSession<B> {
    id: Uuid,
    backend: B,
    cache: Option<Box<dyn CacheSource>>,
    config: GameConfig,
    busy: AtomicBool,
    state: Mutex<SessionState>,
}

impl<B: GenerativeBackend> GameSession<B> {
    /// Create a session with no game started.
    pub fn new(backend: B, config: GameConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            backend,
            cache: None,
            config,
            busy: AtomicBool::new(false),
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Bind requests to a context cache.
    pub fn with_cache(mut self, cache: impl CacheSource + 'static) -> Self {
        self.cache = Some(Box::new(cache));
        self
    }

    /// Session identifier used in logs.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Configuration the session was created with.
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Whether a turn is currently running.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Whether a game has been started.
    pub fn is_started(&self) -> bool {
        self.state().scenario.is_some()
    }

    /// Whether the model has declared the game over.
    pub fn is_game_over(&self) -> bool {
        self.state().game_over
    }

    /// Last round number reported by the model.
    pub fn round(&self) -> u32 {
        self.state().round
    }

    /// Scenario of the current game, if one has started.
    pub fn scenario(&self) -> Option<Scenario> {
        self.state().scenario.clone()
    }

    /// Difficulty of the current game.
    pub fn difficulty(&self) -> Difficulty {
        self.state().difficulty
    }

    /// Snapshot of the conversation history.
    pub fn history(&self) -> Vec<ConversationTurn> {
        self.state().history.clone()
    }

    /// Snapshot of the story log.
    pub fn story(&self) -> StoryLog {
        self.state().story.clone()
    }

    /// Idioms offered so far, in order, without pinyin.
    pub fn used_idioms(&self) -> Vec<String> {
        self.state().used_idioms.clone()
    }

    /// Start a new game, discarding any previous one.
    pub async fn start_game<F>(
        &self,
        scenario: &Scenario,
        difficulty: Difficulty,
        on_update: F,
    ) -> GameResult<StreamedTurn>
    where
        F: FnMut(&str),
    {
        let _guard = self.acquire()?;
        tracing::info!(
            session = %self.id,
            scenario = %scenario.id,
            %difficulty,
            "starting game"
        );

        // A failed binding must leave the previous game untouched.
        let binding = self.resolve_binding().await?;
        {
            let mut state = self.state();
            *state = SessionState {
                history: vec![
                    ConversationTurn::user(GAME_SYSTEM_PROMPT),
                    ConversationTurn::model(ACKNOWLEDGEMENT),
                ],
                scenario: Some(scenario.clone()),
                difficulty,
                cache_disabled: state.cache_disabled,
                ..SessionState::default()
            };
            state.story.narrate(scenario.initial_text.clone());
        }

        self.run_turn(binding, opening_message(scenario, difficulty), on_update)
            .await
    }

    /// Submit the player's choice and play the next round.
    pub async fn submit_choice<F>(&self, option: &IdiomOption, on_update: F) -> GameResult<StreamedTurn>
    where
        F: FnMut(&str),
    {
        let _guard = self.acquire()?;
        if !self.is_started() {
            return Err(GameError::SessionNotStarted);
        }
        let binding = self.resolve_binding().await?;
        self.state().story.choose(option);
        tracing::info!(session = %self.id, option = %option.id, idiom = %option.idiom, "submitting choice");

        self.run_turn(binding, choice_message(option), on_update).await
    }

    /// Ask the model to evaluate the finished game. Never fails.
    pub async fn analyze(&self) -> GameAnalysis {
        let prompt = analysis_prompt(&self.story());
        let request = ChatRequest::prompt(self.config.model.clone(), prompt);

        let reply = match self.backend.generate(request).await {
            Ok(reply) => reply,
            Err(failure) => {
                let classified = classify(&failure);
                tracing::warn!(session = %self.id, kind = %classified.kind, "analysis failed");
                return GameAnalysis::fallback(&classified);
            }
        };
        tracing::debug!(session = %self.id, %reply, "analysis reply");

        GameAnalysis::parse(&reply).unwrap_or_else(|err| {
            tracing::warn!(session = %self.id, %err, "analysis reply was not valid JSON");
            let failure = ProviderFailure::new(format!("invalid analysis reply: {err}"));
            GameAnalysis::fallback(&classify(&failure))
        })
    }

    async fn run_turn<F>(
        &self,
        (model, cached_content): (String, Option<String>),
        message: String,
        on_update: F,
    ) -> GameResult<StreamedTurn>
    where
        F: FnMut(&str),
    {

        let history = {
            let mut state = self.state();
            state.history.push(ConversationTurn::user(message));
            state.history.clone()
        };

        let mut request = ChatRequest::new(model, history);
        if let Some(handle) = cached_content {
            request = request.with_cache(handle);
        }

        let response = match self.stream(request, on_update).await {
            Ok(response) => response,
            Err(failure) => {
                let classified = classify(&failure);
                tracing::warn!(
                    session = %self.id,
                    kind = %classified.kind,
                    error = %classified.message,
                    "turn failed"
                );
                self.state().story.error(classified.user_message.clone());
                return Err(GameError::Provider(classified));
            }
        };
        tracing::debug!(session = %self.id, raw = %response.raw, "model output");

        let (result, payload_error) = match decode_payload(&response.suffix) {
            Ok(result) => (result, None),
            Err(err) => {
                tracing::warn!(session = %self.id, %err, "falling back to empty turn result");
                (TurnResult::safe_empty(), Some(err))
            }
        };

        let mut state = self.state();
        state.history.push(ConversationTurn::model(response.raw.clone()));
        state.story.narrate(response.narrative.clone());

        let mut repeated_idioms = Vec::new();
        for option in &result.options {
            let idiom = option.bare_idiom().to_string();
            if state.used_idioms.contains(&idiom) {
                repeated_idioms.push(idiom);
            } else {
                state.used_idioms.push(idiom);
            }
        }
        if !repeated_idioms.is_empty() {
            tracing::warn!(session = %self.id, repeated = ?repeated_idioms, "model repeated idioms");
        }
        if !result.is_safe_empty() {
            state.round = result.round;
            state.game_over = result.is_game_over;
        }

        Ok(StreamedTurn {
            result,
            narrative: response.narrative,
            raw: response.raw,
            payload_error,
            repeated_idioms,
        })
    }

    async fn stream<F>(
        &self,
        request: ChatRequest,
        on_update: F,
    ) -> Result<crate::splitter::SplitResponse, ProviderFailure>
    where
        F: FnMut(&str),
    {
        let fragments = self.backend.stream_chat(request).await?;
        consume_stream(fragments, on_update).await
    }

    /// Model and cache handle for the next request.
    async fn resolve_binding(&self) -> GameResult<(String, Option<String>)> {
        let fallback = (self.config.model.clone(), None);
        let Some(cache) = self.cache.as_ref() else {
            return Ok(fallback);
        };
        if self.state().cache_disabled {
            return Ok(fallback);
        }

        match cache.ensure_cache().await {
            Ok(descriptor) => Ok((descriptor.model_id, Some(descriptor.cache_handle))),
            Err(err) if self.config.require_cache => Err(GameError::Cache(err)),
            Err(err) => {
                tracing::warn!(session = %self.id, %err, "continuing without context cache");
                self.state().cache_disabled = true;
                Ok(fallback)
            }
        }
    }

    fn acquire(&self) -> GameResult<TurnGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| TurnGuard(&self.busy))
            .map_err(|_| GameError::TurnInFlight)
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }
}
