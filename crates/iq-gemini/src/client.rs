//! Gemini REST client.
//!
//! Talks to `generativelanguage.googleapis.com` directly: streaming
//! generation over server-sent events, plain generation, and the payload
//! shapes both share.

use std::collections::VecDeque;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use iq_core::{ConversationTurn, Role};

use crate::backend::{ChatRequest, FragmentStream, GenerativeBackend};
use crate::classify::ProviderFailure;
use crate::sse::SseDecoder;

/// REST root for model and cache endpoints.
pub const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// [`GenerativeBackend`] backed by the Gemini HTTP API.
#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_key: api_key.into(),
            base_url: BASE_URL.to_string(),
        }
    }

    /// Create a client from an optional key, failing the way the provider
    /// would when no key is configured.
    pub fn from_key(api_key: Option<String>) -> Result<Self, ProviderFailure> {
        match api_key {
            Some(key) if !key.trim().is_empty() => Ok(Self::new(key.trim())),
            _ => Err(ProviderFailure::missing_credential()),
        }
    }

    /// Point the client at a different API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/models/{model}:{method}", self.base_url)
    }

    async fn post(
        &self,
        url: String,
        body: &GenerateContentRequest,
    ) -> Result<reqwest::Response, ProviderFailure> {
        let response = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|err| ProviderFailure::transport(&err))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "failed to read Gemini error body".to_string());
        tracing::debug!(status, body = %text, "gemini returned an error");
        Err(ProviderFailure::from_response(status, &text))
    }
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    async fn stream_chat(&self, request: ChatRequest) -> Result<FragmentStream, ProviderFailure> {
        tracing::debug!(
            model = %request.model,
            turns = request.history.len(),
            cached = request.cached_content.is_some(),
            "opening gemini stream"
        );
        let mut url = self.endpoint(&request.model, "streamGenerateContent");
        url.push_str("?alt=sse");
        let body = GenerateContentRequest::from(&request);
        let response = self.post(url, &body).await?;
        Ok(fragments(response.bytes_stream()))
    }

    async fn generate(&self, request: ChatRequest) -> Result<String, ProviderFailure> {
        let url = self.endpoint(&request.model, "generateContent");
        let body = GenerateContentRequest::from(&request);
        let response = self.post(url, &body).await?;
        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|err| ProviderFailure::new(format!("failed to parse Gemini response: {err}")))?;
        match parsed.text() {
            Ok(text) if !text.is_empty() => Ok(text),
            Ok(_) => Err(ProviderFailure::new(
                "Gemini API returned no text in the response candidates",
            )),
            Err(failure) => Err(failure),
        }
    }
}

struct StreamState<S> {
    bytes: S,
    decoder: SseDecoder,
    pending: VecDeque<Result<String, ProviderFailure>>,
    done: bool,
}

/// Turn an SSE byte stream into text fragments.
fn fragments<S, B, E>(bytes: S) -> FragmentStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<ProviderFailure> + Send + 'static,
{
    let state = StreamState {
        bytes: Box::pin(bytes),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        done: false,
    };

    futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.pending.pop_front() {
                return Some((item, st));
            }
            if st.done {
                return None;
            }
            match st.bytes.next().await {
                Some(Ok(chunk)) => {
                    let events = st.decoder.push(chunk.as_ref());
                    st.pending
                        .extend(events.iter().map(String::as_str).filter_map(decode_event));
                }
                Some(Err(err)) => {
                    st.done = true;
                    st.pending.push_back(Err(err.into()));
                }
                None => {
                    st.done = true;
                    let events = st.decoder.finish();
                    st.pending
                        .extend(events.iter().map(String::as_str).filter_map(decode_event));
                }
            }
        }
    })
    .boxed()
}

/// Decode one SSE payload into a text fragment. Events without text yield
/// nothing.
fn decode_event(payload: &str) -> Option<Result<String, ProviderFailure>> {
    let parsed: GenerateContentResponse = match serde_json::from_str(payload) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::warn!(%err, "skipping undecodable stream event");
            return None;
        }
    };
    match parsed.text() {
        Ok(text) if text.is_empty() => None,
        other => Some(other),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentRequest {
    pub(crate) contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) cached_content: Option<String>,
}

impl From<&ChatRequest> for GenerateContentRequest {
    fn from(request: &ChatRequest) -> Self {
        Self {
            contents: request.history.iter().map(Content::from).collect(),
            cached_content: request.cached_content.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) role: Option<String>,
    pub(crate) parts: Vec<Part>,
}

impl From<&ConversationTurn> for Content {
    fn from(turn: &ConversationTurn) -> Self {
        let role = match turn.role {
            Role::User => "user",
            Role::Model => "model",
        };
        Self {
            role: Some(role.to_string()),
            parts: vec![Part::Text {
                text: turn.content.clone(),
            }],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum Part {
    Text {
        text: String,
    },
    FileData {
        #[serde(rename = "fileData")]
        file_data: FileData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileData {
    pub(crate) mime_type: String,
    pub(crate) file_uri: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate. A blocked prompt is a
    /// failure rather than empty text.
    fn text(&self) -> Result<String, ProviderFailure> {
        let blocked = self
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref());
        if let (true, Some(reason)) = (self.candidates.is_empty(), blocked) {
            return Err(ProviderFailure::new(format!("prompt blocked: {reason}")));
        }
        Ok(self
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default())
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str) -> String {
        serde_json::json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
        })
        .to_string()
    }

    #[test]
    fn request_body_shape() {
        let request = ChatRequest::new(
            "gemini-2.5-pro",
            vec![ConversationTurn::user("hi"), ConversationTurn::model("yo")],
        )
        .with_cache("cachedContents/abc");
        let body = serde_json::to_value(GenerateContentRequest::from(&request)).unwrap();
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][1]["parts"][0]["text"], "yo");
        assert_eq!(body["cachedContent"], "cachedContents/abc");
    }

    #[test]
    fn request_without_cache_omits_field() {
        let body =
            serde_json::to_value(GenerateContentRequest::from(&ChatRequest::prompt("m", "x")))
                .unwrap();
        assert!(body.get("cachedContent").is_none());
    }

    #[test]
    fn decode_event_extracts_text() {
        assert_eq!(decode_event(&chunk("你好")).unwrap().unwrap(), "你好");
    }

    #[test]
    fn decode_event_skips_empty_and_garbage() {
        assert!(decode_event(&chunk("")).is_none());
        assert!(decode_event("not json").is_none());
        assert!(decode_event(r#"{"usageMetadata":{"totalTokenCount":3}}"#).is_none());
    }

    #[test]
    fn blocked_prompt_is_failure() {
        let payload = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        let failure = decode_event(payload).unwrap().unwrap_err();
        assert!(failure.message.contains("SAFETY"));
    }

    #[tokio::test]
    async fn fragments_reassemble_split_events() {
        let body = format!("data: {}\r\n\r\ndata: {}\r\n\r\n", chunk("故事"), chunk("---JSON---"));
        let bytes = body.into_bytes();
        let (a, b) = bytes.split_at(17);
        let parts: Vec<Result<Vec<u8>, ProviderFailure>> = vec![Ok(a.to_vec()), Ok(b.to_vec())];

        let collected: Vec<String> = fragments(futures::stream::iter(parts))
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(collected, vec!["故事", "---JSON---"]);
    }

    #[tokio::test]
    async fn fragments_stop_after_transport_error() {
        let parts: Vec<Result<Vec<u8>, ProviderFailure>> = vec![
            Ok(format!("data: {}\n\n", chunk("a")).into_bytes()),
            Err(ProviderFailure::new("connection reset")),
            Ok(format!("data: {}\n\n", chunk("b")).into_bytes()),
        ];
        let collected: Vec<Result<String, ProviderFailure>> =
            fragments(futures::stream::iter(parts)).collect().await;
        assert_eq!(collected.len(), 2);
        assert_eq!(collected[0].as_deref().unwrap(), "a");
        assert!(collected[1].is_err());
    }

    #[test]
    fn missing_key_is_credential_failure() {
        assert!(GeminiClient::from_key(None).is_err());
        assert!(GeminiClient::from_key(Some("  ".to_string())).is_err());
        assert!(GeminiClient::from_key(Some("k".to_string())).is_ok());
    }
}
