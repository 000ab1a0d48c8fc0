//! Splitting a streamed model response into narrative and payload.
//!
//! The model writes prose first, then [`SEPARATOR`] on its own line, then a
//! JSON payload. While the prose streams in, every fragment produces a
//! narrative update carrying the whole text so far (full replacement, never
//! a delta). Once the separator appears, one last update carries the trimmed
//! narrative and everything after goes to the suffix silently.

use futures::{Stream, StreamExt};

use iq_core::SEPARATOR;
use iq_gemini::ProviderFailure;

/// A fully consumed response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitResponse {
    /// Everything the model sent, unmodified.
    pub raw: String,
    /// Trimmed prose before the separator, or the whole buffer if the
    /// separator never appeared.
    pub narrative: String,
    /// Text after the first separator. Empty without a separator.
    pub suffix: String,
    /// Whether a separator was found.
    pub separated: bool,
}

/// Incremental splitter over a growing buffer.
#[derive(Debug, Default)]
pub struct ResponseSplitter {
    buffer: String,
    split_at: Option<usize>,
}

impl ResponseSplitter {
    /// Splitter with an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one fragment. Returns the narrative update to surface, if any.
    pub fn push(&mut self, fragment: &str) -> Option<String> {
        let previous = self.buffer.len();
        self.buffer.push_str(fragment);
        if self.split_at.is_some() {
            return None;
        }

        // The separator may straddle the previous fragment boundary.
        let mut start = previous.saturating_sub(SEPARATOR.len() - 1);
        while !self.buffer.is_char_boundary(start) {
            start -= 1;
        }

        match self.buffer[start..].find(SEPARATOR) {
            Some(offset) => {
                let at = start + offset;
                self.split_at = Some(at);
                Some(self.buffer[..at].trim().to_string())
            }
            None => Some(self.buffer.clone()),
        }
    }

    /// Whether the separator has been seen.
    pub fn is_separated(&self) -> bool {
        self.split_at.is_some()
    }

    /// Text received so far.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// End of stream. Runs one last search over the whole buffer if the
    /// separator was not found incrementally; the returned update is the
    /// trimmed narrative when that search succeeds.
    pub fn finish(self) -> (SplitResponse, Option<String>) {
        let (split_at, late) = match self.split_at {
            Some(at) => (Some(at), false),
            None => (self.buffer.find(SEPARATOR), true),
        };

        match split_at {
            Some(at) => {
                let narrative = self.buffer[..at].trim().to_string();
                let suffix = self.buffer[at + SEPARATOR.len()..].to_string();
                let update = late.then(|| narrative.clone());
                let response = SplitResponse {
                    raw: self.buffer,
                    narrative,
                    suffix,
                    separated: true,
                };
                (response, update)
            }
            None => (
                SplitResponse {
                    narrative: self.buffer.clone(),
                    raw: self.buffer,
                    suffix: String::new(),
                    separated: false,
                },
                None,
            ),
        }
    }
}

/// Drain `fragments`, reporting narrative updates through `on_update`.
///
/// A transport error mid-stream aborts consumption and is returned as is.
pub async fn consume_stream<S, F>(
    mut fragments: S,
    mut on_update: F,
) -> Result<SplitResponse, ProviderFailure>
where
    S: Stream<Item = Result<String, ProviderFailure>> + Unpin,
    F: FnMut(&str),
{
    let mut splitter = ResponseSplitter::new();
    while let Some(fragment) = fragments.next().await {
        if let Some(update) = splitter.push(&fragment?) {
            on_update(&update);
        }
    }

    let (response, update) = splitter.finish();
    if let Some(update) = update {
        on_update(&update);
    }
    if !response.separated {
        tracing::warn!(len = response.raw.len(), "response ended without a separator");
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use proptest::prelude::*;

    use super::*;

    const RESPONSE: &str = "你站在會議室門口，心跳加速。\n\n---JSON---\n{\"round\":1,\"is_game_over\":false,\"options\":[]}";

    fn run(chunks: Vec<String>) -> (SplitResponse, Vec<String>) {
        let stream = futures::stream::iter(chunks.into_iter().map(Ok));
        let mut updates = Vec::new();
        let response = block_on(consume_stream(stream, |u| updates.push(u.to_string()))).unwrap();
        (response, updates)
    }

    fn chunked(text: &str, cuts: &[usize]) -> Vec<String> {
        let mut bounds: Vec<usize> = cuts
            .iter()
            .map(|c| c % (text.len() + 1))
            .filter(|&c| text.is_char_boundary(c))
            .collect();
        bounds.push(0);
        bounds.push(text.len());
        bounds.sort_unstable();
        bounds.dedup();
        bounds.windows(2).map(|w| text[w[0]..w[1]].to_string()).collect()
    }

    #[test]
    fn updates_are_full_replacements() {
        let (response, updates) = run(vec!["你站".into(), "在門口".into()]);
        assert_eq!(updates, vec!["你站", "你站在門口"]);
        assert!(!response.separated);
        assert_eq!(response.narrative, "你站在門口");
        assert_eq!(response.suffix, "");
    }

    #[test]
    fn separator_split_across_fragments() {
        let (response, updates) = run(vec![
            "故事 ".into(),
            "---JS".into(),
            "ON---{\"round\":2".into(),
            "}".into(),
        ]);
        assert_eq!(updates, vec!["故事 ", "故事 ---JS", "故事"]);
        assert_eq!(response.narrative, "故事");
        assert_eq!(response.suffix, "{\"round\":2}");
        assert_eq!(response.raw, "故事 ---JSON---{\"round\":2}");
    }

    #[test]
    fn no_updates_after_separator() {
        let (_, updates) = run(vec!["a---JSON---".into(), "{".into(), "}".into()]);
        assert_eq!(updates, vec!["a"]);
    }

    #[test]
    fn split_uses_first_separator() {
        let (response, _) = run(vec!["x---JSON---y---JSON---z".into()]);
        assert_eq!(response.narrative, "x");
        assert_eq!(response.suffix, "y---JSON---z");
    }

    #[test]
    fn empty_stream() {
        let (response, updates) = run(vec![]);
        assert!(updates.is_empty());
        assert_eq!(response, SplitResponse::default());
    }

    #[test]
    fn finish_searches_whole_buffer() {
        let splitter = ResponseSplitter {
            buffer: "前文---JSON---{}".to_string(),
            split_at: None,
        };
        let (response, update) = splitter.finish();
        assert_eq!(update.as_deref(), Some("前文"));
        assert_eq!(response.suffix, "{}");
    }

    #[test]
    fn transport_error_aborts() {
        let stream = futures::stream::iter(vec![
            Ok("a".to_string()),
            Err(ProviderFailure::new("reset")),
            Ok("b".to_string()),
        ]);
        let mut updates = Vec::new();
        let err = block_on(consume_stream(stream, |u| updates.push(u.to_string()))).unwrap_err();
        assert_eq!(err.message, "reset");
        assert_eq!(updates, vec!["a"]);
    }

    proptest! {
        #[test]
        fn chunking_does_not_change_the_split(cuts in prop::collection::vec(0usize..200, 0..12)) {
            let (whole, whole_updates) = run(vec![RESPONSE.to_string()]);
            let (split, updates) = run(chunked(RESPONSE, &cuts));

            prop_assert_eq!(&split, &whole);
            prop_assert_eq!(updates.last(), whole_updates.last());
            prop_assert_eq!(updates.last().map(String::as_str), Some("你站在會議室門口，心跳加速。"));
        }
    }
}
