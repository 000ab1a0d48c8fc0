//! Gemini provider boundary for Idiom Quest.
//!
//! Everything that talks to (or stands in for) the remote model lives here:
//! the [`GenerativeBackend`] seam and its REST/SSE implementation, the error
//! classifier that turns raw provider failures into a closed taxonomy, the
//! key-value stores that play the role of browser storage, and the context
//! cache bootstrapper.

pub mod backend;
pub mod cache;
pub mod classify;
pub mod client;
pub mod error;
pub mod provision;
pub mod sse;
pub mod store;

pub use backend::{ChatRequest, FragmentStream, GenerativeBackend};
pub use cache::{CacheBootstrapper, CacheDescriptor, CacheProvisioner, CacheSource};
pub use classify::{ClassifiedError, ErrorKind, ProviderFailure, classify};
pub use client::GeminiClient;
pub use error::{CacheError, CacheResult, StoreError, StoreResult};
pub use provision::{DirectProvisioner, EndpointProvisioner};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};

/// Model used when neither the player nor the cache picked one.
pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";
