//! Completion-service layer: the contract, an HTTP adapter, and retry.
//!
//! - [`completion`]: [`CompletionService`] trait and [`CompletionRequest`],
//!   the only surface the summarizer depends on.
//! - [`client`]: [`OpenAiClient`] for OpenAI-compatible
//!   `/chat/completions` endpoints.
//! - [`retry`]: [`RetryingCompletion`] wrapper with exponential backoff for
//!   transient errors (429, 5xx, transport failures).

pub mod client;
pub mod completion;
pub mod retry;

pub use client::{DEFAULT_BASE_URL, OpenAiClient};
pub use completion::{CompletionFuture, CompletionRequest, CompletionService};
pub use retry::{RetryConfig, RetryingCompletion};
