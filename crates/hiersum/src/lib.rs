//! Hierarchical map-reduce summarization for documents of any length.
//!
//! A document that fits in one model context is sent to the model once. A
//! larger one is split into token-bounded chunks, and the chunks are
//! summarized in parallel. The summaries are concatenated and the process
//! repeats until the text fits in a single chunk. One final call then turns
//! the converged text into a consolidated markdown summary.
//!
//! The summarizer depends only on two traits: a [`Tokenizer`] for counting
//! and splitting, and a [`CompletionService`] for generation. Both are
//! injected, so tests run against in-memory fakes and hosts can plug in
//! their own endpoints.
//!
//! # Getting started
//!
//! ```ignore
//! use hiersum::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SummarizerOptions::new("gpt-4o").with_max_workers(8).build()?;
//!     let client = RetryingCompletion::new(
//!         OpenAiClient::from_env("gpt-4o")?,
//!         RetryConfig::default(),
//!     );
//!     let summarizer = DocumentSummarizer::new(
//!         config,
//!         Arc::new(ReferenceTokenizer::new()?),
//!         Arc::new(client),
//!     );
//!
//!     let text = std::fs::read_to_string("report.md")?;
//!     println!("{}", summarizer.summarize(&text).await?);
//!     Ok(())
//! }
//! ```
//!
//! # Where to find things
//!
//! - **Run a summary:** [`DocumentSummarizer::summarize`], or
//!   [`summarize_with_report`](DocumentSummarizer::summarize_with_report) for
//!   round and call counts.
//! - **Tune budgets and concurrency:** [`SummarizerOptions`].
//! - **Talk to a model:** [`OpenAiClient`] for OpenAI-compatible endpoints,
//!   wrapped in [`RetryingCompletion`] for backoff on rate limits.
//! - **Work with files:** [`workspace`] loads, summarizes and saves
//!   workspace files; [`tools`] exposes that to a function-calling agent.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`tokenizer`] | [`Tokenizer`] trait and the o200k-based [`ReferenceTokenizer`] |
//! | [`chunker`] | Token-bounded, UTF-8-safe chunking |
//! | [`prompt`] | Chunk and consolidation prompts |
//! | [`summarizer`] | Parallel map step, recursive reducer, final consolidation |
//! | [`config`] | [`SummarizerOptions`] and the validated [`SummarizationConfig`] |
//! | [`api`] | [`CompletionService`] contract, HTTP client, retry |
//! | [`workspace`] | File store, text loading, summary output |
//! | [`tools`] | `summarize_file` and `read_file` agent tools |
//! | [`error`] | Error types |

pub mod api;
pub mod chunker;
pub mod config;
pub mod error;
pub mod prelude;
pub mod prompt;
pub mod summarizer;
pub mod tokenizer;
pub mod tools;
pub mod workspace;

#[cfg(test)]
mod testing;

pub use api::{CompletionService, OpenAiClient, RetryingCompletion};
pub use config::{SummarizationConfig, SummarizerOptions};
pub use error::{CompletionError, Stage, SummarizeError, WorkspaceError};
pub use summarizer::{DocumentSummarizer, SummaryReport};
pub use tokenizer::{ReferenceTokenizer, Tokenizer};
