//! Convenience re-exports for common `hiersum` types.
//!
//! ```ignore
//! use hiersum::prelude::*;
//! ```
//!
//! Covers building and running a summarizer. File-store and tool types are
//! left out; import those from [`workspace`](crate::workspace) and
//! [`tools`](crate::tools) when needed.

pub use crate::api::{
    CompletionRequest, CompletionService, OpenAiClient, RetryConfig, RetryingCompletion,
};
pub use crate::config::{SummarizationConfig, SummarizerOptions};
pub use crate::error::{CompletionError, Stage, SummarizeError};
pub use crate::summarizer::{DocumentSummarizer, SummaryReport};
pub use crate::tokenizer::{ReferenceTokenizer, Tokenizer};
