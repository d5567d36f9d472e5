//! Error types for the summarization pipeline.
//!
//! [`SummarizeError`] covers the four failure categories of a `summarize`
//! call: bad configuration, untokenizable text, a failed completion call, and
//! a reduction that stops shrinking. [`CompletionError`] is what a
//! [`CompletionService`](crate::api::CompletionService) returns; it is wrapped
//! into [`SummarizeError::Summarization`] together with the [`Stage`] that
//! failed. No variant carries partial output. [`WorkspaceError`] adds the
//! file-handling failures of [`workspace`](crate::workspace); only its
//! `SaveFailed` variant keeps a finished summary.

use std::fmt;
use thiserror::Error;

/// Where in the pipeline a completion call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Summarizing the chunk with this index within its reduction round.
    Chunk(usize),
    /// The single consolidation call after the reducer converged.
    FinalReduction,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Chunk(index) => write!(f, "chunk {index}"),
            Stage::FinalReduction => write!(f, "final reduction"),
        }
    }
}

/// Errors surfaced by [`DocumentSummarizer`](crate::summarizer::DocumentSummarizer)
/// and the modules it composes.
#[derive(Debug, Error)]
pub enum SummarizeError {
    /// Invalid or self-contradictory configuration. Never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The text could not be tokenized or a token slice could not be decoded.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// A completion-service call failed.
    #[error("summarization failed at {stage}: {source}")]
    Summarization {
        stage: Stage,
        #[source]
        source: CompletionError,
    },

    /// A reduction round did not shrink the text, or the round limit was hit.
    #[error("reduction did not converge: {0}")]
    Convergence(String),
}

impl SummarizeError {
    /// Index of the failed chunk, if this is a per-chunk summarization failure.
    pub fn chunk_index(&self) -> Option<usize> {
        match self {
            SummarizeError::Summarization {
                stage: Stage::Chunk(index),
                ..
            } => Some(*index),
            _ => None,
        }
    }
}

/// Errors returned by a completion service.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// The request never produced an HTTP response (connect, timeout, TLS).
    #[error("request failed: {0}")]
    Request(String),

    /// The endpoint answered with a non-success status.
    #[error("completion API HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The endpoint answered 2xx with an error object.
    #[error("completion API error: {0}")]
    Api(String),

    /// The response body could not be parsed.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The response carried no text content.
    #[error("empty completion response")]
    EmptyResponse,

    /// The task running the call panicked or was cancelled.
    #[error("completion task aborted: {0}")]
    Aborted(String),
}

impl CompletionError {
    /// Whether retrying the same request may succeed.
    ///
    /// Rate limits, server-side 5xx errors, and transport failures are
    /// transient. Client errors (400, 401, 403, 404, 422) and malformed
    /// responses are not.
    pub fn is_transient(&self) -> bool {
        match self {
            CompletionError::Request(_) => true,
            CompletionError::Http { status, .. } => {
                matches!(status, 429 | 500 | 502 | 503 | 504)
            }
            CompletionError::Api(_)
            | CompletionError::InvalidResponse(_)
            | CompletionError::EmptyResponse
            | CompletionError::Aborted(_) => false,
        }
    }
}

/// Errors from loading, summarizing, or saving workspace files.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// A knowledge document (PDF, Office, HTML, notebook) that must be
    /// converted to text before it can be summarized.
    #[error("file {0} must be converted to text before it can be summarized")]
    RequiresConversion(String),

    #[error("path {0} is outside the workspace")]
    OutsideRoot(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("file {0} is not valid UTF-8")]
    InvalidUtf8(String),

    #[error("file {path} is {size} bytes, over the {limit} byte limit")]
    TooLarge { path: String, size: u64, limit: u64 },

    /// The summary was produced but could not be written. It is kept here
    /// so callers can still hand it to the user.
    #[error("failed to save summary to {path}: {source}")]
    SaveFailed {
        path: String,
        summary: String,
        #[source]
        source: Box<WorkspaceError>,
    },

    #[error(transparent)]
    Summarize(#[from] SummarizeError),
}

impl WorkspaceError {
    /// The finished summary, if this error happened after summarizing.
    pub fn summary(&self) -> Option<&str> {
        match self {
            WorkspaceError::SaveFailed { summary, .. } => Some(summary),
            _ => None,
        }
    }
}
