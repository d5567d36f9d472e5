//! Configuration for [`DocumentSummarizer`](crate::summarizer::DocumentSummarizer).
//!
//! [`SummarizerOptions`] is a plain struct with defaults and `with_*`
//! builders. [`SummarizerOptions::build`] validates it and resolves the chunk
//! size, producing an immutable [`SummarizationConfig`]. The hosting
//! application builds one config and passes it in; nothing is read from the
//! environment here.
//!
//! # Examples
//!
//! ```
//! use hiersum::config::SummarizerOptions;
//!
//! let config = SummarizerOptions::new("gpt-4o")
//!     .with_max_workers(8)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.max_chunk_tokens(), 109_616);
//! ```

use crate::chunker::validate_window;
use crate::error::SummarizeError;

/// Default generation model.
pub const DEFAULT_MODEL: &str = "gpt-4o";
/// Context window of the generation model.
pub const DEFAULT_MAX_CONTEXT_TOKENS: usize = 128_000;
/// Output-token limit per completion call.
pub const DEFAULT_MAX_OUTPUT_TOKENS: usize = 16_384;
/// Tokens reserved for the system prompt and message framing.
pub const DEFAULT_OVERHEAD_TOKENS: usize = 2_000;
pub const DEFAULT_CHUNK_OVERLAP_TOKENS: usize = 0;
/// Concurrent completion calls per reduction round.
pub const DEFAULT_MAX_WORKERS: usize = 4;
/// Reduction rounds allowed before giving up.
pub const DEFAULT_MAX_ROUNDS: usize = 16;
/// Sampling temperature for every summarization call.
pub const SUMMARY_TEMPERATURE: f32 = 0.1;

/// Unvalidated summarizer settings.
#[derive(Debug, Clone)]
pub struct SummarizerOptions {
    /// Generation model identifier.
    pub model: String,
    pub max_context_tokens: usize,
    pub max_output_tokens: usize,
    pub overhead_tokens: usize,
    /// Explicit chunk size. `None` derives it from the three budgets above.
    pub max_chunk_tokens: Option<usize>,
    pub chunk_overlap_tokens: usize,
    pub max_workers: usize,
    pub max_rounds: usize,
    /// Emit per-round debug logs.
    pub verbose: bool,
}

impl Default for SummarizerOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_context_tokens: DEFAULT_MAX_CONTEXT_TOKENS,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            overhead_tokens: DEFAULT_OVERHEAD_TOKENS,
            max_chunk_tokens: None,
            chunk_overlap_tokens: DEFAULT_CHUNK_OVERLAP_TOKENS,
            max_workers: DEFAULT_MAX_WORKERS,
            max_rounds: DEFAULT_MAX_ROUNDS,
            verbose: true,
        }
    }
}

impl SummarizerOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_max_context_tokens(mut self, tokens: usize) -> Self {
        self.max_context_tokens = tokens;
        self
    }

    pub fn with_max_output_tokens(mut self, tokens: usize) -> Self {
        self.max_output_tokens = tokens;
        self
    }

    pub fn with_overhead_tokens(mut self, tokens: usize) -> Self {
        self.overhead_tokens = tokens;
        self
    }

    /// Use a fixed chunk size instead of the derived one.
    pub fn with_max_chunk_tokens(mut self, tokens: usize) -> Self {
        self.max_chunk_tokens = Some(tokens);
        self
    }

    pub fn with_chunk_overlap_tokens(mut self, tokens: usize) -> Self {
        self.chunk_overlap_tokens = tokens;
        self
    }

    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers;
        self
    }

    pub fn with_max_rounds(mut self, rounds: usize) -> Self {
        self.max_rounds = rounds;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Chunk size left after reserving output and overhead tokens. Negative
    /// when the reserves exceed the context window.
    pub fn derived_chunk_tokens(&self) -> i64 {
        self.max_context_tokens as i64
            - self.max_output_tokens as i64
            - self.overhead_tokens as i64
    }

    /// Validate and freeze the options.
    pub fn build(self) -> Result<SummarizationConfig, SummarizeError> {
        if self.model.trim().is_empty() {
            return Err(SummarizeError::Configuration("model must not be empty".into()));
        }
        if self.max_output_tokens == 0 {
            return Err(SummarizeError::Configuration(
                "max_output_tokens must be positive".into(),
            ));
        }
        if self.max_workers == 0 {
            return Err(SummarizeError::Configuration(
                "max_workers must be at least 1".into(),
            ));
        }
        if self.max_rounds == 0 {
            return Err(SummarizeError::Configuration(
                "max_rounds must be at least 1".into(),
            ));
        }

        let derived = self.derived_chunk_tokens();
        if derived <= 0 {
            return Err(SummarizeError::Configuration(format!(
                "derived chunk size is non-positive ({derived}): max_context_tokens {} - \
                 max_output_tokens {} - overhead_tokens {}; reduce max_output_tokens or \
                 overhead_tokens",
                self.max_context_tokens, self.max_output_tokens, self.overhead_tokens
            )));
        }

        let max_chunk_tokens = self.max_chunk_tokens.unwrap_or(derived as usize);
        validate_window(max_chunk_tokens, self.chunk_overlap_tokens)?;

        Ok(SummarizationConfig {
            model: self.model,
            max_context_tokens: self.max_context_tokens,
            max_output_tokens: self.max_output_tokens,
            overhead_tokens: self.overhead_tokens,
            max_chunk_tokens,
            chunk_overlap_tokens: self.chunk_overlap_tokens,
            max_workers: self.max_workers,
            max_rounds: self.max_rounds,
            verbose: self.verbose,
        })
    }
}

/// Validated, immutable summarizer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummarizationConfig {
    model: String,
    max_context_tokens: usize,
    max_output_tokens: usize,
    overhead_tokens: usize,
    max_chunk_tokens: usize,
    chunk_overlap_tokens: usize,
    max_workers: usize,
    max_rounds: usize,
    verbose: bool,
}

impl SummarizationConfig {
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn max_context_tokens(&self) -> usize {
        self.max_context_tokens
    }

    pub fn max_output_tokens(&self) -> usize {
        self.max_output_tokens
    }

    pub fn overhead_tokens(&self) -> usize {
        self.overhead_tokens
    }

    /// Resolved chunk size; always positive.
    pub fn max_chunk_tokens(&self) -> usize {
        self.max_chunk_tokens
    }

    pub fn chunk_overlap_tokens(&self) -> usize {
        self.chunk_overlap_tokens
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_chunk_size_is_derived() {
        let config = SummarizerOptions::default().build().unwrap();
        assert_eq!(config.max_chunk_tokens(), 128_000 - 16_384 - 2_000);
        assert_eq!(config.max_chunk_tokens(), 109_616);
        assert_eq!(config.max_workers(), 4);
        assert_eq!(config.chunk_overlap_tokens(), 0);
        assert_eq!(config.model(), "gpt-4o");
    }

    #[test]
    fn explicit_chunk_size_wins() {
        let config = SummarizerOptions::new("gpt-4o-mini")
            .with_max_chunk_tokens(100_000)
            .build()
            .unwrap();
        assert_eq!(config.max_chunk_tokens(), 100_000);
        assert_eq!(config.model(), "gpt-4o-mini");
    }

    #[test]
    fn oversized_output_reserve_is_rejected() {
        let err = SummarizerOptions::default()
            .with_max_output_tokens(130_000)
            .build()
            .unwrap_err();
        assert!(matches!(err, SummarizeError::Configuration(_)));

        // Also with an explicit chunk size: the reserves alone are contradictory.
        let err = SummarizerOptions::default()
            .with_max_output_tokens(130_000)
            .with_max_chunk_tokens(1_000)
            .build()
            .unwrap_err();
        assert!(matches!(err, SummarizeError::Configuration(_)));
    }

    #[test]
    fn exact_exhaustion_is_rejected() {
        let err = SummarizerOptions::default()
            .with_max_context_tokens(18_384)
            .build()
            .unwrap_err();
        assert!(matches!(err, SummarizeError::Configuration(_)));
    }

    #[test]
    fn overlap_must_leave_a_positive_stride() {
        let err = SummarizerOptions::default()
            .with_max_chunk_tokens(1_000)
            .with_chunk_overlap_tokens(1_000)
            .build()
            .unwrap_err();
        assert!(matches!(err, SummarizeError::Configuration(_)));

        let ok = SummarizerOptions::default()
            .with_max_chunk_tokens(1_000)
            .with_chunk_overlap_tokens(999)
            .build();
        assert!(ok.is_ok());
    }

    #[test]
    fn zero_values_are_rejected() {
        for options in [
            SummarizerOptions::default().with_max_workers(0),
            SummarizerOptions::default().with_max_rounds(0),
            SummarizerOptions::default().with_max_chunk_tokens(0),
            SummarizerOptions::default().with_max_output_tokens(0),
            SummarizerOptions::new("  "),
        ] {
            assert!(
                matches!(options.build(), Err(SummarizeError::Configuration(_))),
                "expected configuration error"
            );
        }
    }
}
