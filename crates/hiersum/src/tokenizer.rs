//! Token counting for budgeting.
//!
//! Chunk sizes and convergence are measured with one fixed reference
//! vocabulary no matter which model generates the summaries. The budgeting
//! tokenizer is a stable proxy: swapping the generation model never changes
//! where a document is split.

use crate::error::SummarizeError;
use tiktoken_rs::CoreBPE;

/// Model whose vocabulary is used for every token count.
pub const REFERENCE_TOKENIZER_MODEL: &str = "gpt-4o";

/// Special-token literals the reference tokenizer refuses to encode as text.
const DISALLOWED_SPECIAL: &[&str] = &["<|endoftext|>", "<|endofprompt|>"];

/// Text ↔ token conversion used for chunking and budget checks.
pub trait Tokenizer: Send + Sync {
    /// Encode text into token ids.
    fn encode(&self, text: &str) -> Result<Vec<u32>, SummarizeError>;

    /// Decode a token slice back into text. Fails if the slice does not end
    /// on a character boundary.
    fn decode(&self, tokens: &[u32]) -> Result<String, SummarizeError>;

    /// Number of tokens in `text`.
    fn token_count(&self, text: &str) -> Result<usize, SummarizeError> {
        Ok(self.encode(text)?.len())
    }
}

/// BPE tokenizer for [`REFERENCE_TOKENIZER_MODEL`] (`o200k_base`).
pub struct ReferenceTokenizer {
    bpe: CoreBPE,
}

impl ReferenceTokenizer {
    /// Load the reference vocabulary. The ranks ship inside `tiktoken-rs`, so
    /// this does no I/O, but building the BPE is not free: construct once and
    /// share behind an `Arc`.
    pub fn new() -> Result<Self, SummarizeError> {
        let bpe = tiktoken_rs::o200k_base().map_err(|e| {
            SummarizeError::Encoding(format!(
                "failed to load {REFERENCE_TOKENIZER_MODEL} vocabulary: {e}"
            ))
        })?;
        Ok(Self { bpe })
    }
}

impl std::fmt::Debug for ReferenceTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceTokenizer")
            .field("model", &REFERENCE_TOKENIZER_MODEL)
            .finish()
    }
}

impl Tokenizer for ReferenceTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>, SummarizeError> {
        if let Some(special) = DISALLOWED_SPECIAL.iter().find(|s| text.contains(**s)) {
            return Err(SummarizeError::Encoding(format!(
                "text contains disallowed special token {special}"
            )));
        }
        Ok(self.bpe.encode_ordinary(text))
    }

    fn decode(&self, tokens: &[u32]) -> Result<String, SummarizeError> {
        self.bpe
            .decode(tokens.to_vec())
            .map_err(|e| SummarizeError::Encoding(format!("failed to decode tokens: {e}")))
    }
}
