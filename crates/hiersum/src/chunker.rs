//! Token-bounded splitting of arbitrary-length text.
//!
//! The document is encoded once and walked in windows of `max_chunk_tokens`
//! tokens, advancing by `max_chunk_tokens - overlap_tokens`. Each window is
//! decoded back into text. A text that already fits is returned verbatim as a
//! single chunk; the reducer relies on that to detect convergence.
//!
//! BPE windows can end inside a multi-byte character. When a window does not
//! decode, its end is pulled back a few tokens and the remainder opens the
//! next window, so with zero overlap the windows still tile the whole token
//! sequence.

use crate::error::SummarizeError;
use crate::tokenizer::Tokenizer;
use std::ops::Range;

/// How many tokens a window edge may move looking for a character boundary.
const MAX_BOUNDARY_SHIFT: usize = 8;

/// A contiguous span of a document, at most `max_chunk_tokens` tokens long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position of the chunk within its document.
    pub index: usize,
    /// Decoded text of the token slice.
    pub text: String,
    /// Token positions in the document's token sequence.
    pub tokens: Range<usize>,
}

impl Chunk {
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }
}

/// Check that a window of `max_chunk_tokens` with `overlap_tokens` overlap
/// advances.
pub fn validate_window(
    max_chunk_tokens: usize,
    overlap_tokens: usize,
) -> Result<(), SummarizeError> {
    if max_chunk_tokens == 0 {
        return Err(SummarizeError::Configuration(
            "max_chunk_tokens must be positive".into(),
        ));
    }
    if overlap_tokens >= max_chunk_tokens {
        return Err(SummarizeError::Configuration(format!(
            "chunk_overlap_tokens ({overlap_tokens}) must be smaller than max_chunk_tokens \
             ({max_chunk_tokens})"
        )));
    }
    Ok(())
}

/// Split `text` into chunks of at most `max_chunk_tokens` tokens.
pub fn chunk(
    tokenizer: &dyn Tokenizer,
    text: &str,
    max_chunk_tokens: usize,
    overlap_tokens: usize,
) -> Result<Vec<Chunk>, SummarizeError> {
    Chunks::new(tokenizer, text, max_chunk_tokens, overlap_tokens)?.collect()
}

/// Lazy chunk sequence over one document. Restartable by constructing a new
/// iterator over the same input.
pub struct Chunks<'a> {
    tokenizer: &'a dyn Tokenizer,
    source: &'a str,
    tokens: Vec<u32>,
    max_chunk_tokens: usize,
    overlap_tokens: usize,
    next_start: usize,
    next_index: usize,
    done: bool,
}

impl<'a> Chunks<'a> {
    /// Encode `text` and prepare to walk it. Fails on an invalid window or
    /// untokenizable text.
    pub fn new(
        tokenizer: &'a dyn Tokenizer,
        text: &'a str,
        max_chunk_tokens: usize,
        overlap_tokens: usize,
    ) -> Result<Self, SummarizeError> {
        validate_window(max_chunk_tokens, overlap_tokens)?;
        let tokens = tokenizer.encode(text)?;
        Ok(Self {
            tokenizer,
            source: text,
            tokens,
            max_chunk_tokens,
            overlap_tokens,
            next_start: 0,
            next_index: 0,
            done: false,
        })
    }

    /// Token count of the whole document.
    pub fn total_tokens(&self) -> usize {
        self.tokens.len()
    }

    /// Find the widest decodable window starting at (or just after) `start`.
    fn decode_window(&self, start: usize) -> Result<(Range<usize>, String), SummarizeError> {
        let total = self.tokens.len();
        let ideal_end = (start + self.max_chunk_tokens).min(total);
        // Only overlapping windows can start mid-character; with no overlap
        // every start is the previous window's end.
        let start_shifts = if self.overlap_tokens > 0 && start > 0 {
            MAX_BOUNDARY_SHIFT
        } else {
            0
        };

        let mut last_err = None;
        for shift in 0..=start_shifts {
            let s = start + shift;
            if s >= ideal_end {
                break;
            }
            for pull in 0..=MAX_BOUNDARY_SHIFT {
                // The end of the document is always a character boundary.
                if pull > 0 && ideal_end == total {
                    break;
                }
                let e = ideal_end - pull;
                if e <= s {
                    break;
                }
                match self.tokenizer.decode(&self.tokens[s..e]) {
                    Ok(text) => return Ok((s..e, text)),
                    Err(err) => last_err = Some(err),
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            SummarizeError::Encoding(format!("no decodable window at token {start}"))
        }))
    }
}

impl Iterator for Chunks<'_> {
    type Item = Result<Chunk, SummarizeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let total = self.tokens.len();

        if self.next_index == 0 && total <= self.max_chunk_tokens {
            self.done = true;
            self.next_index = 1;
            return Some(Ok(Chunk {
                index: 0,
                text: self.source.to_string(),
                tokens: 0..total,
            }));
        }

        if self.next_start >= total {
            self.done = true;
            return None;
        }

        match self.decode_window(self.next_start) {
            Ok((range, text)) => {
                let index = self.next_index;
                self.next_index += 1;
                if range.end >= total {
                    self.done = true;
                } else {
                    self.next_start = range
                        .end
                        .saturating_sub(self.overlap_tokens)
                        .max(range.start + 1);
                }
                Some(Ok(Chunk {
                    index,
                    text,
                    tokens: range,
                }))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
