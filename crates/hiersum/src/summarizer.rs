//! Hierarchical map-reduce summarization.
//!
//! [`DocumentSummarizer::summarize`] runs in two phases:
//!
//! 1. **Reduce.** Chunk the text. If it fits in one chunk it has converged and
//!    is returned untouched, with no LLM call. Otherwise every chunk is
//!    summarized concurrently (at most `max_workers` calls in flight), the
//!    summaries are joined with a blank line, and the result is reduced again.
//!    Each round must shrink the token count and the number of rounds is
//!    capped, so a summary that refuses to shrink surfaces as
//!    [`SummarizeError::Convergence`] instead of looping forever.
//! 2. **Consolidate.** One final completion call turns the converged text into
//!    a single markdown summary. This call always happens, even for a document
//!    that fit in one chunk from the start.
//!
//! Any failed completion call aborts the whole run; no partial summary is
//! returned.

use crate::api::{CompletionRequest, CompletionService};
use crate::chunker::{Chunk, Chunks};
use crate::config::{SUMMARY_TEMPERATURE, SummarizationConfig};
use crate::error::{CompletionError, Stage, SummarizeError};
use crate::prompt;
use crate::tokenizer::Tokenizer;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Separator placed between partial summaries before the next round.
pub const SUMMARY_SEPARATOR: &str = "\n\n";

/// Result of running the reducer to convergence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reduction {
    /// Text that fits in a single chunk.
    pub text: String,
    /// Token count of the reducer's input.
    pub input_tokens: usize,
    /// Reduction rounds performed (0 if the input already fit).
    pub rounds: usize,
    /// Chunk-summarization calls made across all rounds.
    pub completion_calls: usize,
}

/// Outcome of a full [`DocumentSummarizer::summarize_with_report`] run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryReport {
    pub summary: String,
    pub document_tokens: usize,
    pub rounds: usize,
    /// All completion calls, including the final consolidation.
    pub completion_calls: usize,
}

enum ReductionState {
    Reducing(String),
    Converged(String),
}

/// Summarizes documents of any size with a shared tokenizer and completion
/// service.
pub struct DocumentSummarizer {
    config: SummarizationConfig,
    tokenizer: Arc<dyn Tokenizer>,
    client: Arc<dyn CompletionService>,
}

impl DocumentSummarizer {
    pub fn new(
        config: SummarizationConfig,
        tokenizer: Arc<dyn Tokenizer>,
        client: Arc<dyn CompletionService>,
    ) -> Self {
        if config.verbose() {
            debug!("Using model: {}", config.model());
            debug!("max_context_tokens: {}", config.max_context_tokens());
            debug!("max_output_tokens: {}", config.max_output_tokens());
            debug!("overhead_tokens: {}", config.overhead_tokens());
            debug!("max_chunk_tokens: {}", config.max_chunk_tokens());
            debug!("max_workers: {}", config.max_workers());
        }
        Self {
            config,
            tokenizer,
            client,
        }
    }

    pub fn config(&self) -> &SummarizationConfig {
        &self.config
    }

    pub fn tokenizer(&self) -> &Arc<dyn Tokenizer> {
        &self.tokenizer
    }

    /// Split `text` into chunks of at most `max_chunk_tokens`. Also returns
    /// the text's total token count.
    pub fn chunk_text(&self, text: &str) -> Result<(Vec<Chunk>, usize), SummarizeError> {
        let chunks = Chunks::new(
            self.tokenizer.as_ref(),
            text,
            self.config.max_chunk_tokens(),
            self.config.chunk_overlap_tokens(),
        )?;
        let total = chunks.total_tokens();
        if self.config.verbose() {
            debug!("Total tokens in document: {total}");
        }
        let chunks = chunks.collect::<Result<Vec<_>, _>>()?;
        if self.config.verbose() {
            debug!("Created {} chunk(s).", chunks.len());
        }
        Ok((chunks, total))
    }

    fn chunk_request(&self, chunk: &str) -> CompletionRequest {
        CompletionRequest {
            system_prompt: prompt::chunk_system_prompt(self.config.max_output_tokens()),
            user_prompt: prompt::chunk_user_prompt(chunk),
            max_output_tokens: self.config.max_output_tokens(),
            temperature: SUMMARY_TEMPERATURE,
        }
    }

    /// Summarize one chunk with the detail-preserving prompt.
    pub async fn summarize_chunk(
        &self,
        index: usize,
        chunk: &str,
    ) -> Result<String, SummarizeError> {
        let request = self.chunk_request(chunk);
        self.client
            .complete(&request)
            .await
            .map_err(|source| SummarizeError::Summarization {
                stage: Stage::Chunk(index),
                source,
            })
    }

    /// Summarize all chunks concurrently, at most `max_workers` at a time.
    ///
    /// Summaries come back in chunk order regardless of completion order. The
    /// first failure aborts the outstanding calls and is returned.
    pub async fn summarize_chunks_in_parallel(
        &self,
        chunks: Vec<Chunk>,
    ) -> Result<Vec<String>, SummarizeError> {
        let total = chunks.len();
        if self.config.verbose() {
            debug!("Summarizing {total} chunk(s) with {} worker(s)", self.config.max_workers());
        }

        let permits = Arc::new(Semaphore::new(self.config.max_workers()));
        let mut indices = Vec::with_capacity(total);
        let mut js: JoinSet<(usize, Result<String, CompletionError>)> = JoinSet::new();

        for (slot, chunk) in chunks.into_iter().enumerate() {
            indices.push(chunk.index);
            let request = self.chunk_request(&chunk.text);
            let client = Arc::clone(&self.client);
            let permits = Arc::clone(&permits);
            js.spawn(async move {
                let result = match permits.acquire_owned().await {
                    Ok(_permit) => AssertUnwindSafe(client.complete(&request))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|_| {
                            Err(CompletionError::Aborted("completion call panicked".into()))
                        }),
                    Err(_) => Err(CompletionError::Aborted("worker pool closed".into())),
                };
                (slot, result)
            });
        }

        let mut summaries: Vec<Option<String>> = vec![None; total];
        while let Some(joined) = js.join_next().await {
            let (slot, result) = match joined {
                Ok(done) => done,
                Err(e) => {
                    // Panics are caught inside the task, so this is a
                    // cancellation; charge it to the first unfinished chunk.
                    js.abort_all();
                    let slot = summaries.iter().position(Option::is_none).unwrap_or(0);
                    return Err(SummarizeError::Summarization {
                        stage: Stage::Chunk(indices.get(slot).copied().unwrap_or(slot)),
                        source: CompletionError::Aborted(e.to_string()),
                    });
                }
            };
            match result {
                Ok(text) => summaries[slot] = Some(text),
                Err(source) => {
                    js.abort_all();
                    return Err(SummarizeError::Summarization {
                        stage: Stage::Chunk(indices[slot]),
                        source,
                    });
                }
            }
        }

        if self.config.verbose() {
            debug!("Summarized {total} chunk(s) in parallel.");
        }

        summaries
            .into_iter()
            .enumerate()
            .map(|(slot, s)| {
                s.ok_or_else(|| SummarizeError::Summarization {
                    stage: Stage::Chunk(indices[slot]),
                    source: CompletionError::Aborted("no result collected".into()),
                })
            })
            .collect()
    }

    /// Reduce `text` round by round until it fits in one chunk.
    pub async fn reduce(&self, text: &str) -> Result<Reduction, SummarizeError> {
        let mut state = ReductionState::Reducing(text.to_string());
        let mut input_tokens = None;
        let mut rounds = 0;
        let mut completion_calls = 0;

        loop {
            state = match state {
                ReductionState::Converged(text) => {
                    return Ok(Reduction {
                        text,
                        input_tokens: input_tokens.unwrap_or(0),
                        rounds,
                        completion_calls,
                    });
                }
                ReductionState::Reducing(current) => {
                    let (chunks, current_tokens) = self.chunk_text(&current)?;
                    input_tokens.get_or_insert(current_tokens);

                    if chunks.len() <= 1 {
                        ReductionState::Converged(current)
                    } else {
                        if rounds >= self.config.max_rounds() {
                            return Err(SummarizeError::Convergence(format!(
                                "still {} chunks ({current_tokens} tokens) after {rounds} rounds",
                                chunks.len()
                            )));
                        }
                        rounds += 1;
                        completion_calls += chunks.len();

                        let summaries = self.summarize_chunks_in_parallel(chunks).await?;
                        if self.config.verbose() {
                            debug!(
                                "Combining {} summaries into a new text (round {rounds})...",
                                summaries.len()
                            );
                        }
                        let candidate = summaries.join(SUMMARY_SEPARATOR);
                        let candidate_tokens = self.tokenizer.token_count(&candidate)?;
                        if candidate_tokens >= current_tokens {
                            return Err(SummarizeError::Convergence(format!(
                                "round {rounds} grew or kept the text size \
                                 ({current_tokens} -> {candidate_tokens} tokens)"
                            )));
                        }
                        if self.config.verbose() {
                            debug!(
                                "Round {rounds}: {current_tokens} -> {candidate_tokens} tokens"
                            );
                        }
                        ReductionState::Reducing(candidate)
                    }
                }
            };
        }
    }

    /// Consolidate converged text into the final summary.
    pub async fn final_reduction(&self, text: &str) -> Result<String, SummarizeError> {
        let request = CompletionRequest {
            system_prompt: prompt::final_system_prompt(self.config.max_output_tokens()),
            user_prompt: prompt::final_user_prompt(text),
            max_output_tokens: self.config.max_output_tokens(),
            temperature: SUMMARY_TEMPERATURE,
        };
        self.client
            .complete(&request)
            .await
            .map_err(|source| SummarizeError::Summarization {
                stage: Stage::FinalReduction,
                source,
            })
    }

    /// Summarize a document of any size.
    pub async fn summarize(&self, document: &str) -> Result<String, SummarizeError> {
        Ok(self.summarize_with_report(document).await?.summary)
    }

    /// Summarize a document and report how much work it took.
    pub async fn summarize_with_report(
        &self,
        document: &str,
    ) -> Result<SummaryReport, SummarizeError> {
        let reduction = self.reduce(document).await?;
        let summary = self.final_reduction(&reduction.text).await?;

        match self.tokenizer.token_count(&summary) {
            Ok(tokens) if tokens > self.config.max_chunk_tokens() => warn!(
                "Final summary is {tokens} tokens, more than one chunk ({})",
                self.config.max_chunk_tokens()
            ),
            Ok(_) => {}
            Err(e) => warn!("Could not count tokens of the final summary: {e}"),
        }

        Ok(SummaryReport {
            summary,
            document_tokens: reduction.input_tokens,
            rounds: reduction.rounds,
            completion_calls: reduction.completion_calls + 1,
        })
    }
}
