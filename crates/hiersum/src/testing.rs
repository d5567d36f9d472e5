//! Test doubles shared by the unit tests.

use crate::api::{CompletionFuture, CompletionRequest, CompletionService};
use crate::error::{CompletionError, SummarizeError};
use crate::tokenizer::Tokenizer;
use futures::FutureExt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// One token per `char`. Token counts equal `text.chars().count()`.
pub(crate) struct CharTokenizer;

impl Tokenizer for CharTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>, SummarizeError> {
        Ok(text.chars().map(u32::from).collect())
    }

    fn decode(&self, tokens: &[u32]) -> Result<String, SummarizeError> {
        tokens
            .iter()
            .map(|&t| {
                char::from_u32(t)
                    .ok_or_else(|| SummarizeError::Encoding(format!("invalid token {t}")))
            })
            .collect()
    }
}

/// One token per byte. Slices that split a character fail to decode.
pub(crate) struct ByteTokenizer;

impl Tokenizer for ByteTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>, SummarizeError> {
        Ok(text.bytes().map(u32::from).collect())
    }

    fn decode(&self, tokens: &[u32]) -> Result<String, SummarizeError> {
        let bytes = tokens
            .iter()
            .map(|&t| {
                u8::try_from(t).map_err(|_| SummarizeError::Encoding(format!("invalid token {t}")))
            })
            .collect::<Result<Vec<u8>, _>>()?;
        String::from_utf8(bytes).map_err(|e| SummarizeError::Encoding(e.to_string()))
    }
}

type Responder = Box<dyn Fn(&CompletionRequest) -> Result<String, CompletionError> + Send + Sync>;
type DelayFn = Box<dyn Fn(&CompletionRequest) -> Duration + Send + Sync>;

/// Scriptable completion service that records every request and tracks how
/// many calls were in flight at once.
pub(crate) struct FakeCompletion {
    responder: Responder,
    delay: DelayFn,
    calls: Mutex<Vec<CompletionRequest>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakeCompletion {
    pub(crate) fn new<F>(responder: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Result<String, CompletionError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            delay: Box::new(|_| Duration::ZERO),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Always answer with `reply`.
    pub(crate) fn replying(reply: &str) -> Self {
        let reply = reply.to_string();
        Self::new(move |_| Ok(reply.clone()))
    }

    /// Sleep for `delay(request)` before answering.
    pub(crate) fn with_delay<D>(mut self, delay: D) -> Self
    where
        D: Fn(&CompletionRequest) -> Duration + Send + Sync + 'static,
    {
        self.delay = Box::new(delay);
        self
    }

    pub(crate) fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

impl CompletionService for FakeCompletion {
    fn complete<'a>(&'a self, request: &'a CompletionRequest) -> CompletionFuture<'a> {
        async move {
            self.calls.lock().unwrap().push(request.clone());
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

            let delay = (self.delay)(request);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            (self.responder)(request)
        }
        .boxed()
    }
}

/// The document text a summarization request carries, without the prompt
/// preamble.
pub(crate) fn request_content(request: &CompletionRequest) -> &str {
    request
        .user_prompt
        .strip_prefix(crate::prompt::USER_PROMPT_PREFIX)
        .unwrap_or(&request.user_prompt)
        .trim()
}
