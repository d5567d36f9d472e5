//! The completion-service contract the summarizer is written against.
//!
//! A completion service takes a system prompt, a user prompt, an output
//! token ceiling and a temperature, and returns generated text. Model
//! selection, authentication and transport live behind the trait; the
//! summarizer treats it as a black box and shares one instance across all
//! concurrent chunk calls.

use crate::error::CompletionError;
use futures::future::BoxFuture;
use std::sync::Arc;

/// Boxed future returned by [`CompletionService::complete`].
pub type CompletionFuture<'a> = BoxFuture<'a, Result<String, CompletionError>>;

/// One single-turn completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_output_tokens: usize,
    pub temperature: f32,
}

/// Something that turns a [`CompletionRequest`] into text.
///
/// Uses a boxed future so the trait stays dyn-compatible; the summarizer
/// holds it as `Arc<dyn CompletionService>`.
pub trait CompletionService: Send + Sync {
    fn complete<'a>(&'a self, request: &'a CompletionRequest) -> CompletionFuture<'a>;
}

impl<T: CompletionService + ?Sized> CompletionService for Arc<T> {
    fn complete<'a>(&'a self, request: &'a CompletionRequest) -> CompletionFuture<'a> {
        (**self).complete(request)
    }
}
