//! Minimal summarization example.
//!
//! Summarizes a text file of any size and prints the summary along with how
//! many reduction rounds and completion calls it took.
//!
//! # Usage
//!
//! ```bash
//! OPENAI_API_KEY=sk-... cargo run --example basic_summary -- path/to/document.md
//! ```

use hiersum::prelude::*;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), String> {
    let path = std::env::args()
        .nth(1)
        .ok_or("usage: basic_summary <file>")?;
    let text = std::fs::read_to_string(&path).map_err(|e| format!("reading {path}: {e}"))?;

    // 1. Client with retry on rate limits and server errors.
    let client = OpenAiClient::from_env("gpt-4o").map_err(|e| e.to_string())?;
    let client = RetryingCompletion::new(client, RetryConfig::default());

    // 2. Budgets: defaults fit a 128k-context model.
    let config = SummarizerOptions::new("gpt-4o")
        .with_max_workers(4)
        .build()
        .map_err(|e| e.to_string())?;

    // 3. Summarize.
    let tokenizer = ReferenceTokenizer::new().map_err(|e| e.to_string())?;
    let summarizer = DocumentSummarizer::new(config, Arc::new(tokenizer), Arc::new(client));
    let report = summarizer
        .summarize_with_report(&text)
        .await
        .map_err(|e| e.to_string())?;

    println!("{}", report.summary);
    println!(
        "\n--- {} tokens | {} rounds | {} calls ---",
        report.document_tokens, report.rounds, report.completion_calls
    );
    Ok(())
}
