//! Summarize workspace documents of any size with an OpenAI-compatible model.
//!
//! Reads `OPENAI_API_KEY` (and optionally `OPENAI_BASE_URL`) from the
//! environment. Paths are relative to `--workspace`.
//!
//! # Examples
//!
//! ```sh
//! # Write docs/design_summary.md next to the input
//! hiersum summarize --input docs/design.md
//!
//! # Print the summary instead of saving it
//! hiersum summarize --input notes.txt --output NONE
//!
//! # Read a file, summarizing it only if it exceeds 10k tokens
//! hiersum --workspace ./files read --input big.md
//!
//! # Tool definitions for an agent
//! hiersum tools
//! ```

use clap::{Parser, Subcommand};
use hiersum::api::{
    CompletionService, DEFAULT_BASE_URL, OpenAiClient, RetryConfig, RetryingCompletion,
};
use hiersum::config::{DEFAULT_MODEL, SummarizerOptions};
use hiersum::summarizer::DocumentSummarizer;
use hiersum::tokenizer::ReferenceTokenizer;
use hiersum::tools::ToolSet;
use hiersum::workspace::{
    self, DEFAULT_READ_THRESHOLD_TOKENS, FileStore, FileSummary, LocalFileStore,
};
use std::process;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Hierarchical map-reduce document summarizer.
#[derive(Parser)]
#[command(name = "hiersum", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    // ── Model ──────────────────────────────────────────────────
    /// Generation model
    #[arg(long, global = true, env = "OBOT_DEFAULT_LLM_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Retries per completion call on rate limits and server errors
    #[arg(long, global = true, default_value_t = 2)]
    retries: u32,

    // ── Budgets ────────────────────────────────────────────────
    /// Tokens per chunk (default: context - output - overhead)
    #[arg(long, global = true)]
    max_chunk_tokens: Option<usize>,

    /// Tokens shared between consecutive chunks
    #[arg(long, global = true)]
    chunk_overlap_tokens: Option<usize>,

    /// Output-token limit per completion call
    #[arg(long, global = true)]
    max_output_tokens: Option<usize>,

    /// Concurrent completion calls
    #[arg(long, global = true)]
    max_workers: Option<usize>,

    /// Reduction rounds before giving up
    #[arg(long, global = true)]
    max_rounds: Option<usize>,

    // ── Environment ────────────────────────────────────────────
    /// Workspace directory that input and output paths are relative to
    #[arg(long, global = true, default_value = ".")]
    workspace: String,

    /// Only log warnings and errors
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Summarize a file and save or print the result
    Summarize {
        /// File to summarize
        #[arg(long, env = "INPUT_FILE")]
        input: String,

        /// Output path; NONE prints to stdout, empty writes <name>_summary.md
        #[arg(long, env = "OUTPUT_FILE")]
        output: Option<String>,
    },
    /// Print a file, summarized if it is larger than the threshold
    Read {
        /// File to read
        #[arg(long, env = "INPUT_FILE")]
        input: String,

        /// Token count above which the file is summarized
        #[arg(long, default_value_t = DEFAULT_READ_THRESHOLD_TOKENS)]
        threshold: usize,
    },
    /// Print the agent tool definitions as JSON
    Tools,
}

fn init_tracing(quiet: bool) {
    let default = if quiet { "hiersum=warn" } else { "hiersum=debug" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn summarizer_options(cli: &Cli) -> SummarizerOptions {
    let mut options = SummarizerOptions::new(&cli.model).with_verbose(!cli.quiet);
    if let Some(tokens) = cli.max_chunk_tokens {
        options = options.with_max_chunk_tokens(tokens);
    }
    if let Some(tokens) = cli.chunk_overlap_tokens {
        options = options.with_chunk_overlap_tokens(tokens);
    }
    if let Some(tokens) = cli.max_output_tokens {
        options = options.with_max_output_tokens(tokens);
    }
    if let Some(workers) = cli.max_workers {
        options = options.with_max_workers(workers);
    }
    if let Some(rounds) = cli.max_rounds {
        options = options.with_max_rounds(rounds);
    }
    options
}

fn build_summarizer(cli: &Cli, client: OpenAiClient) -> Result<DocumentSummarizer, String> {
    let config = summarizer_options(cli).build().map_err(|e| e.to_string())?;
    let tokenizer = ReferenceTokenizer::new().map_err(|e| e.to_string())?;
    let client: Arc<dyn CompletionService> = Arc::new(RetryingCompletion::new(
        client,
        RetryConfig::with_retries(cli.retries),
    ));
    Ok(DocumentSummarizer::new(config, Arc::new(tokenizer), client))
}

async fn run(cli: &Cli) -> Result<String, String> {
    let store = LocalFileStore::new(&cli.workspace);

    match &cli.command {
        Command::Summarize { input, output } => {
            let client = OpenAiClient::from_env(&cli.model).map_err(|e| e.to_string())?;
            let summarizer = build_summarizer(cli, client)?;
            info!("Summarizing {input}");
            let outcome =
                workspace::summarize_file(&store, &summarizer, input, output.as_deref())
                    .await
                    .map_err(|e| {
                        // Still hand over the summary when only the save failed.
                        if let Some(summary) = e.summary() {
                            println!("File Summary:\n{summary}");
                        }
                        e.to_string()
                    })?;
            Ok(match outcome {
                FileSummary::Skipped { .. } => {
                    "Warning: File is empty, skipping summarization".to_string()
                }
                FileSummary::Returned { summary } => summary,
                FileSummary::Written { path, .. } => {
                    format!("Summary written to workspace file: {path}")
                }
            })
        }
        Command::Read { input, threshold } => {
            let client = OpenAiClient::from_env(&cli.model).map_err(|e| e.to_string())?;
            let summarizer = build_summarizer(cli, client)?;
            workspace::read_file(&store, &summarizer, input, *threshold)
                .await
                .map_err(|e| e.to_string())
        }
        Command::Tools => {
            // Definitions never reach the endpoint, so no API key is needed.
            let client = OpenAiClient::new(DEFAULT_BASE_URL, String::new(), &cli.model)
                .map_err(|e| e.to_string())?;
            let summarizer = build_summarizer(cli, client)?;
            let store: Arc<dyn FileStore> = Arc::new(store);
            let tools = ToolSet::summarizer_tools(store, Arc::new(summarizer));
            serde_json::to_string_pretty(&tools.definitions())
                .map_err(|e| format!("failed to serialize tool definitions: {e}"))
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.quiet);

    match run(&cli).await {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
