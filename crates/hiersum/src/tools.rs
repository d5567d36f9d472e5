//! Function-calling tools that expose the summarizer to an LLM agent.
//!
//! | Tool | Name | Purpose |
//! |------|------|---------|
//! | [`SummarizeFile`] | `summarize_file` | Summarize a workspace file, optionally saving the result |
//! | [`ReadFile`] | `read_file` | Read a workspace file, summarizing it when it is too large |
//!
//! Each tool parses its raw JSON arguments itself and reports failures as
//! `"Error: ..."` strings so the calling model can see and correct them.

use crate::summarizer::DocumentSummarizer;
use crate::workspace::{self, DEFAULT_READ_THRESHOLD_TOKENS, FileStore, FileSummary};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::debug;

/// Boxed future returned by [`Tool::execute`].
pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = String> + Send + 'a>>;

// ── Definitions ────────────────────────────────────────────────────

/// Tool definition in the OpenAI function-calling shape.
#[derive(Serialize, Clone, Debug)]
pub struct ToolDef {
    #[serde(rename = "type")]
    pub tool_type: ToolType,
    pub function: FunctionDef,
}

impl ToolDef {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            tool_type: ToolType::Function,
            function: FunctionDef {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct FunctionDef {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub enum ToolType {
    #[serde(rename = "function")]
    Function,
}

/// JSON Schema for a typed argument struct.
pub fn json_schema_for<T: JsonSchema>() -> serde_json::Value {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(schema)
        .unwrap_or_else(|_| serde_json::json!({"type": "object", "properties": {}}))
}

// ── Tool trait ─────────────────────────────────────────────────────

/// A tool an LLM agent can invoke.
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDef;

    /// Run the tool with raw JSON arguments. Never fails; errors come back
    /// as `"Error: ..."` strings.
    fn execute(&self, arguments: &str) -> ToolFuture<'_>;

    fn name(&self) -> String {
        self.definition().function.name
    }
}

/// Tools registered by name.
#[derive(Default)]
pub struct ToolSet {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Both summarizer tools over one store and summarizer.
    pub fn summarizer_tools(
        store: Arc<dyn FileStore>,
        summarizer: Arc<DocumentSummarizer>,
    ) -> Self {
        Self::new()
            .with(SummarizeFile::new(Arc::clone(&store), Arc::clone(&summarizer)))
            .with(ReadFile::new(store, summarizer))
    }

    pub fn with(mut self, tool: impl Tool + 'static) -> Self {
        self.tools.insert(tool.name(), Box::new(tool));
        self
    }

    pub fn definitions(&self) -> Vec<ToolDef> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Dispatch a call by tool name.
    pub async fn execute(&self, name: &str, arguments: &str) -> String {
        match self.tools.get(name) {
            Some(tool) => {
                debug!("Executing tool {name}");
                tool.execute(arguments).await
            }
            None => format!("Error: unknown tool '{name}'"),
        }
    }
}

// ── Typed argument structs ──────────────────────────────────────────

/// Typed arguments for `summarize_file`.
#[derive(Deserialize, JsonSchema)]
pub struct SummarizeFileArgs {
    /// Workspace file to summarize (e.g. 'reports/q3.md').
    pub input_file: String,
    /// Where to save the summary. Omit or pass '' to write
    /// '<name>_summary.md' next to the input; pass 'NONE' to get the summary
    /// back without saving it.
    #[serde(default)]
    pub output_file: Option<String>,
}

/// Typed arguments for `read_file`.
#[derive(Deserialize, JsonSchema)]
pub struct ReadFileArgs {
    /// Workspace file to read (e.g. 'notes/meeting.txt').
    pub input_file: String,
}

fn parse_args<T: for<'de> Deserialize<'de>>(arguments: &str) -> Result<T, String> {
    serde_json::from_str(arguments).map_err(|e| format!("Error: invalid arguments: {e}"))
}

// ── SummarizeFile ───────────────────────────────────────────────────

/// Summarize a workspace file of any size.
pub struct SummarizeFile {
    store: Arc<dyn FileStore>,
    summarizer: Arc<DocumentSummarizer>,
}

impl SummarizeFile {
    pub fn new(store: Arc<dyn FileStore>, summarizer: Arc<DocumentSummarizer>) -> Self {
        Self { store, summarizer }
    }
}

impl Tool for SummarizeFile {
    fn definition(&self) -> ToolDef {
        ToolDef::new(
            "summarize_file",
            "Summarize a text or markdown file from the workspace, preserving technical \
             detail. Works on files of any length. By default the summary is saved next \
             to the input as '<name>_summary.md'.",
            json_schema_for::<SummarizeFileArgs>(),
        )
    }

    fn execute(&self, arguments: &str) -> ToolFuture<'_> {
        let arguments = arguments.to_string();
        Box::pin(async move {
            let args: SummarizeFileArgs = match parse_args(&arguments) {
                Ok(a) => a,
                Err(e) => return e,
            };
            let outcome = workspace::summarize_file(
                self.store.as_ref(),
                &self.summarizer,
                &args.input_file,
                args.output_file.as_deref(),
            )
            .await;
            match outcome {
                Ok(FileSummary::Skipped { .. }) => {
                    "Warning: File is empty, skipping summarization".to_string()
                }
                Ok(FileSummary::Returned { summary }) => summary,
                Ok(FileSummary::Written { path, .. }) => {
                    format!("Summary written to workspace file: {path}")
                }
                Err(e) => match e.summary() {
                    Some(summary) => format!("Error: {e}\n\nFile Summary:\n{summary}"),
                    None => format!("Error: {e}"),
                },
            }
        })
    }
}

// ── ReadFile ────────────────────────────────────────────────────────

/// Read a workspace file, summarizing it past a token threshold.
pub struct ReadFile {
    store: Arc<dyn FileStore>,
    summarizer: Arc<DocumentSummarizer>,
    threshold_tokens: usize,
}

impl ReadFile {
    pub fn new(store: Arc<dyn FileStore>, summarizer: Arc<DocumentSummarizer>) -> Self {
        Self {
            store,
            summarizer,
            threshold_tokens: DEFAULT_READ_THRESHOLD_TOKENS,
        }
    }

    pub fn threshold_tokens(mut self, tokens: usize) -> Self {
        self.threshold_tokens = tokens;
        self
    }
}

impl Tool for ReadFile {
    fn definition(&self) -> ToolDef {
        ToolDef::new(
            "read_file",
            format!(
                "Read a text file from the workspace. Files over {} tokens \
                 are returned as a detailed summary instead of the raw content.",
                self.threshold_tokens
            ),
            json_schema_for::<ReadFileArgs>(),
        )
    }

    fn execute(&self, arguments: &str) -> ToolFuture<'_> {
        let arguments = arguments.to_string();
        Box::pin(async move {
            let args: ReadFileArgs = match parse_args(&arguments) {
                Ok(a) => a,
                Err(e) => return e,
            };
            workspace::read_file(
                self.store.as_ref(),
                &self.summarizer,
                &args.input_file,
                self.threshold_tokens,
            )
            .await
            .unwrap_or_else(|e| format!("Error: {e}"))
        })
    }
}
