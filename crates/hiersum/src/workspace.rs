//! Workspace files: loading documents, summarizing them, saving summaries.
//!
//! All paths are relative to a [`FileStore`]. [`LocalFileStore`] maps them
//! onto a directory and refuses anything that would escape it.

use crate::error::WorkspaceError;
use crate::summarizer::DocumentSummarizer;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

/// Plain-text extensions that are summarized as UTF-8.
pub const TEXT_FILE_TYPES: &[&str] = &[
    ".md", ".txt", ".markdown", ".text", ".mdx", ".mdtxt", ".mdtxtx",
];

/// Document formats that need an external text converter first.
pub const KNOWLEDGE_FILE_TYPES: &[&str] = &[
    ".docx", ".doc", ".pdf", ".pptx", ".ppt", ".html", ".htm", ".ipynb",
];

/// Token count up to which [`read_file`] returns content verbatim.
pub const DEFAULT_READ_THRESHOLD_TOKENS: usize = 10_000;

/// Largest file, in bytes, that [`LocalFileStore`] will read.
pub const MAX_FILE_SIZE: u64 = 100_000_000;

/// `output` value that sends the summary to stdout instead of a file.
pub const STDOUT_OUTPUT: &str = "NONE";

pub type StoreFuture<'a, T> = BoxFuture<'a, Result<T, WorkspaceError>>;

/// Byte storage addressed by workspace-relative paths.
pub trait FileStore: Send + Sync {
    fn read<'a>(&'a self, path: &'a str) -> StoreFuture<'a, Vec<u8>>;

    /// Create or replace `path`, creating parent directories as needed.
    fn write<'a>(&'a self, path: &'a str, contents: &'a str) -> StoreFuture<'a, ()>;
}

/// [`FileStore`] over a local directory.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
    max_file_size: u64,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_file_size: MAX_FILE_SIZE,
        }
    }

    /// Refuse to read files larger than `bytes`. Defaults to [`MAX_FILE_SIZE`].
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join `path` onto the root. Absolute paths and `..` are rejected.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, WorkspaceError> {
        let relative = Path::new(path);
        let escapes = relative.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes || path.is_empty() {
            return Err(WorkspaceError::OutsideRoot(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl FileStore for LocalFileStore {
    fn read<'a>(&'a self, path: &'a str) -> StoreFuture<'a, Vec<u8>> {
        async move {
            let full = self.resolve(path)?;
            let io_err = |source| WorkspaceError::Io {
                path: path.to_string(),
                source,
            };
            let size = fs::metadata(&full).await.map_err(io_err)?.len();
            if size > self.max_file_size {
                return Err(WorkspaceError::TooLarge {
                    path: path.to_string(),
                    size,
                    limit: self.max_file_size,
                });
            }
            fs::read(&full).await.map_err(io_err)
        }
        .boxed()
    }

    fn write<'a>(&'a self, path: &'a str, contents: &'a str) -> StoreFuture<'a, ()> {
        async move {
            let full = self.resolve(path)?;
            let io_err = |source| WorkspaceError::Io {
                path: path.to_string(),
                source,
            };
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent).await.map_err(io_err)?;
            }
            fs::write(&full, contents).await.map_err(io_err)
        }
        .boxed()
    }
}

fn has_extension(path: &str, types: &[&str]) -> bool {
    let lower = path.to_ascii_lowercase();
    types.iter().any(|ext| lower.ends_with(ext))
}

async fn read_utf8(store: &dyn FileStore, path: &str) -> Result<String, WorkspaceError> {
    let bytes = store.read(path).await?;
    String::from_utf8(bytes).map_err(|_| WorkspaceError::InvalidUtf8(path.to_string()))
}

/// Load a document for summarization. Only [`TEXT_FILE_TYPES`] are accepted.
pub async fn load_text(store: &dyn FileStore, path: &str) -> Result<String, WorkspaceError> {
    if has_extension(path, KNOWLEDGE_FILE_TYPES) {
        return Err(WorkspaceError::RequiresConversion(path.to_string()));
    }
    if !has_extension(path, TEXT_FILE_TYPES) {
        return Err(WorkspaceError::UnsupportedFileType(format!(
            "{path} (supported: {})",
            TEXT_FILE_TYPES.join(", ")
        )));
    }
    read_utf8(store, path).await
}

/// Load any workspace file that is not a knowledge document as UTF-8 text.
///
/// Looser than [`load_text`]: config files, source code and logs are all
/// readable.
pub async fn load_any_text(store: &dyn FileStore, path: &str) -> Result<String, WorkspaceError> {
    if has_extension(path, KNOWLEDGE_FILE_TYPES) {
        return Err(WorkspaceError::RequiresConversion(path.to_string()));
    }
    read_utf8(store, path).await
}

/// `<dir>/<stem>_summary.md` next to `input`.
pub fn default_summary_path(input: &str) -> String {
    let path = Path::new(input);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = format!("{stem}_summary.md");
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(name).to_string_lossy().into_owned(),
        _ => name,
    }
}

/// What [`summarize_file`] did with the summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSummary {
    /// The input was empty; nothing was summarized.
    Skipped { input: String },
    /// The caller asked for the summary back instead of a file.
    Returned { summary: String },
    /// The summary was saved to `path`.
    Written { path: String, summary: String },
}

/// Summarize a workspace file.
///
/// `output` of `None` or `""` writes next to the input (see
/// [`default_summary_path`]); [`STDOUT_OUTPUT`] (any case) returns the
/// summary without writing; anything else is the target path.
pub async fn summarize_file(
    store: &dyn FileStore,
    summarizer: &DocumentSummarizer,
    input: &str,
    output: Option<&str>,
) -> Result<FileSummary, WorkspaceError> {
    let content = load_text(store, input).await?;
    if content.is_empty() {
        warn!("File {input} is empty, skipping summarization");
        return Ok(FileSummary::Skipped {
            input: input.to_string(),
        });
    }

    let summary = summarizer.summarize(&content).await?;

    let target = match output {
        Some(o) if o.eq_ignore_ascii_case(STDOUT_OUTPUT) => {
            return Ok(FileSummary::Returned { summary });
        }
        Some(o) if !o.is_empty() => o.to_string(),
        _ => default_summary_path(input),
    };
    if let Err(source) = store.write(&target, &summary).await {
        return Err(WorkspaceError::SaveFailed {
            path: target,
            summary,
            source: Box::new(source),
        });
    }
    info!("Summary written to workspace file: {target}");
    Ok(FileSummary::Written {
        path: target,
        summary,
    })
}

/// Read a workspace file for an agent, summarizing it if it is too large.
///
/// Any non-knowledge file is read (see [`load_any_text`]). Content of at most `threshold_tokens` tokens is returned as is. Larger
/// files are summarized and the summary is returned behind a short header
/// naming the file and its size.
pub async fn read_file(
    store: &dyn FileStore,
    summarizer: &DocumentSummarizer,
    input: &str,
    threshold_tokens: usize,
) -> Result<String, WorkspaceError> {
    let content = load_any_text(store, input).await?;
    let tokens = summarizer.tokenizer().token_count(&content)?;
    if tokens <= threshold_tokens {
        return Ok(content);
    }

    info!("{input} has {tokens} tokens, summarizing");
    let summary = summarizer.summarize(&content).await?;
    Ok(format!(
        "Uploaded file {input} contains {tokens} tokens.\n\nSummary of the file content:\n\n{summary}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SummarizerOptions;
    use crate::testing::{CharTokenizer, FakeCompletion};
    use std::sync::Arc;

    fn summarizer(fake: Arc<FakeCompletion>) -> DocumentSummarizer {
        DocumentSummarizer::new(
            SummarizerOptions::default()
                .with_max_chunk_tokens(100)
                .with_verbose(false)
                .build()
                .unwrap(),
            Arc::new(CharTokenizer),
            fake,
        )
    }

    fn store_with(files: &[(&str, &str)]) -> (tempfile::TempDir, LocalFileStore) {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in files {
            let path = dir.path().join(name);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, body).unwrap();
        }
        let store = LocalFileStore::new(dir.path());
        (dir, store)
    }

    /// Reads from a local directory, fails every write.
    struct ReadOnlyStore(LocalFileStore);

    impl FileStore for ReadOnlyStore {
        fn read<'a>(&'a self, path: &'a str) -> StoreFuture<'a, Vec<u8>> {
            self.0.read(path)
        }

        fn write<'a>(&'a self, path: &'a str, _contents: &'a str) -> StoreFuture<'a, ()> {
            async move {
                Err(WorkspaceError::Io {
                    path: path.to_string(),
                    source: std::io::Error::other("disk full"),
                })
            }
            .boxed()
        }
    }

    #[test]
    fn resolve_rejects_escapes() {
        let store = LocalFileStore::new("/ws");
        assert_eq!(store.resolve("a/b.md").unwrap(), PathBuf::from("/ws/a/b.md"));
        for bad in ["../secret.md", "a/../../b.md", "/etc/passwd", ""] {
            assert!(
                matches!(store.resolve(bad), Err(WorkspaceError::OutsideRoot(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn summary_path_sits_next_to_input() {
        assert_eq!(default_summary_path("report.txt"), "report_summary.md");
        assert_eq!(default_summary_path("docs/notes.mdx"), "docs/notes_summary.md");
    }

    #[tokio::test]
    async fn load_text_checks_file_type() {
        let (_dir, store) = store_with(&[("a.md", "hello"), ("b.pdf", "%PDF"), ("c.rs", "fn")]);

        assert_eq!(load_text(&store, "a.md").await.unwrap(), "hello");
        assert!(matches!(
            load_text(&store, "b.pdf").await,
            Err(WorkspaceError::RequiresConversion(_))
        ));
        assert!(matches!(
            load_text(&store, "c.rs").await,
            Err(WorkspaceError::UnsupportedFileType(_))
        ));
        assert!(matches!(
            load_text(&store, "missing.txt").await,
            Err(WorkspaceError::Io { .. })
        ));
    }

    #[tokio::test]
    async fn load_text_rejects_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bin.txt"), [0xff, 0xfe, 0x00]).unwrap();
        let store = LocalFileStore::new(dir.path());
        assert!(matches!(
            load_text(&store, "bin.txt").await,
            Err(WorkspaceError::InvalidUtf8(_))
        ));
    }

    #[tokio::test]
    async fn empty_file_is_skipped_without_calls() {
        let (_dir, store) = store_with(&[("empty.md", "")]);
        let fake = Arc::new(FakeCompletion::replying("unused"));

        let outcome = summarize_file(&store, &summarizer(fake.clone()), "empty.md", None)
            .await
            .unwrap();
        assert!(matches!(outcome, FileSummary::Skipped { .. }));
        assert_eq!(fake.call_count(), 0);
    }

    #[tokio::test]
    async fn summary_is_written_to_default_path() {
        let (dir, store) = store_with(&[("docs/guide.md", "short guide")]);
        let fake = Arc::new(FakeCompletion::replying("# Guide summary"));

        let outcome = summarize_file(&store, &summarizer(fake), "docs/guide.md", Some(""))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            FileSummary::Written {
                path: "docs/guide_summary.md".into(),
                summary: "# Guide summary".into(),
            }
        );
        let saved = std::fs::read_to_string(dir.path().join("docs/guide_summary.md")).unwrap();
        assert_eq!(saved, "# Guide summary");
    }

    #[tokio::test]
    async fn none_output_returns_summary() {
        let (dir, store) = store_with(&[("a.txt", "text")]);
        let fake = Arc::new(FakeCompletion::replying("sum"));

        let outcome = summarize_file(&store, &summarizer(fake), "a.txt", Some("none"))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            FileSummary::Returned {
                summary: "sum".into()
            }
        );
        assert!(!dir.path().join("a_summary.md").exists());
    }

    #[tokio::test]
    async fn explicit_output_path_is_used() {
        let (dir, store) = store_with(&[("a.txt", "text")]);
        let fake = Arc::new(FakeCompletion::replying("sum"));

        summarize_file(&store, &summarizer(fake), "a.txt", Some("out/result.md"))
            .await
            .unwrap();
        assert!(dir.path().join("out/result.md").exists());
    }

    #[tokio::test]
    async fn failed_write_keeps_the_summary() {
        let (dir, local) = store_with(&[("a.md", "a long report")]);
        let store = ReadOnlyStore(local);
        let fake = Arc::new(FakeCompletion::replying("HARD-WON SUMMARY"));

        let err = summarize_file(&store, &summarizer(fake.clone()), "a.md", None)
            .await
            .unwrap_err();
        assert!(
            matches!(&err, WorkspaceError::SaveFailed { path, .. } if path == "a_summary.md"),
            "{err:?}"
        );
        assert_eq!(err.summary(), Some("HARD-WON SUMMARY"));
        assert!(err.to_string().contains("disk full"), "{err}");
        assert_eq!(fake.call_count(), 1);
        assert!(!dir.path().join("a_summary.md").exists());
    }

    #[tokio::test]
    async fn oversized_files_are_refused() {
        let (_dir, store) = store_with(&[("big.md", "0123456789"), ("big.log", "0123456789")]);
        let store = store.with_max_file_size(4);
        let fake = Arc::new(FakeCompletion::replying("unused"));

        let err = load_text(&store, "big.md").await.unwrap_err();
        assert!(
            matches!(err, WorkspaceError::TooLarge { size: 10, limit: 4, .. }),
            "{err:?}"
        );
        let err = read_file(&store, &summarizer(fake.clone()), "big.log", 1_000)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkspaceError::TooLarge { .. }), "{err:?}");
        assert_eq!(fake.call_count(), 0);
        assert_eq!(LocalFileStore::new("/ws").max_file_size, MAX_FILE_SIZE);
    }

    #[tokio::test]
    async fn read_file_accepts_any_text_file() {
        let (_dir, store) = store_with(&[
            ("config.yaml", "key: value"),
            ("src/main.rs", "fn main() {}"),
            ("deck.pptx", "PK"),
        ]);
        let fake = Arc::new(FakeCompletion::replying("unused"));
        let summarizer = summarizer(fake.clone());

        let text = read_file(&store, &summarizer, "config.yaml", 100).await.unwrap();
        assert_eq!(text, "key: value");
        let text = read_file(&store, &summarizer, "src/main.rs", 100).await.unwrap();
        assert_eq!(text, "fn main() {}");
        assert!(matches!(
            read_file(&store, &summarizer, "deck.pptx", 100).await,
            Err(WorkspaceError::RequiresConversion(_))
        ));
        assert_eq!(fake.call_count(), 0);

        // Summarizing stays limited to text and markdown.
        assert!(matches!(
            load_text(&store, "config.yaml").await,
            Err(WorkspaceError::UnsupportedFileType(_))
        ));
    }

    #[tokio::test]
    async fn read_file_passes_small_files_through() {
        let (_dir, store) = store_with(&[("small.md", "tiny file")]);
        let fake = Arc::new(FakeCompletion::replying("unused"));

        let text = read_file(&store, &summarizer(fake.clone()), "small.md", 9)
            .await
            .unwrap();
        assert_eq!(text, "tiny file");
        assert_eq!(fake.call_count(), 0);
    }

    #[tokio::test]
    async fn read_file_summarizes_large_files() {
        let body = "y".repeat(50);
        let (_dir, store) = store_with(&[("big.md", &body)]);
        let fake = Arc::new(FakeCompletion::replying("condensed"));

        let text = read_file(&store, &summarizer(fake), "big.md", 10)
            .await
            .unwrap();
        assert_eq!(
            text,
            "Uploaded file big.md contains 50 tokens.\n\nSummary of the file content:\n\ncondensed"
        );
    }
}
