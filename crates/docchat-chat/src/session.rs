//! One user's working state: the indexed documents, the chat history and the
//! last suggested questions. A session is created with its collaborators,
//! mutated only through `&mut self` and never shared with another session.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use docchat_core::chunker::Chunker;
use docchat_core::error::{Error, Result};
use docchat_core::types::{ChatTurn, ChunkMetadata, FileType, QueryResult, Role, StoreStats};
use docchat_extract::TextExtractor;
use docchat_vector::VectorStore;

use crate::answer::AnswerGenerator;

/// Query used to sample representative chunks for question suggestions.
pub const SUGGESTION_QUERY: &str = "summary main topics";
const SUGGESTION_SAMPLE: usize = 3;
const PREVIEW_CHARS: usize = 300;

/// An uploaded file: its name (the extension picks the extractor) and bytes.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), bytes }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| Error::NotFound(path.display().to_string()))?;
        Ok(Self { name, bytes: fs::read(path)? })
    }
}

/// Read every path as an upload. Files that cannot be read are returned as
/// skipped instead of failing the batch.
pub fn read_uploads(paths: &[PathBuf]) -> (Vec<Upload>, Vec<SkippedFile>) {
    let mut uploads = Vec::with_capacity(paths.len());
    let mut skipped = Vec::new();
    for path in paths {
        match Upload::from_path(path) {
            Ok(upload) => uploads.push(upload),
            Err(e) => {
                warn!(file = %path.display(), "failed to read file: {}", e);
                skipped.push(SkippedFile { file: path.display().to_string(), reason: e.to_string() });
            }
        }
    }
    (uploads, skipped)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedFile {
    pub file: String,
    pub chunks: usize,
    pub characters: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub file: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessingReport {
    pub processed: Vec<ProcessedFile>,
    pub skipped: Vec<SkippedFile>,
    pub warnings: Vec<String>,
    pub total_chunks: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Analytics {
    pub total_messages: usize,
    pub questions_asked: usize,
    pub searchable_chunks: usize,
    pub total_characters: usize,
}

/// A source line shown under an answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourcePreview {
    pub label: String,
    pub preview: String,
}

/// Result of one question: the assistant turn that went into the history
/// and the retrieved chunks it was grounded on.
#[derive(Debug, Clone)]
pub struct Reply {
    pub turn: ChatTurn,
    pub context: Vec<QueryResult>,
    pub previews: Vec<SourcePreview>,
}

pub struct Session {
    extractor: TextExtractor,
    chunker: Chunker,
    store: VectorStore,
    answers: AnswerGenerator,
    top_k: usize,
    history: Vec<ChatTurn>,
    processed: Vec<ProcessedFile>,
    suggested_questions: Vec<String>,
}

impl Session {
    pub fn new(store: VectorStore, answers: AnswerGenerator, chunker: Chunker, top_k: usize) -> Self {
        Self {
            extractor: TextExtractor::new(),
            chunker,
            store,
            answers,
            top_k: top_k.max(1),
            history: Vec::new(),
            processed: Vec::new(),
            suggested_questions: Vec::new(),
        }
    }

    pub fn history(&self) -> &[ChatTurn] { &self.history }

    pub fn processed_files(&self) -> &[ProcessedFile] { &self.processed }

    pub fn suggested_questions(&self) -> &[String] { &self.suggested_questions }

    pub fn store(&self) -> &VectorStore { &self.store }

    pub fn has_documents(&self) -> bool { !self.store.is_empty() }

    /// Extract, chunk and index a batch of uploads, replacing whatever the
    /// session held before.
    ///
    /// Unsupported or empty files are skipped and listed in the report. If
    /// nothing in the batch produced a chunk the call fails with
    /// `Error::NoContent` and the previous documents stay searchable; the same
    /// holds for an embedding failure.
    pub fn process_documents(&mut self, uploads: &[Upload]) -> Result<ProcessingReport> {
        let mut report = ProcessingReport::default();
        let mut chunks = Vec::new();

        for upload in uploads {
            let file_type = match FileType::from_file_name(&upload.name) {
                Ok(file_type) => file_type,
                Err(e) => {
                    error!(file = %upload.name, "{}", e);
                    report.skipped.push(SkippedFile { file: upload.name.clone(), reason: e.to_string() });
                    continue;
                }
            };
            let extraction = self.extractor.extract(&upload.bytes, file_type);
            report
                .warnings
                .extend(extraction.warnings.iter().map(|w| format!("{}: {}", upload.name, w)));

            let doc_chunks = self.chunker.chunk_document(&extraction.text, &upload.name, file_type);
            if doc_chunks.is_empty() {
                warn!(file = %upload.name, "no text extracted");
                report
                    .skipped
                    .push(SkippedFile { file: upload.name.clone(), reason: "no text could be extracted".to_string() });
                continue;
            }
            report.processed.push(ProcessedFile {
                file: upload.name.clone(),
                chunks: doc_chunks.len(),
                characters: extraction.text.chars().count(),
            });
            chunks.extend(doc_chunks);
        }

        if chunks.is_empty() {
            return Err(Error::NoContent);
        }
        report.total_chunks = self.store.rebuild(chunks)?;

        self.history.clear();
        self.suggested_questions.clear();
        self.processed = report.processed.clone();
        info!(
            files = report.processed.len(),
            skipped = report.skipped.len(),
            chunks = report.total_chunks,
            "processed documents"
        );
        Ok(report)
    }

    /// Record the question, retrieve context, generate an answer and record
    /// it with its sources. Retrieval failures fall back to an answer
    /// without document context.
    pub fn ask(&mut self, question: &str) -> Reply {
        self.history.push(ChatTurn::user(question));

        let context = self.store.search(question, self.top_k).unwrap_or_default();
        let content = self.answers.answer(question, &context);

        let cited = &context[..context.len().min(self.answers.context_chunks())];
        let sources = (!cited.is_empty()).then(|| cited.iter().map(source_label).collect::<Vec<_>>());
        let previews = cited
            .iter()
            .map(|r| SourcePreview { label: source_label(r), preview: preview(&r.text, PREVIEW_CHARS) })
            .collect();

        let turn = ChatTurn::assistant(content, sources);
        self.history.push(turn.clone());
        Reply { turn, context, previews }
    }

    /// Suggest questions about the indexed documents and remember them.
    pub fn suggest_questions(&mut self) -> &[String] {
        if self.store.is_empty() {
            self.suggested_questions.clear();
            return &self.suggested_questions;
        }
        let mut sample = self.store.search(SUGGESTION_QUERY, SUGGESTION_SAMPLE).unwrap_or_default();
        if sample.is_empty() {
            sample = self
                .store
                .entries()
                .iter()
                .take(SUGGESTION_SAMPLE)
                .enumerate()
                .map(|(i, entry)| QueryResult {
                    text: entry.text.clone(),
                    similarity: 1.0,
                    metadata: ChunkMetadata { source: format!("Document {}", i + 1), ..entry.metadata.clone() },
                })
                .collect();
        }
        self.suggested_questions = self.answers.suggest_questions(&sample);
        &self.suggested_questions
    }

    /// Extract one upload and summarize it without touching the index.
    pub fn summarize(&self, upload: &Upload) -> Result<String> {
        let extraction = self.extractor.process_upload(&upload.name, &upload.bytes)?;
        if extraction.is_empty() {
            return Err(Error::NoContent);
        }
        Ok(self.answers.summarize(&extraction.text))
    }

    /// Drop documents, history and suggestions.
    pub fn reset(&mut self) {
        self.store.clear();
        self.history.clear();
        self.processed.clear();
        self.suggested_questions.clear();
        info!("session cleared");
    }

    pub fn analytics(&self) -> Analytics {
        Analytics {
            total_messages: self.history.len(),
            questions_asked: self.history.iter().filter(|t| t.role == Role::User).count(),
            searchable_chunks: self.store.stats().total_chunks,
            total_characters: self.processed.iter().map(|p| p.characters).sum(),
        }
    }

    pub fn stats(&self) -> StoreStats { self.store.stats() }

    pub fn save_index(&self, prefix: &Path) -> Result<()> { self.store.persist(prefix) }

    /// Load a saved index. The previous documents are replaced, so the chat
    /// history and suggestions are dropped too. On error nothing changes.
    pub fn load_index(&mut self, prefix: &Path) -> Result<()> {
        self.store.restore(prefix)?;
        self.history.clear();
        self.processed.clear();
        self.suggested_questions.clear();
        Ok(())
    }
}

/// `"{source} - Relevance: {score}"`, with `Unknown` for a missing source.
pub fn source_label(result: &QueryResult) -> String {
    let source = if result.source().is_empty() { "Unknown" } else { result.source() };
    format!("{} - Relevance: {:.2}", source, result.similarity)
}

/// Cut `text` to `max_chars` characters, marking the cut with `...`.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
