//! Prompt assembly and response handling around a [`Generator`].

use std::sync::Arc;
use tracing::{error, info, warn};

use docchat_core::config::RetrievalSettings;
use docchat_core::error::{Error, Result};
use docchat_core::traits::Generator;
use docchat_core::types::QueryResult;

pub const NO_RESPONSE_FALLBACK: &str =
    "I apologize, but I couldn't generate a response. Please try rephrasing your question.";
pub const GENERATION_ERROR_FALLBACK: &str = "I encountered an error while generating a response. Please try again.";
pub const NO_SUMMARY_FALLBACK: &str = "Could not generate summary.";

/// Characters of a document sent for summarization.
pub const SUMMARY_PREFIX_CHARS: usize = 8000;

const BULLETS: [char; 3] = ['-', '•', '*'];

pub struct AnswerGenerator {
    generator: Arc<dyn Generator>,
    context_chunks: usize,
    suggestion_prefix_chars: usize,
    max_suggestions: usize,
}

impl AnswerGenerator {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self::with_settings(generator, &RetrievalSettings::default())
    }

    pub fn with_settings(generator: Arc<dyn Generator>, settings: &RetrievalSettings) -> Self {
        Self {
            generator,
            context_chunks: settings.context_chunks,
            suggestion_prefix_chars: settings.suggestion_prefix_chars,
            max_suggestions: settings.max_suggestions,
        }
    }

    pub fn context_chunks(&self) -> usize { self.context_chunks }

    pub fn model_id(&self) -> &str { self.generator.model_id() }

    /// Answer `query` from the supplied context. Only the first
    /// `context_chunks` results are used. Never fails: an empty reply or a
    /// service error turns into a fixed apology.
    pub fn answer(&self, query: &str, context: &[QueryResult]) -> String {
        match self.try_answer(query, context) {
            Ok(Some(text)) => text,
            Ok(None) => NO_RESPONSE_FALLBACK.to_string(),
            Err(e) => {
                error!("{}", e);
                GENERATION_ERROR_FALLBACK.to_string()
            }
        }
    }

    /// Like [`answer`](Self::answer) but hands service failures and empty
    /// replies back to the caller.
    pub fn try_answer(&self, query: &str, context: &[QueryResult]) -> Result<Option<String>> {
        let excerpts = format_context(&context[..context.len().min(self.context_chunks)]);
        let prompt = if excerpts.is_empty() { no_context_prompt(query) } else { grounded_prompt(query, &excerpts) };
        info!(context = context.len().min(self.context_chunks), model = self.model_id(), "generating answer");
        self.generate(&prompt).map_err(|e| Error::Generation(format!("{:#}", e)))
    }

    /// Ask for 3-5 follow-up questions about the best-ranked chunk.
    /// Returns an empty list for empty context or any failure.
    pub fn suggest_questions(&self, context: &[QueryResult]) -> Vec<String> {
        let Some(best) = context.first() else {
            return Vec::new();
        };
        let sample = prefix(&best.text, self.suggestion_prefix_chars);
        match self.generate(&suggestion_prompt(sample)) {
            Ok(Some(text)) => parse_questions(&text, self.max_suggestions),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Error generating question suggestions: {:#}", e);
                Vec::new()
            }
        }
    }

    /// Short summary of the start of `text`.
    pub fn summarize(&self, text: &str) -> String {
        match self.generate(&summary_prompt(prefix(text, SUMMARY_PREFIX_CHARS))) {
            Ok(Some(summary)) => summary,
            Ok(None) => NO_SUMMARY_FALLBACK.to_string(),
            Err(e) => format!("Error generating summary: {:#}", e),
        }
    }

    fn generate(&self, prompt: &str) -> anyhow::Result<Option<String>> {
        Ok(self.generator.generate(prompt)?.filter(|t| !t.trim().is_empty()))
    }
}

/// Label each result as a numbered excerpt with its score and source.
pub fn format_context(context: &[QueryResult]) -> String {
    context
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let mut label = format!("**Document Excerpt {}** (Relevance: {:.2})", i + 1, r.similarity);
            if !r.source().is_empty() {
                label.push_str(&format!(" - Source: {}", r.source()));
            }
            format!("{}\n{}", label, r.text)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn grounded_prompt(query: &str, excerpts: &str) -> String {
    format!(
        "You are a document analysis assistant. Answer the question using the document excerpts below.

**DOCUMENT CONTEXT:**
{excerpts}

**USER QUESTION:** {query}

**INSTRUCTIONS:**
1. Base the answer on the document context above
2. Be specific and cite the excerpts you rely on
3. Say plainly which information is missing if the excerpts do not cover the question
4. Quote the documents directly where a quote supports the answer
5. Mark any inference as an inference
6. Keep a clear, professional tone

**RESPONSE:**"
    )
}

pub fn no_context_prompt(query: &str) -> String {
    format!(
        "You are a helpful assistant. The user asked a question about their documents, but no relevant document context was found in the uploaded files.

**USER QUESTION:** {query}

Answer as helpfully as you can, and state clearly that you have no document context to reference. General information about the topic is fine, but point out that limitation.

**RESPONSE:**"
    )
}

pub fn suggestion_prompt(sample: &str) -> String {
    format!(
        "Based on this document excerpt, suggest 3-5 questions a reader might ask. Focus on the main topics and the most important information.

**DOCUMENT EXCERPT:**
{sample}

**SUGGESTED QUESTIONS:**
List one question per line."
    )
}

pub fn summary_prompt(document: &str) -> String {
    format!(
        "Write a concise summary of the following document. Cover the main points, key findings and important details.

**DOCUMENT:**
{document}

**SUMMARY:**"
    )
}

/// Pull questions out of a free-form reply: bulleted lines (marker
/// stripped) and lines ending in `?`, at most `max` of them.
pub fn parse_questions(reply: &str, max: usize) -> Vec<String> {
    reply
        .lines()
        .map(str::trim)
        .filter_map(|line| {
            if let Some(rest) = line.strip_prefix(BULLETS) {
                let question = rest.trim();
                (!question.is_empty()).then(|| question.to_string())
            } else if line.ends_with('?') {
                Some(line.to_string())
            } else {
                None
            }
        })
        .take(max)
        .collect()
}

/// First `max_chars` characters of `text`.
pub fn prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
