//! # Search Logic
//!
//! Retrieval of the context block spliced into the chat prompt. Two strategies
//! implement [`Retriever`]:
//!
//! 1.  **Vector**: embeds the query and asks the store for the nearest chunks.
//! 2.  **Keyword**: scores whole documents by token matches, weighting the
//!     filename far above the body.
//!
//! [`FallbackRetriever`] composes them: the keyword strategy only runs when the
//! vector strategy fails with a recoverable error (embedding or similarity
//! search failure). Storage errors are not swallowed.

use crate::{
    errors::PromptError,
    extract::truncate_chars,
    prompts::retrieval::{no_matching_documents, EMPTY_KNOWLEDGE_BASE, NO_RELEVANT_CHUNKS},
    providers::{
        ai::Embedder,
        db::storage::{DocumentStore, VectorSearch},
    },
    types::ChunkMatch,
};
use async_trait::async_trait;
use serde::Serialize;
use std::{collections::HashSet, fmt::Debug, sync::Arc};
use thiserror::Error;
use tracing::{debug, info, warn};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Custom error types for the search process.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Embedding generation failed: {0}")]
    Embedding(PromptError),
    #[error("Similarity search failed: {0}")]
    VectorSearch(PromptError),
    #[error("Storage error: {0}")]
    Storage(PromptError),
}

impl SearchError {
    /// Failures that the keyword strategy can stand in for.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SearchError::Embedding(_) | SearchError::VectorSearch(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    Vector,
    Keyword,
}

/// Formatted text handed to the prompt builder, plus where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextBlock {
    pub text: String,
    pub strategy: SearchStrategy,
    /// Chunks or documents included in `text`.
    pub matches: usize,
}

#[async_trait]
pub trait Retriever: Send + Sync + Debug {
    async fn search(&self, query: &str) -> Result<ContextBlock, SearchError>;
}

// --- Vector strategy ---

#[derive(Debug, Clone)]
pub struct VectorRetriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorSearch>,
    top_k: u32,
}

impl VectorRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorSearch>, top_k: u32) -> Self {
        Self {
            embedder,
            index,
            top_k,
        }
    }
}

/// `=== TRECHO i: file (Página p) (Similaridade: x.x%) ===` blocks, numbered from 1.
pub fn format_chunk_matches(matches: &[ChunkMatch]) -> String {
    matches
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let page = m
                .page
                .map(|p| format!(" (Página {p})"))
                .unwrap_or_default();
            format!(
                "=== TRECHO {}: {}{} (Similaridade: {:.1}%) ===\n{}\n=== FIM DO TRECHO ===",
                i + 1,
                m.filename,
                page,
                m.similarity * 100.0,
                m.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl Retriever for VectorRetriever {
    async fn search(&self, query: &str) -> Result<ContextBlock, SearchError> {
        let embedding = self
            .embedder
            .embed(query)
            .await
            .map_err(SearchError::Embedding)?;

        let matches = self
            .index
            .similarity_search(&embedding, self.embedder.model_name(), self.top_k)
            .await
            .map_err(SearchError::VectorSearch)?;
        info!("Vector search returned {} chunks", matches.len());

        if matches.is_empty() {
            return Ok(ContextBlock {
                text: NO_RELEVANT_CHUNKS.to_string(),
                strategy: SearchStrategy::Vector,
                matches: 0,
            });
        }

        Ok(ContextBlock {
            text: format_chunk_matches(&matches),
            strategy: SearchStrategy::Vector,
            matches: matches.len(),
        })
    }
}

// --- Keyword strategy ---

const STOP_WORDS: &[&str] = &[
    "que", "para", "com", "uma", "umas", "uns", "dos", "das", "nos", "nas", "por", "pelo",
    "pela", "pelos", "pelas", "como", "mais", "mas", "sao", "ser", "sera", "foi", "tem",
    "temos", "tenho", "ter", "sobre", "qual", "quais", "quem", "onde", "quando", "porque",
    "esta", "este", "estes", "estas", "isso", "isto", "essa", "esse", "essas", "esses",
    "aquele", "aquela", "seu", "sua", "seus", "suas", "meu", "minha", "meus", "minhas",
    "voce", "voces", "nao", "sim", "ele", "ela", "eles", "elas", "nosso", "nossa", "pode",
    "posso", "podem", "existe", "existem", "ate", "apos", "entre", "muito", "muita",
    "todos", "todas", "cada", "algum", "alguma", "aos", "the", "and", "for", "are", "what",
    "how", "fazer", "faz", "preciso",
];

/// Lowercases and strips diacritics (`Férias` → `ferias`).
pub fn normalize_for_search(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Normalized query tokens longer than two characters that are not stop-words,
/// deduplicated in order of first appearance.
pub fn query_tokens(query: &str) -> Vec<String> {
    let normalized = normalize_for_search(query);
    let mut seen = HashSet::new();
    normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 2 && !STOP_WORDS.contains(t))
        .filter(|t| seen.insert(t.to_string()))
        .map(str::to_string)
        .collect()
}

/// Occurrences of `token` in `text` not touching another alphanumeric character.
fn word_matches(text: &str, token: &str) -> usize {
    text.match_indices(token)
        .filter(|(start, _)| {
            let before = text[..*start].chars().next_back();
            let after = text[start + token.len()..].chars().next();
            !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
        })
        .count()
}

/// Relevance of one document to the query tokens.
///
/// Per token: `10` per whole-word match in the content, `5` if it occurs in the
/// content at all, `30` per whole-word match in the filename and `10` if it
/// occurs in the filename at all. Both texts must already be normalized.
pub fn score_document(tokens: &[String], filename: &str, content: &str) -> usize {
    tokens
        .iter()
        .map(|token| {
            let mut score = 10 * word_matches(content, token);
            if content.contains(token.as_str()) {
                score += 5;
            }
            score += 30 * word_matches(filename, token);
            if filename.contains(token.as_str()) {
                score += 10;
            }
            score
        })
        .sum()
}

#[derive(Debug, Clone)]
pub struct KeywordRetriever {
    documents: Arc<dyn DocumentStore>,
    top_n: usize,
    content_chars: usize,
}

impl KeywordRetriever {
    pub fn new(documents: Arc<dyn DocumentStore>, top_n: usize, content_chars: usize) -> Self {
        Self {
            documents,
            top_n,
            content_chars,
        }
    }
}

#[async_trait]
impl Retriever for KeywordRetriever {
    async fn search(&self, query: &str) -> Result<ContextBlock, SearchError> {
        let documents = self
            .documents
            .all_documents()
            .await
            .map_err(SearchError::Storage)?;

        if documents.is_empty() {
            return Ok(ContextBlock {
                text: EMPTY_KNOWLEDGE_BASE.to_string(),
                strategy: SearchStrategy::Keyword,
                matches: 0,
            });
        }

        let tokens = query_tokens(query);
        debug!("Keyword search tokens: {:?}", tokens);

        let mut scored: Vec<_> = documents
            .iter()
            .map(|doc| {
                let score = score_document(
                    &tokens,
                    &normalize_for_search(&doc.filename),
                    &normalize_for_search(&doc.content),
                );
                (score, doc)
            })
            .filter(|(score, _)| *score > 0)
            .collect();
        scored.sort_by(|(a, da), (b, db)| b.cmp(a).then_with(|| da.filename.cmp(&db.filename)));
        scored.truncate(self.top_n);
        info!("Keyword search matched {} documents", scored.len());

        if scored.is_empty() {
            let filenames: Vec<String> = documents.iter().map(|d| d.filename.clone()).collect();
            return Ok(ContextBlock {
                text: no_matching_documents(&filenames),
                strategy: SearchStrategy::Keyword,
                matches: 0,
            });
        }

        let text = scored
            .iter()
            .map(|(score, doc)| {
                let (content, _) = truncate_chars(&doc.content, self.content_chars);
                format!(
                    "=== DOCUMENTO: {} (Relevância: {}) ===\n{}\n=== FIM DO DOCUMENTO ===",
                    doc.filename, score, content
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        Ok(ContextBlock {
            text,
            strategy: SearchStrategy::Keyword,
            matches: scored.len(),
        })
    }
}

// --- Fallback combinator ---

/// Tries `primary`; on a recoverable failure, answers with `secondary` instead.
#[derive(Debug, Clone)]
pub struct FallbackRetriever {
    primary: Arc<dyn Retriever>,
    secondary: Arc<dyn Retriever>,
}

impl FallbackRetriever {
    pub fn new(primary: Arc<dyn Retriever>, secondary: Arc<dyn Retriever>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl Retriever for FallbackRetriever {
    async fn search(&self, query: &str) -> Result<ContextBlock, SearchError> {
        match self.primary.search(query).await {
            Ok(block) => Ok(block),
            Err(e) if e.is_recoverable() => {
                warn!("Primary retrieval failed, falling back: {e}");
                self.secondary.search(query).await
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_strips_accents_and_case() {
        assert_eq!(normalize_for_search("Férias e AÇÕES"), "ferias e acoes");
    }

    #[test]
    fn tokens_drop_stop_words_and_short_words() {
        assert_eq!(
            query_tokens("Quais são as regras de férias? Férias!"),
            vec!["regras".to_string(), "ferias".to_string()]
        );
    }

    #[test]
    fn word_matches_respect_boundaries() {
        assert_eq!(word_matches("ferias, feriasx ferias_2025", "ferias"), 2);
        assert_eq!(word_matches("preferias", "ferias"), 0);
    }

    #[test]
    fn filename_hit_outranks_single_body_hit() {
        let tokens = vec!["ferias".to_string()];
        let by_name = score_document(&tokens, "politica_ferias.pdf", "regras gerais");
        let by_body = score_document(&tokens, "manual.pdf", "direito a ferias anuais");
        assert_eq!(by_name, 40);
        assert_eq!(by_body, 15);
        assert!(by_name > by_body);
    }

    #[test]
    fn chunk_blocks_show_page_only_when_known() {
        let matches = vec![
            ChunkMatch {
                document_id: "d".into(),
                filename: "a.pdf".into(),
                content: "texto".into(),
                page: Some(2),
                similarity: 0.8766,
            },
            ChunkMatch {
                document_id: "d".into(),
                filename: "b.txt".into(),
                content: "outro".into(),
                page: None,
                similarity: 0.5,
            },
        ];
        let text = format_chunk_matches(&matches);
        assert!(text.starts_with("=== TRECHO 1: a.pdf (Página 2) (Similaridade: 87.7%) ===\ntexto\n=== FIM DO TRECHO ==="));
        assert!(text.contains("=== TRECHO 2: b.txt (Similaridade: 50.0%) ==="));
    }
}
