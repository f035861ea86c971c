//! Retrievers rank a fixed corpus of documents against a query.

use std::collections::HashSet;
use log::debug;

/// Default number of documents a retriever returns.
pub const DEFAULT_TOP_K: usize = 3;

/// Anything that returns the `k` most relevant documents for a query, best first.
pub trait Retrieve {
    fn retrieve<'a>(&'a self, query: &str, k: usize) -> Vec<&'a str>;
}

/// A document paired with its relevance score for one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoredDocument<'a> {
    pub score: usize,
    /// Position of the document in the corpus.
    pub index: usize,
    pub document: &'a str,
}

/// Lowercases and splits on whitespace, collapsing duplicate words.
pub fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Lexical retriever scoring documents by the number of distinct words they share with the query.
///
/// The corpus is fixed at construction. Documents sharing no word with the query are never returned, and
/// documents with equal scores keep their corpus order.
#[derive(Debug, Clone, Default)]
pub struct KeywordRetriever {
    documents: Vec<String>,
}

impl KeywordRetriever {
    pub fn new(documents: Vec<String>) -> Self {
        Self { documents }
    }

    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    /// Score every document against the query and rank the ones with a positive score.
    pub fn score(&self, query: &str) -> Vec<ScoredDocument<'_>> {
        let query_words = tokenize(query);
        if query_words.is_empty() {
            return Vec::new();
        }
        let mut scored: Vec<ScoredDocument> = self.documents
            .iter()
            .enumerate()
            .filter_map(|(index, document)| {
                let score = tokenize(document).intersection(&query_words).count();
                (score > 0).then_some(ScoredDocument { score, index, document: document.as_str() })
            })
            .collect();
        // stable, so ties stay in corpus order
        scored.sort_by(|a, b| b.score.cmp(&a.score));
        scored
    }
}

impl<S: Into<String>> FromIterator<S> for KeywordRetriever {
    fn from_iter<T: IntoIterator<Item=S>>(iter: T) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

impl Retrieve for KeywordRetriever {
    fn retrieve<'a>(&'a self, query: &str, k: usize) -> Vec<&'a str> {
        if k == 0 {
            return Vec::new();
        }
        let ranked = self.score(query);
        debug!("retrieved {} of {} matching documents for query {:?}", ranked.len().min(k), ranked.len(), query);
        ranked.into_iter()
            .take(k)
            .map(|scored| scored.document)
            .collect()
    }
}
