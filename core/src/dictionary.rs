use crate::config::TextConfig;
use crate::document::{Document, ProcessedDocument};
use std::collections::HashSet;

/// Declared vocabulary of a collection plus its processed documents.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    pub processed: Vec<ProcessedDocument>,
    /// Distinct tokens in first-seen order.
    pub terms: Vec<String>,
}

impl Dictionary {
    pub fn build(docs: &[Document], config: &TextConfig) -> Self {
        let mut seen: HashSet<String> = HashSet::new();
        let mut terms = Vec::new();
        let mut processed = Vec::with_capacity(docs.len());
        for doc in docs {
            let p = ProcessedDocument::from_document(doc, config);
            for token in p.tokens() {
                if seen.insert(token.clone()) {
                    terms.push(token);
                }
            }
            processed.push(p);
        }
        tracing::info!(num_docs = processed.len(), num_terms = terms.len(), "dictionary built");
        Self { processed, terms }
    }

    pub fn from_parts(processed: Vec<ProcessedDocument>, terms: Vec<String>) -> Self {
        Self { processed, terms }
    }

    pub fn len(&self) -> usize { self.terms.len() }

    pub fn is_empty(&self) -> bool { self.terms.is_empty() }
}
