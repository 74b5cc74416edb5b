//! Flat topic-label list and topic filtering of results.
//!
//! Topics never influence ranking or boolean evaluation; they only narrow a
//! result list after the fact. Labels and document topics go through the same
//! text pipeline and are compared as whole tokens.

use crate::config::TextConfig;
use crate::document::Document;
use crate::error::Result;
use crate::index::DocId;
use crate::ranking::ScoredDoc;
use crate::tokenizer::tokenize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Read one label per line and normalize them with the collection's pipeline.
pub fn load_topics<P: AsRef<Path>>(path: P, config: &TextConfig) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)?;
    let topics = parse_topics(&text, config);
    tracing::info!(num_topics = topics.len(), "topic list loaded");
    Ok(topics)
}

/// One normalized label per non-blank line, first occurrence kept.
///
/// A line the pipeline reduces to several tokens is kept as one label, its
/// tokens joined by a space.
pub fn parse_topics(text: &str, config: &TextConfig) -> Vec<String> {
    let mut seen = HashSet::new();
    text.lines()
        .filter_map(|line| normalize_label(line, config))
        .filter(|label| seen.insert(label.clone()))
        .collect()
}

fn normalize_label(label: &str, config: &TextConfig) -> Option<String> {
    let tokens = tokenize(label, config);
    if tokens.is_empty() { None } else { Some(tokens.join(" ")) }
}

/// Normalized topic tokens of every document, built once per snapshot.
#[derive(Debug, Clone, Default)]
pub struct TopicIndex {
    config: TextConfig,
    topics: HashMap<DocId, HashSet<String>>,
}

impl TopicIndex {
    pub fn build(docs: &[Document], config: &TextConfig) -> Self {
        let topics = docs
            .iter()
            .filter(|d| !d.topic.trim().is_empty())
            .map(|d| (d.id, tokenize(&d.topic, config).into_iter().collect()))
            .collect();
        Self { config: *config, topics }
    }

    /// Normalize one raw label into its list form; `None` if nothing is left.
    pub fn normalize(&self, label: &str) -> Option<String> {
        normalize_label(label, &self.config)
    }

    /// Filter over raw labels, normalized like the document topics.
    pub fn filter<S: AsRef<str>>(&self, selected: &[S]) -> TopicFilter<'_> {
        let labels: Vec<String> = selected.iter().filter_map(|s| self.normalize(s.as_ref())).collect();
        self.filter_labels(&labels)
    }

    /// Filter over labels that are already normalized, e.g. from [`parse_topics`].
    pub fn filter_labels<S: AsRef<str>>(&self, labels: &[S]) -> TopicFilter<'_> {
        let selected = labels
            .iter()
            .map(|l| l.as_ref().split_whitespace().map(str::to_string).collect::<Vec<_>>())
            .filter(|tokens| !tokens.is_empty())
            .collect();
        TopicFilter { index: self, selected }
    }
}

/// Documents whose topic holds every token of at least one selected label.
pub struct TopicFilter<'a> {
    index: &'a TopicIndex,
    selected: Vec<Vec<String>>,
}

impl<'a> TopicFilter<'a> {
    /// No selection means no filtering.
    pub fn is_active(&self) -> bool { !self.selected.is_empty() }

    pub fn matches(&self, doc_id: DocId) -> bool {
        if !self.is_active() {
            return true;
        }
        let Some(topic) = self.index.topics.get(&doc_id) else { return false };
        self.selected.iter().any(|label| label.iter().all(|t| topic.contains(t)))
    }

    pub fn filter_ids(&self, ids: Vec<DocId>) -> Vec<DocId> {
        ids.into_iter().filter(|&d| self.matches(d)).collect()
    }

    /// Keeps rank order.
    pub fn filter_scored(&self, hits: Vec<ScoredDoc>) -> Vec<ScoredDoc> {
        hits.into_iter().filter(|h| self.matches(h.doc_id)).collect()
    }
}
