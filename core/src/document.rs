use crate::config::TextConfig;
use crate::index::DocId;
use crate::tokenizer::tokenize;
use serde::{Deserialize, Serialize};

/// A document as supplied by ingestion. Read-only to the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "docID")]
    pub id: DocId,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

impl Document {
    pub fn new(id: DocId, topic: &str, title: &str, content: &str) -> Self {
        Self { id, topic: topic.to_string(), title: title.to_string(), content: content.to_string() }
    }

    /// Token stream of all fields in index order: topic, title, content.
    pub fn tokens(&self, config: &TextConfig) -> Vec<String> {
        let mut all = tokenize(&self.topic, config);
        all.extend(tokenize(&self.title, config));
        all.extend(tokenize(&self.content, config));
        all
    }
}

/// A document whose text fields hold space-joined normalized tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedDocument {
    #[serde(rename = "docID")]
    pub id: DocId,
    pub topic: String,
    pub title: String,
    pub content: String,
}

impl ProcessedDocument {
    pub fn from_document(doc: &Document, config: &TextConfig) -> Self {
        Self {
            id: doc.id,
            topic: tokenize(&doc.topic, config).join(" "),
            title: tokenize(&doc.title, config).join(" "),
            content: tokenize(&doc.content, config).join(" "),
        }
    }

    /// The already normalized token stream, in topic, title, content order.
    pub fn tokens(&self) -> Vec<String> {
        [&self.topic, &self.title, &self.content]
            .into_iter()
            .flat_map(|field| field.split_whitespace())
            .map(str::to_string)
            .collect()
    }
}
