use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Text pipeline switches. The same value must be used at build and query time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextConfig {
    pub normalize: bool,
    pub remove_stopwords: bool,
    pub stem: bool,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self { normalize: true, remove_stopwords: true, stem: true }
    }
}

impl TextConfig {
    /// Pipeline used for the wildcard vocabulary: identical, minus stemming.
    pub fn unstemmed(self) -> Self {
        Self { stem: false, ..self }
    }
}

/// Where a collection's artifacts live and how its text is processed.
#[derive(Debug, Clone)]
pub struct CollectionConfig {
    pub root: PathBuf,
    pub collection: String,
    pub text: TextConfig,
}

impl CollectionConfig {
    pub fn new<P: AsRef<Path>>(root: P, collection: &str) -> Self {
        Self { root: root.as_ref().to_path_buf(), collection: collection.to_string(), text: TextConfig::default() }
    }

    pub fn with_text(mut self, text: TextConfig) -> Self {
        self.text = text;
        self
    }

    pub fn artifact_dir(&self) -> PathBuf {
        self.root.join(&self.collection)
    }
}
