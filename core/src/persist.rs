use crate::config::{CollectionConfig, TextConfig};
use crate::dictionary::Dictionary;
use crate::document::{Document, ProcessedDocument};
use crate::engine::Engine;
use crate::error::{Result, SiftError};
use crate::index::{IndexBuilder, TermRecord, WeightedIndex};
use crate::ngram::{NgramEntry, NgramIndex};
use crate::thesaurus::{CancelFlag, SynonymPair, Thesaurus};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, remove_file, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: usize,
    pub created_at: String,
    pub version: u32,
    /// Pipeline the artifacts were built with; queries must use the same one.
    #[serde(default)]
    pub text: TextConfig,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn for_collection(config: &CollectionConfig) -> Self {
        Self::new(config.artifact_dir())
    }
    pub fn documents(&self) -> PathBuf { self.root.join("documents.json") }
    pub fn processed(&self) -> PathBuf { self.root.join("processed.json") }
    pub fn dictionary(&self) -> PathBuf { self.root.join("dictionary.json") }
    pub fn weighted_index(&self) -> PathBuf { self.root.join("weighted_index.json") }
    pub fn ngram_index(&self) -> PathBuf { self.root.join("ngram_index.json") }
    pub fn thesaurus(&self) -> PathBuf { self.root.join("thesaurus.json") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }

    pub fn all(&self) -> [PathBuf; 7] {
        [
            self.documents(),
            self.processed(),
            self.dictionary(),
            self.weighted_index(),
            self.ngram_index(),
            self.thesaurus(),
            self.meta(),
        ]
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent() {
        create_dir_all(dir)?;
    }
    let mut w = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut w, value)?;
    w.flush()?;
    Ok(())
}

/// The file handle is released as soon as the value is deserialized.
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

pub fn save_documents(paths: &IndexPaths, docs: &[Document]) -> Result<()> {
    write_json(&paths.documents(), docs)
}

pub fn load_documents(paths: &IndexPaths) -> Result<Vec<Document>> {
    read_json(&paths.documents())
}

pub fn save_processed(paths: &IndexPaths, docs: &[ProcessedDocument]) -> Result<()> {
    write_json(&paths.processed(), docs)
}

pub fn load_processed(paths: &IndexPaths) -> Result<Vec<ProcessedDocument>> {
    read_json(&paths.processed())
}

pub fn save_dictionary(paths: &IndexPaths, terms: &[String]) -> Result<()> {
    write_json(&paths.dictionary(), terms)
}

pub fn load_dictionary(paths: &IndexPaths) -> Result<Vec<String>> {
    read_json(&paths.dictionary())
}

pub fn save_weighted_index(paths: &IndexPaths, index: &WeightedIndex) -> Result<()> {
    write_json(&paths.weighted_index(), index.records())
}

pub fn load_weighted_index(paths: &IndexPaths, num_docs: u32) -> Result<WeightedIndex> {
    let records: Vec<TermRecord> = read_json(&paths.weighted_index())?;
    WeightedIndex::from_records(records, num_docs)
}

pub fn save_ngram_index(paths: &IndexPaths, index: &NgramIndex) -> Result<()> {
    write_json(&paths.ngram_index(), index.entries())
}

pub fn load_ngram_index(paths: &IndexPaths) -> Result<NgramIndex> {
    let entries: Vec<NgramEntry> = read_json(&paths.ngram_index())?;
    Ok(NgramIndex::from_entries(entries))
}

pub fn save_thesaurus(paths: &IndexPaths, thesaurus: &Thesaurus) -> Result<()> {
    write_json(&paths.thesaurus(), thesaurus.pairs())
}

pub fn load_thesaurus(paths: &IndexPaths) -> Result<Thesaurus> {
    let pairs: Vec<SynonymPair> = read_json(&paths.thesaurus())?;
    Ok(Thesaurus::from_pairs(pairs))
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    write_json(&paths.meta(), meta)
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    read_json(&paths.meta())
}

/// Load every artifact of a collection into a query snapshot.
pub fn load_engine(config: &CollectionConfig) -> Result<Engine> {
    Engine::load(config)
}

/// Remove every artifact so the next build starts from scratch.
pub fn clear_artifacts(paths: &IndexPaths) -> Result<()> {
    for path in paths.all() {
        if path.is_file() {
            remove_file(&path)?;
        }
    }
    Ok(())
}

/// Build the weighted index from processed documents and the declared vocabulary.
pub fn index_processed(processed: &[ProcessedDocument], terms: &[String], num_docs: u32) -> Result<WeightedIndex> {
    let mut builder = IndexBuilder::new(terms, num_docs);
    for doc in processed {
        builder.add_document(doc.id, &doc.tokens())?;
    }
    Ok(builder.finalize())
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}

/// Write every missing artifact of a collection. Existing files are kept as is.
///
/// Later stages read the artifacts of earlier ones when those already exist,
/// so a partially built directory is completed rather than replaced.
pub fn build_artifacts(config: &CollectionConfig, docs: &[Document], cancel: &CancelFlag) -> Result<MetaFile> {
    let paths = IndexPaths::for_collection(config);
    create_dir_all(&paths.root)?;
    let num_docs = u32::try_from(docs.len())
        .map_err(|_| SiftError::Integrity(format!("{} documents exceed the docID range", docs.len())))?;

    if !paths.documents().is_file() {
        save_documents(&paths, docs)?;
    }

    let dictionary = if paths.processed().is_file() && paths.dictionary().is_file() {
        Dictionary::from_parts(load_processed(&paths)?, load_dictionary(&paths)?)
    } else {
        let dict = Dictionary::build(docs, &config.text);
        if !paths.processed().is_file() {
            save_processed(&paths, &dict.processed)?;
        }
        if !paths.dictionary().is_file() {
            save_dictionary(&paths, &dict.terms)?;
        }
        dict
    };

    if !paths.ngram_index().is_file() {
        save_ngram_index(&paths, &NgramIndex::from_documents(docs, &config.text))?;
    }

    let index = if paths.weighted_index().is_file() {
        load_weighted_index(&paths, num_docs)?
    } else {
        let index = index_processed(&dictionary.processed, &dictionary.terms, num_docs)?;
        save_weighted_index(&paths, &index)?;
        index
    };

    if !paths.thesaurus().is_file() {
        save_thesaurus(&paths, &Thesaurus::build_with_cancel(&index, cancel)?)?;
    }

    if paths.meta().is_file() {
        return load_meta(&paths);
    }
    let meta = MetaFile {
        num_docs,
        num_terms: index.len(),
        created_at: now_rfc3339(),
        version: FORMAT_VERSION,
        text: config.text,
    };
    save_meta(&paths, &meta)?;
    tracing::info!(root = %paths.root.display(), num_docs, num_terms = meta.num_terms, "artifacts written");
    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn dictionary_round_trips_as_flat_array() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        save_dictionary(&paths, &["alpha".to_string(), "beta".to_string()]).unwrap();
        let raw = std::fs::read_to_string(paths.dictionary()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value.is_array());
        assert_eq!(load_dictionary(&paths).unwrap(), vec!["alpha", "beta"]);
    }

    #[test]
    fn missing_artifact_is_io_error() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        assert!(matches!(load_meta(&paths), Err(SiftError::Io(_))));
    }
}
