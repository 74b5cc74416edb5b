use crate::boolean::{parse, BooleanEngine};
use crate::completion::QueryCompleter;
use crate::config::{CollectionConfig, TextConfig};
use crate::dictionary::Dictionary;
use crate::document::Document;
use crate::error::{Result, SiftError};
use crate::index::{DocId, WeightedIndex};
use crate::ngram::NgramIndex;
use crate::persist::{self, IndexPaths};
use crate::ranking::{ScoredDoc, VectorSpaceModel};
use crate::thesaurus::{CancelFlag, ExpandedQuery, Thesaurus};
use crate::tokenizer::tokenize;
use crate::topics::{TopicFilter, TopicIndex};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// One immutable snapshot of every structure of a collection.
#[derive(Debug, Clone)]
pub struct Engine {
    config: TextConfig,
    documents: Vec<Document>,
    /// docID -> position in `documents`
    positions: HashMap<DocId, usize>,
    topics: TopicIndex,
    index: WeightedIndex,
    ngrams: NgramIndex,
    thesaurus: Thesaurus,
}

impl Engine {
    /// Build everything in memory, in dependency order.
    pub fn build(documents: Vec<Document>, config: TextConfig, cancel: &CancelFlag) -> Result<Self> {
        let num_docs = u32::try_from(documents.len())
            .map_err(|_| SiftError::Integrity(format!("{} documents exceed the docID range", documents.len())))?;
        let dictionary = Dictionary::build(&documents, &config);
        let index = persist::index_processed(&dictionary.processed, &dictionary.terms, num_docs)?;
        let ngrams = NgramIndex::from_documents(&documents, &config);
        let thesaurus = Thesaurus::build_with_cancel(&index, cancel)?;
        Self::assemble(config, documents, index, ngrams, thesaurus)
    }

    /// Load a collection's artifacts. The text pipeline recorded in the meta
    /// file wins over the one in `collection`.
    pub fn load(collection: &CollectionConfig) -> Result<Self> {
        let paths = IndexPaths::for_collection(collection);
        let meta = persist::load_meta(&paths)?;
        let documents = persist::load_documents(&paths)?;
        if documents.len() != meta.num_docs as usize {
            return Err(SiftError::Integrity(format!(
                "meta lists {} documents but {} were loaded",
                meta.num_docs,
                documents.len()
            )));
        }
        let index = persist::load_weighted_index(&paths, meta.num_docs)?;
        let ngrams = persist::load_ngram_index(&paths)?;
        let thesaurus = persist::load_thesaurus(&paths)?;
        tracing::info!(
            collection = %collection.collection,
            num_docs = meta.num_docs,
            num_terms = index.len(),
            num_grams = ngrams.len(),
            num_pairs = thesaurus.len(),
            "engine loaded"
        );
        Self::assemble(meta.text, documents, index, ngrams, thesaurus)
    }

    fn assemble(
        config: TextConfig,
        documents: Vec<Document>,
        index: WeightedIndex,
        ngrams: NgramIndex,
        thesaurus: Thesaurus,
    ) -> Result<Self> {
        let mut positions = HashMap::with_capacity(documents.len());
        for (pos, doc) in documents.iter().enumerate() {
            if positions.insert(doc.id, pos).is_some() {
                return Err(SiftError::Integrity(format!("docID {} appears twice in the collection", doc.id)));
            }
        }
        let topics = TopicIndex::build(&documents, &config);
        Ok(Self { config, documents, positions, topics, index, ngrams, thesaurus })
    }

    pub fn config(&self) -> &TextConfig { &self.config }

    pub fn index(&self) -> &WeightedIndex { &self.index }

    pub fn ngrams(&self) -> &NgramIndex { &self.ngrams }

    pub fn thesaurus(&self) -> &Thesaurus { &self.thesaurus }

    pub fn documents(&self) -> &[Document] { &self.documents }

    pub fn num_docs(&self) -> u32 { self.index.num_docs() }

    pub fn document(&self, doc_id: DocId) -> Option<&Document> {
        self.positions.get(&doc_id).map(|&pos| &self.documents[pos])
    }

    pub fn evaluate_boolean(&self, query: &str) -> Result<Vec<DocId>> {
        let postfix = parse(query, &self.ngrams, &self.config)?;
        BooleanEngine::new(&self.index, self.config).evaluate(&postfix)
    }

    pub fn rank_vector_space(&self, query: &str) -> Vec<ScoredDoc> {
        self.rank_tokens(&tokenize(query, &self.config))
    }

    pub fn rank_tokens<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<ScoredDoc> {
        VectorSpaceModel::new(&self.index).search(tokens)
    }

    pub fn expand_query<S: AsRef<str>>(&self, tokens: &[S]) -> ExpandedQuery {
        self.thesaurus.expand(tokens)
    }

    /// Tokenize, expand with the thesaurus and rank.
    pub fn rank_expanded(&self, query: &str) -> (ExpandedQuery, Vec<ScoredDoc>) {
        let expanded = self.expand_query(&tokenize(query, &self.config));
        let hits = self.rank_tokens(&expanded.tokens());
        (expanded, hits)
    }

    pub fn suggest_completions(&self, partial: &str) -> Result<Vec<String>> {
        QueryCompleter::new(&self.index, &self.ngrams, self.config).suggest(partial)
    }

    pub fn topic_index(&self) -> &TopicIndex { &self.topics }

    pub fn topic_filter<S: AsRef<str>>(&self, selected: &[S]) -> TopicFilter<'_> {
        self.topics.filter(selected)
    }

    pub fn filter_by_topics<S: AsRef<str>>(&self, doc_ids: Vec<DocId>, topics: &[S]) -> Vec<DocId> {
        self.topic_filter(topics).filter_ids(doc_ids)
    }
}

/// Shared, reloadable access to the current snapshot.
///
/// Readers clone the inner `Arc` and query without holding the lock; a reload
/// swaps in a new snapshot and leaves in-flight queries on the old one.
pub struct EngineHandle {
    collection: CollectionConfig,
    current: RwLock<Arc<Engine>>,
}

impl EngineHandle {
    pub fn open(collection: CollectionConfig) -> Result<Self> {
        let engine = Engine::load(&collection)?;
        Ok(Self { collection, current: RwLock::new(Arc::new(engine)) })
    }

    pub fn from_engine(collection: CollectionConfig, engine: Engine) -> Self {
        Self { collection, current: RwLock::new(Arc::new(engine)) }
    }

    pub fn snapshot(&self) -> Arc<Engine> {
        self.current.read().clone()
    }

    /// Reload from disk. On failure the previous snapshot stays active.
    pub fn reload(&self) -> Result<()> {
        let engine = Engine::load(&self.collection)?;
        *self.current.write() = Arc::new(engine);
        tracing::info!(collection = %self.collection.collection, "engine reloaded");
        Ok(())
    }

    pub fn collection(&self) -> &CollectionConfig { &self.collection }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Engine {
        let docs = vec![
            Document::new(0, "", "Operating systems", "system design of kernels"),
            Document::new(1, "", "Distributed systems", "system design and system call"),
            Document::new(2, "", "Cocoa", "cocoa farmers and cocoa prices"),
        ];
        Engine::build(docs, TextConfig::default(), &CancelFlag::new()).unwrap()
    }

    #[test]
    fn query_operations_share_one_snapshot() {
        let e = engine();
        assert_eq!(e.evaluate_boolean("system AND design").unwrap(), vec![0, 1]);
        let hits = e.rank_vector_space("cocoa");
        assert_eq!(hits[0].doc_id, 2);
        assert_eq!(e.suggest_completions("system").unwrap()[0], "design");
        assert!(e.expand_query(&["cocoa"]).tokens().len() > 1);
    }

    #[test]
    fn topic_filter_narrows_boolean_hits() {
        let docs = vec![
            Document::new(0, "cocoa", "Cocoa", "cocoa crop"),
            Document::new(1, "grain", "Wheat", "wheat crop"),
        ];
        let e = Engine::build(docs, TextConfig::default(), &CancelFlag::new()).unwrap();
        let hits = e.evaluate_boolean("crop").unwrap();
        assert_eq!(e.filter_by_topics(hits.clone(), &["grain"]), vec![1]);
        assert_eq!(e.filter_by_topics::<&str>(hits, &[]), vec![0, 1]);
    }

    #[test]
    fn documents_are_found_by_id_in_any_order() {
        let docs = vec![
            Document::new(1, "", "Second", "beta"),
            Document::new(0, "", "First", "alpha"),
        ];
        let e = Engine::build(docs, TextConfig::default(), &CancelFlag::new()).unwrap();
        assert_eq!(e.document(0).unwrap().title, "First");
        assert_eq!(e.document(1).unwrap().title, "Second");
        assert!(e.document(2).is_none());
    }

    #[test]
    fn duplicate_doc_ids_are_rejected() {
        let docs = vec![Document::new(0, "", "a", "x"), Document::new(0, "", "b", "y")];
        assert!(matches!(Engine::build(docs, TextConfig::default(), &CancelFlag::new()), Err(SiftError::Integrity(_))));
    }

    #[test]
    fn non_dense_doc_ids_are_rejected() {
        let docs = vec![Document::new(5, "", "t", "c")];
        assert!(matches!(Engine::build(docs, TextConfig::default(), &CancelFlag::new()), Err(SiftError::Integrity(_))));
    }

    #[test]
    fn engine_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine>();
        assert_send_sync::<EngineHandle>();
    }
}
