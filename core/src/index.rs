use crate::error::{Result, SiftError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

pub type DocId = u32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    /// Raw occurrences of the term in the document.
    pub freq: u32,
    pub weight: f64, // tf-idf, 5 decimals; 0.0 until finalized
}

/// Everything the index knows about one vocabulary token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TermRecord {
    pub token: String,
    pub postings: Vec<Posting>,
    /// successor token -> number of times it directly follows this token
    pub successors: BTreeMap<String, u32>,
}

impl TermRecord {
    pub fn new(token: &str) -> Self {
        Self { token: token.to_string(), ..Self::default() }
    }

    pub fn doc_frequency(&self) -> usize { self.postings.len() }

    pub fn doc_ids(&self) -> BTreeSet<DocId> {
        self.postings.iter().map(|p| p.doc_id).collect()
    }

    pub fn weight_in(&self, doc_id: DocId) -> f64 {
        self.postings.iter().find(|p| p.doc_id == doc_id).map_or(0.0, |p| p.weight)
    }
}

pub fn round5(value: f64) -> f64 {
    (value * 100_000.0).round() / 100_000.0
}

/// `round5(log10(1 + freq/max_freq) * log10(total_docs/doc_freq))`.
pub fn weight_for(freq: u32, max_freq: u32, total_docs: u32, doc_freq: u32) -> f64 {
    if max_freq == 0 || doc_freq == 0 || total_docs == 0 {
        return 0.0;
    }
    let tf = (1.0 + f64::from(freq) / f64::from(max_freq)).log10();
    let idf = (f64::from(total_docs) / f64::from(doc_freq)).log10();
    round5(tf * idf)
}

/// Accumulates postings and successor counts one document at a time.
///
/// Weights need corpus-wide statistics, so they are only computed by
/// [`IndexBuilder::finalize`], which consumes the builder.
#[derive(Debug)]
pub struct IndexBuilder {
    num_docs: u32,
    records: Vec<TermRecord>,
    lookup: HashMap<String, usize>,
    max_freqs: HashMap<DocId, u32>,
    seen: HashSet<DocId>,
}

impl IndexBuilder {
    /// `vocabulary` is the declared term dictionary; `num_docs` bounds valid docIDs.
    pub fn new<S: AsRef<str>>(vocabulary: &[S], num_docs: u32) -> Self {
        let mut records = Vec::with_capacity(vocabulary.len());
        let mut lookup = HashMap::with_capacity(vocabulary.len());
        for term in vocabulary {
            let term = term.as_ref();
            if !lookup.contains_key(term) {
                lookup.insert(term.to_string(), records.len());
                records.push(TermRecord::new(term));
            }
        }
        Self { num_docs, records, lookup, max_freqs: HashMap::new(), seen: HashSet::new() }
    }

    /// Add one document's full token stream (topic, title, content concatenated).
    ///
    /// Nothing is recorded when an error is returned.
    pub fn add_document(&mut self, doc_id: DocId, tokens: &[String]) -> Result<()> {
        if doc_id >= self.num_docs {
            return Err(SiftError::Integrity(format!("docID {doc_id} outside collection of {} documents", self.num_docs)));
        }
        if self.seen.contains(&doc_id) {
            return Err(SiftError::Integrity(format!("docID {doc_id} indexed twice")));
        }

        let mut tf_counts: HashMap<&str, u32> = HashMap::new();
        for token in tokens {
            if !self.lookup.contains_key(token.as_str()) {
                return Err(SiftError::Integrity(format!("token '{token}' of docID {doc_id} not in dictionary")));
            }
            *tf_counts.entry(token.as_str()).or_insert(0) += 1;
        }

        self.seen.insert(doc_id);
        if let Some(&max) = tf_counts.values().max() {
            self.max_freqs.insert(doc_id, max);
        }
        for (token, freq) in tf_counts {
            let idx = self.lookup[token];
            self.records[idx].postings.push(Posting { doc_id, freq, weight: 0.0 });
        }
        for pair in tokens.windows(2) {
            let idx = self.lookup[pair[0].as_str()];
            *self.records[idx].successors.entry(pair[1].clone()).or_insert(0) += 1;
        }
        Ok(())
    }

    pub fn finalize(mut self) -> WeightedIndex {
        if self.seen.len() as u32 != self.num_docs {
            tracing::warn!(indexed = self.seen.len(), declared = self.num_docs, "not every declared document was indexed");
        }
        for record in self.records.iter_mut() {
            let df = record.postings.len() as u32;
            for posting in record.postings.iter_mut() {
                let max_freq = self.max_freqs.get(&posting.doc_id).copied().unwrap_or(posting.freq);
                posting.weight = weight_for(posting.freq, max_freq, self.num_docs, df);
            }
        }
        tracing::info!(num_docs = self.num_docs, num_terms = self.records.len(), "weighted index finalized");
        WeightedIndex { num_docs: self.num_docs, records: self.records, lookup: self.lookup }
    }
}

/// Immutable weighted inverted index with the embedded successor model.
#[derive(Debug, Clone, Default)]
pub struct WeightedIndex {
    num_docs: u32,
    records: Vec<TermRecord>,
    lookup: HashMap<String, usize>,
}

impl WeightedIndex {
    /// Rebuild from persisted records, checking the posting invariants.
    pub fn from_records(records: Vec<TermRecord>, num_docs: u32) -> Result<Self> {
        let mut lookup = HashMap::with_capacity(records.len());
        for (idx, record) in records.iter().enumerate() {
            let mut docs = HashSet::with_capacity(record.postings.len());
            for p in &record.postings {
                if p.doc_id >= num_docs {
                    return Err(SiftError::Integrity(format!("term '{}' references unknown docID {}", record.token, p.doc_id)));
                }
                if !docs.insert(p.doc_id) {
                    return Err(SiftError::Integrity(format!("term '{}' lists docID {} twice", record.token, p.doc_id)));
                }
            }
            if lookup.insert(record.token.clone(), idx).is_some() {
                return Err(SiftError::Integrity(format!("term '{}' stored twice", record.token)));
            }
        }
        Ok(Self { num_docs, records, lookup })
    }

    pub fn num_docs(&self) -> u32 { self.num_docs }

    pub fn len(&self) -> usize { self.records.len() }

    pub fn is_empty(&self) -> bool { self.records.is_empty() }

    pub fn get(&self, token: &str) -> Option<&TermRecord> {
        self.lookup.get(token).map(|&idx| &self.records[idx])
    }

    pub fn contains(&self, token: &str) -> bool { self.lookup.contains_key(token) }

    /// Posting docIDs of `token`; empty for unknown terms.
    pub fn doc_ids(&self, token: &str) -> BTreeSet<DocId> {
        self.get(token).map(TermRecord::doc_ids).unwrap_or_default()
    }

    pub fn successors(&self, token: &str) -> Option<&BTreeMap<String, u32>> {
        self.get(token).map(|r| &r.successors)
    }

    /// Records in dictionary order.
    pub fn records(&self) -> &[TermRecord] { &self.records }

    pub fn terms(&self) -> impl Iterator<Item = &str> + '_ {
        self.records.iter().map(|r| r.token.as_str())
    }

    pub fn into_records(self) -> Vec<TermRecord> { self.records }
}
