//! Co-occurrence thesaurus and query expansion.
//!
//! Two terms are similar when they appear in the same documents; similarity is
//! the Jaccard coefficient of their posting docID sets. Building compares every
//! pair of vocabulary terms, which makes it the only quadratic step of a build.

use crate::error::{Result, SiftError};
use crate::index::{round5, DocId, WeightedIndex};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

/// Number of terms appended by [`Thesaurus::expand`].
pub const EXPANSION_SIZE: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynonymPair {
    /// Lexically ordered: `pair[0] < pair[1]`.
    pub pair: [String; 2],
    pub similarity: f64,
}

impl SynonymPair {
    pub fn other(&self, token: &str) -> Option<&str> {
        if self.pair[0] == token {
            Some(&self.pair[1])
        } else if self.pair[1] == token {
            Some(&self.pair[0])
        } else {
            None
        }
    }
}

/// Cooperative cancellation for long builds. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self { Self::default() }

    pub fn cancel(&self) { self.0.store(true, AtomicOrdering::Relaxed) }

    pub fn is_cancelled(&self) -> bool { self.0.load(AtomicOrdering::Relaxed) }
}

pub fn jaccard(a: &BTreeSet<DocId>, b: &BTreeSet<DocId>) -> f64 {
    let inter = a.intersection(b).count();
    if inter == 0 {
        return 0.0;
    }
    let union = a.len() + b.len() - inter;
    round5(inter as f64 / union as f64)
}

/// One token of an expanded query and its weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpandedTerm {
    pub token: String,
    /// 1.0 for tokens of the original query, summed similarity for added ones.
    pub weight: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpandedQuery {
    pub terms: Vec<ExpandedTerm>,
}

impl ExpandedQuery {
    pub fn tokens(&self) -> Vec<String> {
        self.terms.iter().map(|t| t.token.clone()).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Thesaurus {
    pairs: Vec<SynonymPair>,
    by_term: HashMap<String, Vec<usize>>,
}

impl Thesaurus {
    pub fn build(index: &WeightedIndex) -> Self {
        // a fresh flag is never raised, so this cannot fail
        Self::build_with_cancel(index, &CancelFlag::new()).unwrap_or_default()
    }

    /// Compare every unordered pair of terms, checking `cancel` once per outer term.
    pub fn build_with_cancel(index: &WeightedIndex, cancel: &CancelFlag) -> Result<Self> {
        let mut terms: Vec<(&str, BTreeSet<DocId>)> = index.records().iter().map(|r| (r.token.as_str(), r.doc_ids())).collect();
        terms.sort_by(|a, b| a.0.cmp(b.0));

        let total = terms.len();
        let mut pairs = Vec::new();
        for (i, (a, docs_a)) in terms.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::warn!(done = i, total, "thesaurus build cancelled");
                return Err(SiftError::Cancelled);
            }
            if docs_a.is_empty() {
                continue;
            }
            for (b, docs_b) in &terms[i + 1..] {
                let similarity = jaccard(docs_a, docs_b);
                if similarity > 0.0 {
                    pairs.push(SynonymPair { pair: [a.to_string(), b.to_string()], similarity });
                }
            }
            if i > 0 && i % 1000 == 0 {
                tracing::debug!(done = i, total, pairs = pairs.len(), "thesaurus progress");
            }
        }
        tracing::info!(num_terms = total, num_pairs = pairs.len(), "thesaurus built");
        Ok(Self::from_pairs(pairs))
    }

    pub fn from_pairs(pairs: Vec<SynonymPair>) -> Self {
        let mut by_term: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, p) in pairs.iter().enumerate() {
            by_term.entry(p.pair[0].clone()).or_default().push(idx);
            by_term.entry(p.pair[1].clone()).or_default().push(idx);
        }
        Self { pairs, by_term }
    }

    pub fn pairs(&self) -> &[SynonymPair] { &self.pairs }

    pub fn len(&self) -> usize { self.pairs.len() }

    pub fn is_empty(&self) -> bool { self.pairs.is_empty() }

    /// Stored pairs involving `token`.
    pub fn neighbors<'a>(&'a self, token: &str) -> impl Iterator<Item = &'a SynonymPair> + 'a {
        self.by_term.get(token).into_iter().flatten().map(move |&idx| &self.pairs[idx])
    }

    /// Similarity of two terms; `None` when no pair is stored (similarity 0).
    pub fn similarity(&self, a: &str, b: &str) -> Option<f64> {
        self.neighbors(a).find(|p| p.other(a) == Some(b)).map(|p| p.similarity)
    }

    /// Append the [`EXPANSION_SIZE`] terms most similar to the whole token set.
    pub fn expand<S: AsRef<str>>(&self, tokens: &[S]) -> ExpandedQuery {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut terms = Vec::new();
        for token in tokens {
            let token = token.as_ref();
            if seen.insert(token) {
                terms.push(ExpandedTerm { token: token.to_string(), weight: 1.0 });
            }
        }

        let mut sums: HashMap<&str, f64> = HashMap::new();
        for term in &terms {
            let token = term.token.as_str();
            for pair in self.neighbors(token) {
                if let Some(other) = pair.other(token) {
                    if !seen.contains(other) {
                        *sums.entry(other).or_insert(0.0) += pair.similarity;
                    }
                }
            }
        }
        let mut ranked: Vec<(&str, f64)> = sums.into_iter().map(|(t, sum)| (t, round5(sum))).collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then_with(|| a.0.cmp(b.0)));

        for (token, sum) in ranked.into_iter().take(EXPANSION_SIZE) {
            terms.push(ExpandedTerm { token: token.to_string(), weight: sum });
        }
        tracing::debug!(input = tokens.len(), output = terms.len(), "query expanded");
        ExpandedQuery { terms }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexBuilder;

    fn index(docs: &[&str]) -> WeightedIndex {
        let streams: Vec<Vec<String>> = docs.iter().map(|d| d.split_whitespace().map(str::to_string).collect()).collect();
        let mut vocab: Vec<String> = streams.iter().flatten().cloned().collect();
        vocab.sort();
        vocab.dedup();
        let mut b = IndexBuilder::new(&vocab, docs.len() as u32);
        for (i, s) in streams.iter().enumerate() {
            b.add_document(i as DocId, s).unwrap();
        }
        b.finalize()
    }

    #[test]
    fn identical_posting_sets_have_similarity_one() {
        let idx = index(&["cocoa farm", "cocoa farm", "wheat"]);
        let t = Thesaurus::build(&idx);
        assert_eq!(t.similarity("cocoa", "farm"), Some(1.0));
        assert_eq!(t.similarity("farm", "cocoa"), Some(1.0));
    }

    #[test]
    fn disjoint_terms_are_not_stored() {
        let idx = index(&["cocoa", "wheat"]);
        let t = Thesaurus::build(&idx);
        assert!(t.is_empty());
        assert_eq!(t.similarity("cocoa", "wheat"), None);
    }

    #[test]
    fn pairs_stored_once_and_ordered() {
        let idx = index(&["b a c", "a b", "c"]);
        let t = Thesaurus::build(&idx);
        for p in t.pairs() {
            assert!(p.pair[0] < p.pair[1]);
        }
        // a:{0,1} b:{0,1} c:{0,2}
        assert_eq!(t.len(), 3);
        assert_eq!(t.similarity("a", "c"), Some(round5(1.0 / 3.0)));
    }

    #[test]
    fn expansion_adds_top_two_by_summed_similarity() {
        // x:{0,1,2} y:{0,1,2} z:{0,1} w:{2} v:{3}
        let idx = index(&["x y z", "x y z", "x y w", "v"]);
        let t = Thesaurus::build(&idx);
        let q = t.expand(&["x"]);
        assert_eq!(q.tokens(), vec!["x", "y", "z"]);
        assert_eq!(q.terms[0].weight, 1.0);
        assert_eq!(q.terms[1].weight, 1.0);
        assert_eq!(q.terms[2].weight, round5(2.0 / 3.0));
    }

    #[test]
    fn expansion_ties_break_lexically_and_skip_query_terms() {
        // a:{0,1} b:{0} c:{1}
        let idx = index(&["a b", "a c"]);
        let t = Thesaurus::build(&idx);
        let q = t.expand(&["a", "a"]);
        assert_eq!(q.tokens(), vec!["a", "b", "c"]);
        let q = t.expand(&["b"]);
        assert_eq!(q.tokens(), vec!["b", "a"]);
    }

    #[test]
    fn cancelled_build_returns_error() {
        let idx = index(&["a b", "a c"]);
        let flag = CancelFlag::new();
        flag.cancel();
        assert!(matches!(Thesaurus::build_with_cancel(&idx, &flag), Err(SiftError::Cancelled)));
    }
}
