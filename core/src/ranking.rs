use crate::index::{DocId, WeightedIndex};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Scores are kept in integer units of 1e-5 so every partial sum is already
/// rounded to 5 decimals and addition order cannot change the total.
const SCALE: f64 = 100_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredDoc {
    pub doc_id: DocId,
    pub score: f64,
}

/// Vector-space ranking over the precomputed tf-idf weights.
pub struct VectorSpaceModel<'a> {
    index: &'a WeightedIndex,
}

impl<'a> VectorSpaceModel<'a> {
    pub fn new(index: &'a WeightedIndex) -> Self {
        Self { index }
    }

    /// Sum the weights of every known query token per document.
    ///
    /// A token repeated in the query contributes once per occurrence.
    pub fn search<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<ScoredDoc> {
        let mut units: HashMap<DocId, i64> = HashMap::new();
        for token in tokens {
            let Some(term) = self.index.get(token.as_ref()) else { continue };
            for p in &term.postings {
                *units.entry(p.doc_id).or_insert(0) += (p.weight * SCALE).round() as i64;
            }
        }
        let mut scored: Vec<ScoredDoc> = units
            .into_iter()
            .map(|(doc_id, u)| ScoredDoc { doc_id, score: u as f64 / SCALE })
            .collect();
        rank(&mut scored);
        tracing::debug!(tokens = tokens.len(), hits = scored.len(), "vector space search");
        scored
    }
}

/// Descending score, ascending docID on ties.
pub fn rank(scored: &mut [ScoredDoc]) {
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.doc_id.cmp(&b.doc_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{Posting, TermRecord};

    fn record(token: &str, postings: &[(DocId, f64)]) -> TermRecord {
        let mut r = TermRecord::new(token);
        r.postings = postings.iter().map(|&(doc_id, weight)| Posting { doc_id, freq: 1, weight }).collect();
        r
    }

    fn index() -> WeightedIndex {
        WeightedIndex::from_records(
            vec![
                record("alpha", &[(0, 0.1), (1, 0.30103), (2, 0.05)]),
                record("beta", &[(0, 0.2), (2, 0.25)]),
                record("gamma", &[(3, 0.7)]),
            ],
            4,
        )
        .unwrap()
    }

    #[test]
    fn scores_are_summed_and_ranked() {
        let idx = index();
        let vsm = VectorSpaceModel::new(&idx);
        let hits = vsm.search(&["alpha", "beta"]);
        let ids: Vec<DocId> = hits.iter().map(|h| h.doc_id).collect();
        // docs 0 and 2 tie at 0.3 and fall back to docID order
        assert_eq!(ids, vec![1, 0, 2]);
        assert_eq!(hits[0].score, 0.30103);
        assert_eq!(hits[1].score, 0.3);
        assert_eq!(hits[2].score, 0.3);
    }

    #[test]
    fn token_order_does_not_matter() {
        let idx = index();
        let vsm = VectorSpaceModel::new(&idx);
        assert_eq!(vsm.search(&["alpha", "beta", "gamma"]), vsm.search(&["gamma", "beta", "alpha"]));
    }

    #[test]
    fn unknown_and_empty_queries_yield_nothing() {
        let idx = index();
        let vsm = VectorSpaceModel::new(&idx);
        assert!(vsm.search(&["delta"]).is_empty());
        assert!(vsm.search::<&str>(&[]).is_empty());
    }
}
