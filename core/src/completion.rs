use crate::boolean::Operator;
use crate::config::TextConfig;
use crate::error::{Result, SiftError};
use crate::index::WeightedIndex;
use crate::ngram::{is_wildcard, NgramIndex};
use crate::tokenizer::tokenize;
use std::collections::{HashMap, HashSet};

pub const MAX_SUGGESTIONS: usize = 10;

/// Suggests the next token of a partial query from the successor model.
pub struct QueryCompleter<'a> {
    index: &'a WeightedIndex,
    ngrams: &'a NgramIndex,
    config: TextConfig,
}

impl<'a> QueryCompleter<'a> {
    pub fn new(index: &'a WeightedIndex, ngrams: &'a NgramIndex, config: TextConfig) -> Self {
        Self { index, ngrams, config }
    }

    /// Normalized tokens the last element of `partial` stands for.
    fn last_tokens(&self, partial: &str) -> Result<(Vec<String>, bool)> {
        let spaced = partial.replace(['(', ')'], " ");
        let Some(last) = spaced.split_whitespace().filter(|w| Operator::parse(w).is_none()).last() else {
            return Ok((Vec::new(), false));
        };
        let wildcard = is_wildcard(last);
        let words = if wildcard { self.ngrams.resolve(last, &self.config)? } else { vec![last.to_string()] };

        let mut seen = HashSet::new();
        let tokens = words
            .iter()
            .flat_map(|w| tokenize(w, &self.config))
            .filter(|t| seen.insert(t.clone()))
            .collect();
        Ok((tokens, wildcard))
    }

    /// At most [`MAX_SUGGESTIONS`] successors, most frequent first.
    ///
    /// Words produced by wildcard resolution come from the indexed corpus, so
    /// one missing from the dictionary means the indexes are out of sync.
    pub fn suggest(&self, partial: &str) -> Result<Vec<String>> {
        let (tokens, from_wildcard) = self.last_tokens(partial)?;
        let mut merged: HashMap<&str, u32> = HashMap::new();
        for token in &tokens {
            match self.index.successors(token) {
                Some(successors) => {
                    for (next, freq) in successors {
                        *merged.entry(next.as_str()).or_insert(0) += freq;
                    }
                }
                None if from_wildcard => {
                    return Err(SiftError::Integrity(format!("wildcard match '{token}' missing from dictionary")));
                }
                None => {}
            }
        }
        let mut ranked: Vec<(&str, u32)> = merged.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        let suggestions: Vec<String> = ranked.into_iter().take(MAX_SUGGESTIONS).map(|(t, _)| t.to_string()).collect();
        tracing::debug!(%partial, keys = tokens.len(), suggestions = suggestions.len(), "completion");
        Ok(suggestions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{DocId, IndexBuilder, TermRecord};

    fn build(docs: &[&str]) -> (WeightedIndex, NgramIndex) {
        let cfg = TextConfig::default();
        let streams: Vec<Vec<String>> = docs.iter().map(|d| tokenize(d, &cfg)).collect();
        let vocab: Vec<String> = streams.iter().flatten().cloned().collect();
        let mut b = IndexBuilder::new(&vocab, docs.len() as u32);
        for (i, s) in streams.iter().enumerate() {
            b.add_document(i as DocId, s).unwrap();
        }
        let ngrams = NgramIndex::build(docs.iter().flat_map(|d| tokenize(d, &cfg.unstemmed())));
        (b.finalize(), ngrams)
    }

    #[test]
    fn most_frequent_successor_first() {
        let (idx, ngrams) = build(&[
            "system design review",
            "system design",
            "system design patterns",
            "system call overhead",
        ]);
        let completer = QueryCompleter::new(&idx, &ngrams, TextConfig::default());
        let s = completer.suggest("operating AND system").unwrap();
        assert_eq!(s, vec!["design", "call"]);
    }

    #[test]
    fn wildcard_merges_successors() {
        let (idx, ngrams) = build(&["graph theory", "graphics card", "graphics card", "graph paper"]);
        let completer = QueryCompleter::new(&idx, &ngrams, TextConfig::default());
        let s = completer.suggest("(comput* AND graph*)").unwrap();
        assert_eq!(s, vec!["card", "paper", "theori"]);
    }

    #[test]
    fn at_most_ten_suggestions() {
        let docs: Vec<String> = (0..15).map(|i| format!("alpha word{i}")).collect();
        let refs: Vec<&str> = docs.iter().map(String::as_str).collect();
        let (idx, ngrams) = build(&refs);
        let completer = QueryCompleter::new(&idx, &ngrams, TextConfig::default());
        assert_eq!(completer.suggest("alpha").unwrap().len(), MAX_SUGGESTIONS);
    }

    #[test]
    fn unknown_or_empty_input_gives_nothing() {
        let (idx, ngrams) = build(&["system design"]);
        let completer = QueryCompleter::new(&idx, &ngrams, TextConfig::default());
        assert!(completer.suggest("").unwrap().is_empty());
        assert!(completer.suggest("( AND )").unwrap().is_empty());
        assert!(completer.suggest("unicorn").unwrap().is_empty());
        assert!(completer.suggest("zz*").unwrap().is_empty());
    }

    #[test]
    fn wildcard_match_missing_from_index_is_integrity_error() {
        let (_, ngrams) = build(&["system design"]);
        let other = WeightedIndex::from_records(vec![TermRecord::new("design")], 1).unwrap();
        let completer = QueryCompleter::new(&other, &ngrams, TextConfig::default());
        assert!(matches!(completer.suggest("sys*"), Err(SiftError::Integrity(_))));
    }
}
