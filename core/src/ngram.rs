use crate::config::TextConfig;
use crate::document::Document;
use crate::error::{Result, SiftError};
use crate::tokenizer::fold_pattern;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Marks the start or end of a word inside a gram. The tokenizer never emits it.
pub const BOUNDARY: char = '$';
pub const WILDCARD: char = '*';

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NgramEntry {
    pub gram: String,
    /// Distinct vocabulary words containing the gram, first-seen order.
    pub words: Vec<String>,
}

/// `$` + first char, every overlapping 2-char window, last char + `$`.
pub fn grams(word: &str) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    let (Some(first), Some(last)) = (chars.first(), chars.last()) else {
        return Vec::new();
    };
    let mut out = Vec::with_capacity(chars.len() + 1);
    out.push(format!("{BOUNDARY}{first}"));
    out.extend(chars.windows(2).map(|w| w.iter().collect::<String>()));
    out.push(format!("{last}{BOUNDARY}"));
    out
}

/// Character n-gram index over the unstemmed vocabulary, for `*` patterns.
#[derive(Debug, Clone, Default)]
pub struct NgramIndex {
    entries: Vec<NgramEntry>,
    lookup: HashMap<String, usize>,
}

impl NgramIndex {
    pub fn build<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut index = Self::default();
        let mut seen: HashSet<String> = HashSet::new();
        for token in tokens {
            let token = token.as_ref();
            if token.is_empty() || !seen.insert(token.to_string()) {
                continue;
            }
            for gram in grams(token) {
                let idx = match index.lookup.get(&gram) {
                    Some(&idx) => idx,
                    None => {
                        index.lookup.insert(gram.clone(), index.entries.len());
                        index.entries.push(NgramEntry { gram, words: Vec::new() });
                        index.entries.len() - 1
                    }
                };
                // a word repeating a gram ("aaa") hits the same entry back to back
                let words = &mut index.entries[idx].words;
                if words.last().map(String::as_str) != Some(token) {
                    words.push(token.to_string());
                }
            }
        }
        tracing::info!(num_grams = index.entries.len(), num_words = seen.len(), "n-gram index built");
        index
    }

    /// Index the documents' tokens, processed like the weighted index but unstemmed.
    pub fn from_documents(docs: &[Document], config: &TextConfig) -> Self {
        let unstemmed = config.unstemmed();
        Self::build(docs.iter().flat_map(|d| d.tokens(&unstemmed)))
    }

    pub fn from_entries(entries: Vec<NgramEntry>) -> Self {
        let lookup = entries.iter().enumerate().map(|(i, e)| (e.gram.clone(), i)).collect();
        Self { entries, lookup }
    }

    pub fn entries(&self) -> &[NgramEntry] { &self.entries }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn words(&self, gram: &str) -> Option<&[String]> {
        self.lookup.get(gram).map(|&idx| self.entries[idx].words.as_slice())
    }

    /// Vocabulary words matching a single-`*` pattern, in n-gram resolution order.
    ///
    /// The gram intersection only narrows the candidates; the exact prefix and
    /// suffix check removes the false positives it admits (`re*ed` vs `red`).
    ///
    /// The pattern's literal parts are folded with `config` first, so they line
    /// up with how the indexed words were produced.
    pub fn resolve(&self, pattern: &str, config: &TextConfig) -> Result<Vec<String>> {
        let pattern = fold_pattern(pattern, config);
        let (prefix, suffix) = split_pattern(&pattern)?;

        let query_grams: Vec<String> = grams(&pattern).into_iter().filter(|g| !g.contains(WILDCARD)).collect();
        let Some((seed, rest)) = query_grams.split_first() else {
            return Ok(Vec::new());
        };
        let Some(seed_words) = self.words(seed) else {
            return Ok(Vec::new());
        };
        let mut candidates: Vec<&String> = seed_words.iter().collect();
        for gram in rest {
            let Some(words) = self.words(gram) else {
                return Ok(Vec::new());
            };
            let set: HashSet<&String> = words.iter().collect();
            candidates.retain(|w| set.contains(w));
            if candidates.is_empty() {
                break;
            }
        }

        let min_len = prefix.chars().count() + suffix.chars().count();
        let matched: Vec<String> = candidates
            .into_iter()
            .filter(|w| w.chars().count() >= min_len && w.starts_with(prefix) && w.ends_with(suffix))
            .cloned()
            .collect();
        tracing::debug!(%pattern, matches = matched.len(), "wildcard resolved");
        Ok(matched)
    }
}

pub fn is_wildcard(term: &str) -> bool {
    term.contains(WILDCARD)
}

fn split_pattern(pattern: &str) -> Result<(&str, &str)> {
    let stars = pattern.matches(WILDCARD).count();
    if stars != 1 {
        return Err(SiftError::Wildcard { pattern: pattern.to_string(), reason: "expected exactly one '*'" });
    }
    let (prefix, rest) = pattern.split_once(WILDCARD).unwrap_or((pattern, ""));
    if prefix.is_empty() && rest.is_empty() {
        return Err(SiftError::Wildcard { pattern: pattern.to_string(), reason: "pattern has no literal characters" });
    }
    Ok((prefix, rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> TextConfig {
        TextConfig::default()
    }

    #[test]
    fn grams_are_boundary_marked() {
        assert_eq!(grams("cat"), vec!["$c", "ca", "at", "t$"]);
        assert_eq!(grams("a"), vec!["$a", "a$"]);
        assert!(grams("").is_empty());
    }

    #[test]
    fn repeated_gram_stored_once() {
        let idx = NgramIndex::build(["aaa"]);
        assert_eq!(idx.words("aa").unwrap(), &["aaa".to_string()]);
    }

    #[test]
    fn literal_prefix_and_suffix_filter_candidates() {
        let idx = NgramIndex::build(["content", "count", "consent"]);
        let mut hits = idx.resolve("con*nt", &cfg()).unwrap();
        hits.sort();
        assert_eq!(hits, vec!["consent", "content"]);
    }

    #[test]
    fn co_star_nt_also_matches_count() {
        let idx = NgramIndex::build(["content", "count", "consent"]);
        let hits = idx.resolve("co*nt", &cfg()).unwrap();
        assert_eq!(hits, vec!["content", "count", "consent"]);
    }

    #[test]
    fn gram_intersection_false_positive_removed() {
        let idx = NgramIndex::build(["red", "reused", "read"]);
        assert_eq!(idx.resolve("re*ed", &cfg()).unwrap(), vec!["reused"]);
    }

    #[test]
    fn leading_and_trailing_wildcards() {
        let idx = NgramIndex::build(["management", "payment", "pay", "computer", "compute"]);
        assert_eq!(idx.resolve("*ment", &cfg()).unwrap(), vec!["management", "payment"]);
        assert_eq!(idx.resolve("comput*", &cfg()).unwrap(), vec!["computer", "compute"]);
        assert_eq!(idx.resolve("PAY*", &cfg()).unwrap(), vec!["payment", "pay"]);
    }

    #[test]
    fn absent_gram_is_empty_not_error() {
        let idx = NgramIndex::build(["content"]);
        assert!(idx.resolve("xy*", &cfg()).unwrap().is_empty());
    }

    #[test]
    fn zero_or_many_stars_rejected() {
        let idx = NgramIndex::build(["content"]);
        assert!(matches!(idx.resolve("content", &cfg()), Err(SiftError::Wildcard { .. })));
        assert!(matches!(idx.resolve("c*n*t", &cfg()), Err(SiftError::Wildcard { .. })));
        assert!(matches!(idx.resolve("*", &cfg()), Err(SiftError::Wildcard { .. })));
    }

    #[test]
    fn joiners_in_pattern_are_stripped() {
        let docs = [Document::new(0, "", "Pre-processing", "snake_case handling")];
        let idx = NgramIndex::from_documents(&docs, &cfg());
        assert_eq!(idx.resolve("pre-proc*", &cfg()).unwrap(), vec!["preprocessing"]);
        assert_eq!(idx.resolve("snake_c*", &cfg()).unwrap(), vec!["snakecase"]);
    }
}
