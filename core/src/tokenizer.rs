use crate::config::TextConfig;
use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref JOINERS: Regex = Regex::new(r"[-_]+").expect("valid regex");
    static ref PERIOD_PUNCT: Regex = Regex::new(r"\.[[:punct:]]").expect("valid regex");
    static ref NON_ALNUM: Regex = Regex::new(r"[^a-zA-Z0-9\s]+").expect("valid regex");
    static ref LOOSE_SPECIAL: Regex = Regex::new(r"[^a-zA-Z0-9\-.]+").expect("valid regex");
    static ref PUNCT_BEFORE_SPACE: Regex = Regex::new(r"[[:punct:]]+\s").expect("valid regex");
    static ref PUNCT_AFTER_SPACE: Regex = Regex::new(r"\s[[:punct:]]+").expect("valid regex");
    static ref FINAL_PERIOD: Regex = Regex::new(r"\.$").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","an","and","are","as","at","be","but","by",
            "for","if","in","into","is","it",
            "no","not","of","on","or","such",
            "that","the","their","then","there","these","they","this","to",
            "was","will","with",
        ];
        words.iter().copied().collect()
    };
}

pub fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

fn normalize(text: &str) -> String {
    let folded: String = text.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    let joined = JOINERS.replace_all(&folded, "");
    let spaced = PERIOD_PUNCT.replace_all(&joined, " ");
    NON_ALNUM.replace_all(&spaced, "").into_owned()
}

fn clean_loosely(text: &str) -> String {
    let s = LOOSE_SPECIAL.replace_all(text, " ");
    let s = PUNCT_BEFORE_SPACE.replace_all(&s, " ");
    let s = PUNCT_AFTER_SPACE.replace_all(&s, " ");
    FINAL_PERIOD.replace_all(&s, "").into_owned()
}

/// Tokenize text into an ordered token sequence.
///
/// Pure function of `(text, config)`: build-time and query-time callers must
/// pass the same `TextConfig` or lookups will not line up.
pub fn tokenize(text: &str, config: &TextConfig) -> Vec<String> {
    let cleaned = if config.normalize { normalize(text) } else { clean_loosely(text) };
    cleaned
        .split_whitespace()
        .map(str::to_lowercase)
        .filter(|token| !(config.remove_stopwords && is_stopword(token)))
        .map(|token| if config.stem { STEMMER.stem(&token).into_owned() } else { token })
        .collect()
}

/// Fold a wildcard pattern the way [`tokenize`] folds words, keeping `*`.
pub fn fold_pattern(pattern: &str, config: &TextConfig) -> String {
    let lower = pattern.to_lowercase();
    if !config.normalize {
        return lower;
    }
    let folded: String = lower.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    JOINERS.replace_all(&folded, "").into_owned()
}

/// Tokenize each word of an already split list and concatenate the results.
pub fn tokenize_words<S: AsRef<str>>(words: &[S], config: &TextConfig) -> Vec<String> {
    words.iter().flat_map(|w| tokenize(w.as_ref(), config)).collect()
}
