use sift_core::index::weight_for;
use sift_core::thesaurus::CancelFlag;
use sift_core::tokenizer::tokenize;
use sift_core::{DocId, Document, Engine, SiftError, TextConfig};
use std::collections::{BTreeSet, HashMap};

fn docs() -> Vec<Document> {
    vec![
        Document::new(0, "cocoa", "Bahia cocoa review", "Showers continued in the Bahia cocoa zone, helping the cocoa crop."),
        Document::new(1, "cocoa", "Cocoa exports", "Brazil cocoa exports fell while system design of the ports improved."),
        Document::new(2, "grain", "Wheat prices", "Wheat prices rose on export demand from Brazil."),
    ]
}

fn engine() -> Engine {
    Engine::build(docs(), TextConfig::default(), &CancelFlag::new()).unwrap()
}

fn literal_docs(docs: &[Document], token: &str) -> BTreeSet<DocId> {
    let cfg = TextConfig::default();
    docs.iter().filter(|d| d.tokens(&cfg).iter().any(|t| t == token)).map(|d| d.id).collect()
}

#[test]
fn and_query_is_literal_intersection() {
    let docs = docs();
    let engine = engine();
    for (a, b) in [("cocoa", "brazil"), ("brazil", "wheat"), ("bahia", "wheat")] {
        let expected: Vec<DocId> = literal_docs(&docs, a).intersection(&literal_docs(&docs, b)).copied().collect();
        assert_eq!(engine.evaluate_boolean(&format!("({a} AND {b})")).unwrap(), expected, "{a} AND {b}");
    }
}

#[test]
fn postings_have_no_duplicate_doc_ids() {
    let engine = engine();
    for record in engine.index().records() {
        assert_eq!(record.doc_ids().len(), record.postings.len(), "{}", record.token);
        assert!(record.postings.iter().all(|p| p.doc_id < engine.num_docs()));
    }
}

#[test]
fn weights_recompute_identically() {
    let docs = docs();
    let engine = engine();
    let cfg = TextConfig::default();
    let mut counts: HashMap<DocId, HashMap<String, u32>> = HashMap::new();
    for doc in &docs {
        let per_doc = counts.entry(doc.id).or_default();
        for token in doc.tokens(&cfg) {
            *per_doc.entry(token).or_insert(0) += 1;
        }
    }
    for record in engine.index().records() {
        let df = record.postings.len() as u32;
        for p in &record.postings {
            let per_doc = &counts[&p.doc_id];
            let max = per_doc.values().copied().max().unwrap();
            assert_eq!(per_doc[&record.token], p.freq);
            let expected = weight_for(p.freq, max, docs.len() as u32, df);
            assert_eq!(expected.to_bits(), p.weight.to_bits(), "{} in {}", record.token, p.doc_id);
        }
    }
}

#[test]
fn vector_space_ranking_ignores_token_order() {
    let engine = engine();
    let ab = engine.rank_tokens(&["cocoa", "brazil"]);
    let ba = engine.rank_tokens(&["brazil", "cocoa"]);
    assert_eq!(ab, ba);
    assert!(!ab.is_empty());
    assert!(ab.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
fn unknown_terms_are_empty_not_errors() {
    let engine = engine();
    assert!(engine.evaluate_boolean("unicorn").unwrap().is_empty());
    assert!(engine.rank_vector_space("unicorn").is_empty());
    assert!(engine.suggest_completions("unicorn").unwrap().is_empty());
    assert!(engine.evaluate_boolean("qq*").unwrap().is_empty());
}

#[test]
fn wildcard_and_syntax_errors_surface() {
    let engine = engine();
    assert!(matches!(engine.evaluate_boolean("(cocoa AND brazil"), Err(SiftError::Syntax(_))));
    assert!(matches!(engine.evaluate_boolean("c*c*"), Err(SiftError::Wildcard { .. })));
    assert!(matches!(engine.evaluate_boolean("*"), Err(SiftError::Wildcard { .. })));
}

#[test]
fn wildcard_resolves_against_unstemmed_words() {
    let engine = engine();
    // "showers" is stemmed to "shower" in the index but kept whole for wildcards.
    assert_eq!(engine.ngrams().resolve("show*", engine.config()).unwrap(), vec!["showers"]);
    assert_eq!(engine.evaluate_boolean("show*").unwrap(), vec![0]);
}

#[test]
fn completion_follows_successor_counts() {
    let engine = engine();
    assert_eq!(engine.suggest_completions("bahia").unwrap(), vec!["cocoa"]);
    assert_eq!(engine.suggest_completions("brazil AND system").unwrap(), vec!["design"]);
}

#[test]
fn expansion_keeps_query_first() {
    let engine = engine();
    let expanded = engine.expand_query(&["bahia"]);
    assert_eq!(expanded.terms[0].token, "bahia");
    assert_eq!(expanded.terms[0].weight, 1.0);
    assert!(expanded.terms.len() <= 3);
    for added in &expanded.terms[1..] {
        assert!(added.weight > 0.0 && added.weight <= 1.0);
        assert_ne!(added.token, "bahia");
    }
}

#[test]
fn cancelled_build_stops() {
    let cancel = CancelFlag::new();
    cancel.cancel();
    assert!(matches!(Engine::build(docs(), TextConfig::default(), &cancel), Err(SiftError::Cancelled)));
}
