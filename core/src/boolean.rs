//! Boolean retrieval: wildcard rewrite, infix to postfix, set evaluation.
//!
//! Operators carry no precedence. They are pushed as they appear and only
//! parentheses decide grouping, so `a AND b OR c` reads as `a AND (b OR c)`.
//! Use parentheses to say what you mean.

use crate::config::TextConfig;
use crate::error::{Result, SiftError};
use crate::index::{DocId, WeightedIndex};
use crate::ngram::{is_wildcard, NgramIndex};
use crate::tokenizer::tokenize;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Operator {
    And,
    Or,
    Not,
}

impl Operator {
    pub fn parse(word: &str) -> Option<Self> {
        match word {
            "AND" => Some(Operator::And),
            "OR" => Some(Operator::Or),
            "NOT" => Some(Operator::Not),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operator::And => "AND",
            Operator::Or => "OR",
            Operator::Not => "NOT",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Operand {
    Term(String),
    /// A wildcard that matched no vocabulary word; evaluates to the empty set.
    NoMatch(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Infix {
    Operand(Operand),
    Operator(Operator),
    Open,
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Postfix {
    Operand(Operand),
    Operator(Operator),
}

/// Split a raw query into infix elements, expanding each wildcard operand
/// into a parenthesized OR group of its matches.
pub fn rewrite(query: &str, ngrams: &NgramIndex, config: &TextConfig) -> Result<Vec<Infix>> {
    let spaced = query.replace('(', " ( ").replace(')', " ) ");
    let mut out = Vec::new();
    for word in spaced.split_whitespace() {
        match word {
            "(" => out.push(Infix::Open),
            ")" => out.push(Infix::Close),
            _ => {
                if let Some(op) = Operator::parse(word) {
                    out.push(Infix::Operator(op));
                } else if is_wildcard(word) {
                    let matches = ngrams.resolve(word, config)?;
                    if matches.is_empty() {
                        out.push(Infix::Operand(Operand::NoMatch(word.to_string())));
                        continue;
                    }
                    out.push(Infix::Open);
                    for (i, m) in matches.into_iter().enumerate() {
                        if i > 0 {
                            out.push(Infix::Operator(Operator::Or));
                        }
                        out.push(Infix::Operand(Operand::Term(m)));
                    }
                    out.push(Infix::Close);
                } else {
                    out.push(Infix::Operand(Operand::Term(word.to_string())));
                }
            }
        }
    }
    Ok(out)
}

enum Pending {
    Op(Operator),
    Open,
}

/// Operator-stack conversion. Unbalanced parentheses are a syntax error.
pub fn to_postfix(elements: Vec<Infix>) -> Result<Vec<Postfix>> {
    let mut out = Vec::with_capacity(elements.len());
    let mut stack: Vec<Pending> = Vec::new();
    for element in elements {
        match element {
            Infix::Operand(o) => out.push(Postfix::Operand(o)),
            Infix::Operator(op) => stack.push(Pending::Op(op)),
            Infix::Open => stack.push(Pending::Open),
            Infix::Close => loop {
                match stack.pop() {
                    Some(Pending::Op(op)) => out.push(Postfix::Operator(op)),
                    Some(Pending::Open) => break,
                    None => return Err(SiftError::Syntax("')' without matching '('".into())),
                }
            },
        }
    }
    while let Some(pending) = stack.pop() {
        match pending {
            Pending::Op(op) => out.push(Postfix::Operator(op)),
            Pending::Open => return Err(SiftError::Syntax("'(' without matching ')'".into())),
        }
    }
    Ok(out)
}

/// Rewrite and convert a raw boolean query in one step.
pub fn parse(query: &str, ngrams: &NgramIndex, config: &TextConfig) -> Result<Vec<Postfix>> {
    to_postfix(rewrite(query, ngrams, config)?)
}

/// Evaluates postfix queries against a weighted index.
pub struct BooleanEngine<'a> {
    index: &'a WeightedIndex,
    config: TextConfig,
}

impl<'a> BooleanEngine<'a> {
    pub fn new(index: &'a WeightedIndex, config: TextConfig) -> Self {
        Self { index, config }
    }

    fn operand_docs(&self, operand: &Operand) -> BTreeSet<DocId> {
        match operand {
            Operand::NoMatch(_) => BTreeSet::new(),
            Operand::Term(raw) => match tokenize(raw, &self.config).first() {
                Some(term) => self.index.doc_ids(term),
                None => BTreeSet::new(),
            },
        }
    }

    /// Sorted docIDs satisfying the query. An empty query matches nothing.
    pub fn evaluate(&self, postfix: &[Postfix]) -> Result<Vec<DocId>> {
        let mut stack: Vec<BTreeSet<DocId>> = Vec::new();
        for item in postfix {
            match item {
                Postfix::Operand(o) => stack.push(self.operand_docs(o)),
                Postfix::Operator(Operator::Not) => {
                    let operand = stack.pop().ok_or_else(|| missing_operand(Operator::Not))?;
                    let complement = (0..self.index.num_docs()).filter(|d| !operand.contains(d)).collect();
                    stack.push(complement);
                }
                Postfix::Operator(op) => {
                    let (Some(right), Some(left)) = (stack.pop(), stack.pop()) else {
                        return Err(missing_operand(*op));
                    };
                    let combined = match op {
                        Operator::And => left.intersection(&right).copied().collect(),
                        _ => left.union(&right).copied().collect(),
                    };
                    stack.push(combined);
                }
            }
        }
        if stack.len() > 1 {
            return Err(SiftError::Syntax(format!("{} operands left without an operator", stack.len())));
        }
        let result: Vec<DocId> = stack.pop().map(|s| s.into_iter().collect()).unwrap_or_default();
        tracing::debug!(items = postfix.len(), hits = result.len(), "boolean evaluation");
        Ok(result)
    }

    pub fn search(&self, query: &str, ngrams: &NgramIndex) -> Result<Vec<DocId>> {
        self.evaluate(&parse(query, ngrams, &self.config)?)
    }
}

fn missing_operand(op: Operator) -> SiftError {
    SiftError::Syntax(format!("{op} is missing an operand"))
}
