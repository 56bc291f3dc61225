//! Content filter query language
//!
//! ```text
//! query     := "@" directive (";" directive)* ";" matcher
//!            | matcher
//! directive := "some" | ("len" | "length") "." N | <anything else, ignored>
//! matcher   := <JSON value> | token ("," token)* | ""
//! ```
//!
//! Parsing runs in three stages, each testable on its own:
//! `split_clauses` → `parse_directive` per clause → `parse_matcher`.
//!
//! The matcher is tried as strict JSON first; if that fails it is read as a
//! comma separated list of bare tokens. Only a malformed length directive is
//! an error.

use thiserror::Error;

use crate::filter::value::{Scalar, Value};

/// Errors in the directive section of a content query
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("invalid length threshold: {0:?}")]
    InvalidLength(String),
}

/// How per-token results are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchPolicy {
    /// Every token must appear among the leaves
    #[default]
    All,
    /// At least one token must appear
    Any,
}

/// One `@` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Some,
    MinLength(u64),
    Unknown(String),
}

/// Where the matcher tokens came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherSource {
    /// Empty residual: every record matches structurally
    Empty,
    /// Parsed as a JSON value and flattened
    Structured,
    /// Fallback comma list
    TokenList,
}

/// The residual matcher expression, reduced to literal tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct Matcher {
    pub source: MatcherSource,
    pub tokens: Vec<Scalar>,
}

/// A fully parsed content filter.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentQuery {
    pub policy: MatchPolicy,
    pub min_length: Option<u64>,
    pub matcher: Matcher,
}

impl Matcher {
    pub fn empty() -> Self {
        Self {
            source: MatcherSource::Empty,
            tokens: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl ContentQuery {
    /// Query that matches every record.
    pub fn match_all() -> Self {
        Self {
            policy: MatchPolicy::All,
            min_length: None,
            matcher: Matcher::empty(),
        }
    }

    fn apply(&mut self, directive: Directive) {
        match directive {
            Directive::Some => self.policy = MatchPolicy::Any,
            Directive::MinLength(n) => self.min_length = Some(n),
            Directive::Unknown(keyword) => {
                tracing::trace!(%keyword, "ignoring unknown filter directive");
            }
        }
    }
}

/// Parse raw content filter text.
pub fn parse(text: &str) -> Result<ContentQuery, QueryError> {
    let (directives, residual) = split_clauses(text);

    let mut query = ContentQuery::match_all();
    for clause in directives {
        query.apply(parse_directive(clause)?);
    }
    query.matcher = parse_matcher(residual);

    Ok(query)
}

/// Split the text into directive clauses and the residual expression.
///
/// Without a leading `@` the whole text is the residual.
pub fn split_clauses(text: &str) -> (Vec<&str>, &str) {
    if !text.starts_with('@') {
        return (Vec::new(), text);
    }

    let mut clauses: Vec<&str> = text.split(';').collect();
    // split always yields at least one item
    let residual = clauses.pop().unwrap_or_default();
    (clauses, residual)
}

/// Parse a single directive clause, with or without its leading `@`.
pub fn parse_directive(clause: &str) -> Result<Directive, QueryError> {
    let clause = clause.trim();
    let clause = clause.strip_prefix('@').unwrap_or(clause);
    let mut parts = clause.split('.');

    match parts.next().unwrap_or_default() {
        "some" => Ok(Directive::Some),
        "len" | "length" => {
            let raw = parts.next().unwrap_or_default().trim();
            raw.parse::<u64>()
                .map(Directive::MinLength)
                .map_err(|_| QueryError::InvalidLength(raw.to_string()))
        }
        _ => Ok(Directive::Unknown(clause.to_string())),
    }
}

/// Parse the residual expression into literal tokens.
///
/// Empty fallback tokens (e.g. from a trailing comma) are dropped.
pub fn parse_matcher(expression: &str) -> Matcher {
    let expression = expression.trim();
    if expression.is_empty() {
        return Matcher::empty();
    }

    if let Ok(value) = Value::parse(expression) {
        return Matcher {
            source: MatcherSource::Structured,
            tokens: value.flatten().into_iter().cloned().collect(),
        };
    }

    Matcher {
        source: MatcherSource::TokenList,
        tokens: expression
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| Scalar::Text(token.to_string()))
            .collect(),
    }
}

#[cfg(test)]
#[path = "query_test.rs"]
mod tests;
