//! Record inclusion predicate
//!
//! Everything here is pure: the same record and the same filter inputs
//! always give the same answer, so the filtered view can simply be
//! re-derived whenever anything changes.

use serde::{Deserialize, Serialize};

use crate::filter::query::{self, ContentQuery, MatchPolicy, QueryError};
use crate::filter::value::Value;
use crate::model::Record;

/// How the name filter and the content filter are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombinePolicy {
    #[default]
    And,
    Or,
}

impl CombinePolicy {
    pub fn toggled(self) -> Self {
        match self {
            CombinePolicy::And => CombinePolicy::Or,
            CombinePolicy::Or => CombinePolicy::And,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CombinePolicy::And => "and",
            CombinePolicy::Or => "or",
        }
    }
}

/// Filter inputs with the content query parsed once.
#[derive(Debug, Clone)]
pub struct FilterState {
    name: String,
    content: String,
    combine: CombinePolicy,
    /// `None` when the content text is blank
    query: Option<Result<ContentQuery, QueryError>>,
}

impl Default for FilterState {
    fn default() -> Self {
        Self::new("", "", CombinePolicy::default())
    }
}

impl FilterState {
    pub fn new(name: &str, content: &str, combine: CombinePolicy) -> Self {
        let query = if content.trim().is_empty() {
            None
        } else {
            Some(query::parse(content))
        };

        Self {
            name: name.to_string(),
            content: content.to_string(),
            combine,
            query,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn combine(&self) -> CombinePolicy {
        self.combine
    }

    /// True when neither filter narrows anything.
    pub fn is_empty(&self) -> bool {
        self.name.trim().is_empty() && self.query.is_none()
    }

    /// The parse error of the content query, if any.
    pub fn query_error(&self) -> Option<&QueryError> {
        match &self.query {
            Some(Err(e)) => Some(e),
            _ => None,
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        let name = name_matches(record, &self.name);
        // Short-circuit only where the combination no longer depends on content
        match (self.combine, name) {
            (CombinePolicy::And, false) => false,
            (CombinePolicy::Or, true) => true,
            _ => self.content_matches(record),
        }
    }

    fn content_matches(&self, record: &Record) -> bool {
        match &self.query {
            None => true,
            Some(Ok(query)) => query_matches(record, query),
            Some(Err(_)) => false,
        }
    }
}

/// Decide whether `record` is visible under the given filter texts.
pub fn matches(
    record: &Record,
    name_filter: &str,
    content_filter: &str,
    combine: CombinePolicy,
) -> bool {
    FilterState::new(name_filter, content_filter, combine).matches(record)
}

/// Name match: blank, exact id, or case-insensitive substring of the name.
pub fn name_matches(record: &Record, name_filter: &str) -> bool {
    let needle = name_filter.trim();
    if needle.is_empty() {
        return true;
    }

    if needle == record.type_id.to_string() {
        return true;
    }

    record
        .type_name
        .to_lowercase()
        .contains(&needle.to_lowercase())
}

/// Content match for raw filter text. Parse failures count as no match.
pub fn content_matches(record: &Record, content_filter: &str) -> bool {
    if content_filter.trim().is_empty() {
        return true;
    }

    match query::parse(content_filter) {
        Ok(query) => query_matches(record, &query),
        Err(_) => false,
    }
}

/// Content match for an already parsed query.
pub fn query_matches(record: &Record, query: &ContentQuery) -> bool {
    if let Some(min) = query.min_length {
        if record.byte_length < min {
            return false;
        }
    }

    let tokens = &query.matcher.tokens;
    if tokens.is_empty() {
        return true;
    }

    let leaves = match Value::parse(&record.content) {
        Ok(value) => value.leaf_set(),
        Err(_) => return false,
    };

    match query.policy {
        MatchPolicy::All => tokens.iter().all(|token| leaves.contains(token)),
        MatchPolicy::Any => tokens.iter().any(|token| leaves.contains(token)),
    }
}

#[cfg(test)]
#[path = "eval_test.rs"]
mod tests;
