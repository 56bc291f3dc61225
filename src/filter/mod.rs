//! Packet filtering: name filter, content query language and evaluator.

pub mod eval;
pub mod query;
pub mod value;

pub use eval::{content_matches, matches, name_matches, CombinePolicy, FilterState};
pub use query::{ContentQuery, Directive, MatchPolicy, QueryError};
pub use value::{LeafSet, Scalar, Value};
