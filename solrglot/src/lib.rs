//! Search-key flattening for Solr
//!
//! This crate turns structured search keys into Solr query strings and keeps
//! field names inside the identifier alphabet Solr is comfortable with.
//!
//! # Modules
//!
//! - [`codec`] - reversible `_X<hex>_` field-name encoding
//! - [`keys`] - the search-key expression tree and parse modes
//! - [`field`] - field entries with `^boost` suffixes
//! - [`escape`] - term/phrase escaping for the Lucene grammar
//! - [`flatten`] - key expression → query string
//! - [`filter`] - condition groups → filter queries
//!
//! # Example
//!
//! ```
//! use solrglot::keys::{KeyExpression, KeyGroup, ParseMode, SearchKeys};
//! use solrglot::flatten::{FlattenOptions, KeyFlattener};
//!
//! let keys = SearchKeys::parsed(KeyGroup::and(vec![
//!     KeyExpression::term("A"),
//!     KeyExpression::term("B"),
//! ]));
//! let flat = KeyFlattener::default()
//!     .flatten(&keys, &["x".to_string()], ParseMode::Phrase, &FlattenOptions::default())
//!     .unwrap();
//! assert_eq!(flat, "+(x:(+A +B)^1)");
//! ```

pub mod codec;
pub mod error;
pub mod escape;
pub mod field;
pub mod filter;
pub mod flatten;
pub mod keys;

pub use error::Error;
pub use escape::{QueryEscaper, SolrEscaper};
pub use field::BoostedField;
pub use filter::{Condition, ConditionGroup, ConditionItem, FilterQueryBuilder, FilterValue, Operator};
pub use flatten::{FlattenOptions, KeyFlattener};
pub use keys::{Conjunction, KeyExpression, KeyGroup, ParseMode, SearchKeys};

/// Result type for flattening and filter rendering
pub type Result<T> = std::result::Result<T, Error>;
