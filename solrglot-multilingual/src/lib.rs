//! Multilingual field projection for Solr indexes
//!
//! Every fulltext field is stored once per language under a
//! language-specific name (`tm_title` → `tm_X3b_en_title`), so each
//! language can use its own analyzer. This crate keeps callers working in
//! canonical names:
//!
//! - [`projector`] - derive and resolve language-specific field names
//! - [`rewriter`] - fan queries, filters and field lists out per language
//! - [`results`] - map documents, highlighting and facets back
//! - [`documents`] - rename fields of documents before indexing
//! - [`schema`] - cached checks for language field types
//!
//! # Example
//!
//! ```
//! use solrglot::keys::{KeyGroup, ParseMode, SearchKeys};
//! use solrglot_multilingual::{
//!     MultilingualConfig, MultilingualQueryRewriter, SearchQuery, StaticLanguageContext,
//! };
//!
//! let rewriter = MultilingualQueryRewriter::new(
//!     MultilingualConfig::default(),
//!     StaticLanguageContext::new("en", vec!["en".into(), "de".into()]),
//! );
//! let query = SearchQuery::new(SearchKeys::parsed(KeyGroup::terms(["tree"])))
//!     .with_mode(ParseMode::Phrase)
//!     .with_fulltext_fields(["tm_title"])
//!     .with_query_fields(["tm_title"]);
//!
//! let prepared = rewriter.rewrite_query(&query).unwrap();
//! assert_eq!(
//!     prepared.query.as_deref(),
//!     Some("(tm_X3b_en_title:(+tree)^1) (tm_X3b_de_title:(+tree)^1)")
//! );
//! ```

pub mod config;
pub mod documents;
pub mod error;
pub mod language;
pub mod logging;
pub mod projector;
pub mod results;
pub mod rewriter;
pub mod schema;

pub use config::{LogFormat, LoggingConfig, MultilingualConfig};
pub use documents::{Document, DocumentProjector};
pub use error::MultilingualError;
pub use language::{LanguageContext, StaticLanguageContext};
pub use projector::{FanOutTable, LanguageFieldProjector, ResolvedField};
pub use results::{EngineResponse, FacetTerms, MultilingualResultRewriter};
pub use rewriter::{MultilingualQueryRewriter, PreparedQuery, SearchQuery};
pub use schema::{SchemaInspector, SchemaKind, SchemaPartsCache, StaticSchema};

/// Result type for multilingual operations
pub type Result<T> = std::result::Result<T, MultilingualError>;
