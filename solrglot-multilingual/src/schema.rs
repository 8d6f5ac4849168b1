//! Schema lookups for language-specific field types and dynamic fields

use crate::error::MultilingualError;
use crate::projector::LanguageFieldProjector;
use crate::Result;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

/// Kinds of schema elements the multilingual layer depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SchemaKind {
    FieldTypes,
    DynamicFields,
}

impl SchemaKind {
    /// Path segment of the schema REST API
    pub fn as_path(self) -> &'static str {
        match self {
            SchemaKind::FieldTypes => "fieldtypes",
            SchemaKind::DynamicFields => "dynamicfields",
        }
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SchemaKind::FieldTypes => "field type",
            SchemaKind::DynamicFields => "dynamic field",
        })
    }
}

/// Access to the live schema of the engine
pub trait SchemaInspector: Send + Sync {
    /// Names of all elements of one kind
    fn fetch(&self, kind: SchemaKind) -> Result<Vec<String>>;

    /// Try to add a missing field type. Returns `false` when unsupported.
    fn create_field_type(&self, _name: &str) -> Result<bool> {
        Ok(false)
    }

    /// Try to add a missing dynamic field. Returns `false` when unsupported.
    fn create_dynamic_field(&self, _name: &str, _field_type: &str) -> Result<bool> {
        Ok(false)
    }
}

/// A schema known up front
#[derive(Debug, Clone, Default)]
pub struct StaticSchema {
    pub field_types: Vec<String>,
    pub dynamic_fields: Vec<String>,
}

impl StaticSchema {
    /// Field types and `ts`/`tm` dynamic fields for every language
    pub fn for_languages<S: AsRef<str>>(languages: &[S]) -> Self {
        let mut schema = Self::default();
        for language in languages {
            let language = language.as_ref();
            schema
                .field_types
                .push(LanguageFieldProjector::field_type_name(language));
            for prefix in ["ts", "tm"] {
                schema.dynamic_fields.push(format!(
                    "{}*",
                    LanguageFieldProjector::language_specific_prefix(prefix, language)
                ));
            }
        }
        schema
    }
}

impl SchemaInspector for StaticSchema {
    fn fetch(&self, kind: SchemaKind) -> Result<Vec<String>> {
        Ok(match kind {
            SchemaKind::FieldTypes => self.field_types.clone(),
            SchemaKind::DynamicFields => self.dynamic_fields.clone(),
        })
    }
}

#[derive(Debug, Default)]
struct CachedParts {
    parts: HashMap<SchemaKind, HashSet<String>>,
    /// Kinds fetched since the last invalidation
    refreshed: HashSet<SchemaKind>,
}

/// Caches schema element names per kind.
///
/// A lookup miss refetches its kind once; later misses are answered from
/// the cache until [`SchemaPartsCache::invalidate`] is called.
pub struct SchemaPartsCache<I> {
    inspector: I,
    state: RwLock<CachedParts>,
}

impl<I: SchemaInspector> SchemaPartsCache<I> {
    pub fn new(inspector: I) -> Self {
        Self {
            inspector,
            state: RwLock::new(CachedParts::default()),
        }
    }

    pub fn inspector(&self) -> &I {
        &self.inspector
    }

    /// True when an element of `kind` named `name` exists.
    pub fn contains(&self, kind: SchemaKind, name: &str) -> Result<bool> {
        {
            let state = self.state.read();
            if let Some(names) = state.parts.get(&kind) {
                if !names.is_empty() && (names.contains(name) || state.refreshed.contains(&kind)) {
                    return Ok(names.contains(name));
                }
            }
        }

        let names = self.inspector.fetch(kind)?;
        if names.is_empty() {
            return Err(MultilingualError::Schema(format!(
                "no {} in schema response",
                kind
            )));
        }
        tracing::debug!(kind = %kind, count = names.len(), "Refreshed schema parts");

        let names: HashSet<String> = names.into_iter().collect();
        let found = names.contains(name);

        let mut state = self.state.write();
        state.parts.insert(kind, names);
        state.refreshed.insert(kind);
        Ok(found)
    }

    /// Forget everything; the next lookup of each kind refetches.
    pub fn invalidate(&self) {
        let mut state = self.state.write();
        state.parts.clear();
        state.refreshed.clear();
    }

    /// Whether the analyzed text type of each language exists
    pub fn language_statistics<S: AsRef<str>>(
        &self,
        languages: &[S],
    ) -> Result<BTreeMap<String, bool>> {
        languages
            .iter()
            .map(|language| {
                let language = language.as_ref();
                let name = LanguageFieldProjector::field_type_name(language);
                Ok((language.to_string(), self.contains(SchemaKind::FieldTypes, &name)?))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSchema {
        inner: StaticSchema,
        fetches: AtomicUsize,
    }

    impl SchemaInspector for CountingSchema {
        fn fetch(&self, kind: SchemaKind) -> Result<Vec<String>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.inner.fetch(kind)
        }
    }

    fn counting(languages: &[&str]) -> SchemaPartsCache<CountingSchema> {
        SchemaPartsCache::new(CountingSchema {
            inner: StaticSchema::for_languages(languages),
            fetches: AtomicUsize::new(0),
        })
    }

    #[test]
    fn test_static_schema_for_languages() {
        let schema = StaticSchema::for_languages(&["en"]);
        assert_eq!(schema.field_types, vec!["text_en"]);
        assert_eq!(schema.dynamic_fields, vec!["ts_X3b_en_*", "tm_X3b_en_*"]);
    }

    #[test]
    fn test_hits_are_cached() {
        let cache = counting(&["en", "de"]);
        assert!(cache.contains(SchemaKind::FieldTypes, "text_en").unwrap());
        assert!(cache.contains(SchemaKind::FieldTypes, "text_de").unwrap());
        assert_eq!(cache.inspector().fetches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_miss_refetches_once() {
        let cache = counting(&["en"]);
        assert!(!cache.contains(SchemaKind::FieldTypes, "text_fr").unwrap());
        assert!(!cache.contains(SchemaKind::FieldTypes, "text_fr").unwrap());
        assert_eq!(cache.inspector().fetches.load(Ordering::SeqCst), 1);

        cache.invalidate();
        assert!(!cache.contains(SchemaKind::FieldTypes, "text_fr").unwrap());
        assert_eq!(cache.inspector().fetches.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_kinds_are_cached_separately() {
        let cache = counting(&["en"]);
        cache.contains(SchemaKind::FieldTypes, "text_en").unwrap();
        assert!(cache
            .contains(SchemaKind::DynamicFields, "tm_X3b_en_*")
            .unwrap());
        assert_eq!(cache.inspector().fetches.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_empty_schema_response_is_an_error() {
        let cache = SchemaPartsCache::new(StaticSchema::default());
        let err = cache.contains(SchemaKind::DynamicFields, "tm_X3b_en_*").unwrap_err();
        assert!(matches!(err, MultilingualError::Schema(_)));
    }

    #[test]
    fn test_language_statistics() {
        let cache = counting(&["en"]);
        let stats = cache.language_statistics(&["en", "nl"]).unwrap();
        assert_eq!(stats.get("en"), Some(&true));
        assert_eq!(stats.get("nl"), Some(&false));
    }
}
