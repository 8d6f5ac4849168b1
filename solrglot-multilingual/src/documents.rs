//! Moves fulltext values of outgoing documents into their language fields

use crate::config::MultilingualConfig;
use crate::error::MultilingualError;
use crate::projector::{LanguageFieldProjector, SUGGEST_FIELD};
use crate::schema::{SchemaInspector, SchemaKind, SchemaPartsCache};
use crate::Result;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

/// An engine document as field name → value
pub type Document = Map<String, Value>;

/// Dynamic-field type prefixes that get language variants
const TEXT_PREFIXES: [&str; 2] = ["ts", "tm"];

/// Renames fulltext fields of documents to the variant of their language
#[derive(Debug, Clone)]
pub struct DocumentProjector {
    language_field: String,
    fallback: bool,
}

impl DocumentProjector {
    pub fn new(config: &MultilingualConfig) -> Self {
        Self {
            language_field: config.language_field.clone(),
            fallback: config.language_unspecific_fallback,
        }
    }

    /// Language id stored in a document
    pub fn language_of<'a>(&self, doc: &'a Document) -> Option<&'a str> {
        match doc.get(&self.language_field)? {
            Value::String(language) => Some(language),
            Value::Array(values) => values.first()?.as_str(),
            _ => None,
        }
    }

    /// Rename the fulltext fields of each document to their projected names.
    ///
    /// Every language found in the batch is checked against the schema
    /// first. A missing part fails the batch unless the fallback is
    /// enabled, in which case documents of that language keep their
    /// canonical fields.
    pub fn project_documents<I: SchemaInspector>(
        &self,
        docs: &mut [Document],
        fulltext_fields: &[String],
        schema: &SchemaPartsCache<I>,
    ) -> Result<()> {
        let fulltext: HashSet<&str> = fulltext_fields.iter().map(String::as_str).collect();

        let mut maps: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        for doc in docs.iter() {
            let Some(language) = self.language_of(doc) else {
                continue;
            };
            for field in doc.keys() {
                if !fulltext.contains(field.as_str()) || field == SUGGEST_FIELD {
                    continue;
                }
                let projected = LanguageFieldProjector::project_field(field, language);
                if projected != *field {
                    maps.entry(language.to_string())
                        .or_default()
                        .insert(field.clone(), projected);
                }
            }
        }

        let mut supported = HashSet::new();
        for language in maps.keys() {
            if self.ensure_schema(language, schema)? {
                supported.insert(language.clone());
            }
        }

        for doc in docs.iter_mut() {
            let Some(map) = self
                .language_of(doc)
                .filter(|language| supported.contains(*language))
                .and_then(|language| maps.get(language))
            else {
                continue;
            };
            for (field, projected) in map {
                if let Some(value) = doc.remove(field) {
                    doc.insert(projected.clone(), value);
                }
            }
        }

        Ok(())
    }

    /// Check (or create) the field type and dynamic fields of a language.
    ///
    /// Returns `false` when something is missing and the fallback applies.
    fn ensure_schema<I: SchemaInspector>(
        &self,
        language: &str,
        schema: &SchemaPartsCache<I>,
    ) -> Result<bool> {
        let field_type = LanguageFieldProjector::field_type_name(language);
        if !schema.contains(SchemaKind::FieldTypes, &field_type)?
            && !schema.inspector().create_field_type(&field_type)?
        {
            return self.missing(language, SchemaKind::FieldTypes, field_type);
        }

        for prefix in TEXT_PREFIXES {
            let dynamic_field = format!(
                "{}*",
                LanguageFieldProjector::language_specific_prefix(prefix, language)
            );
            if !schema.contains(SchemaKind::DynamicFields, &dynamic_field)?
                && !schema
                    .inspector()
                    .create_dynamic_field(&dynamic_field, &field_type)?
            {
                return self.missing(language, SchemaKind::DynamicFields, dynamic_field);
            }
        }

        Ok(true)
    }

    fn missing(&self, language: &str, kind: SchemaKind, name: String) -> Result<bool> {
        if self.fallback {
            tracing::warn!(language, kind = %kind, name = %name, "Schema part missing, indexing language unspecific");
            Ok(false)
        } else {
            Err(MultilingualError::missing(language, kind, name))
        }
    }
}
