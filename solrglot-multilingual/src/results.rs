//! Maps engine responses back to canonical field names
//!
//! Documents and highlighting entries expose the variant of their own
//! language under the canonical name; variants of other languages are
//! dropped. Facet counts of all variants are merged into the canonical
//! facet field.

use crate::config::MultilingualConfig;
use crate::documents::Document;
use crate::projector::LanguageFieldProjector;
use crate::Result;
use serde::de::Error as _;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Select response body; unknown sections are carried through
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<DocumentList>,

    /// Document id → field → snippets, in engine order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlighting: Option<IndexMap<String, Map<String, Value>>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facet_counts: Option<FacetCounts>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentList {
    #[serde(rename = "numFound", default)]
    pub num_found: u64,
    #[serde(default)]
    pub start: u64,
    #[serde(default)]
    pub docs: Vec<Document>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacetCounts {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub facet_fields: IndexMap<String, FacetTerms>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One facet bucket; `term` is `None` for the "missing" bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetTerm {
    pub term: Option<String>,
    pub count: u64,
}

/// Facet counts of one field in engine order.
///
/// Reads the flat `["x", 2, "y", 1]` list as well as `{"x": 2, "y": 1}`
/// and always writes the flat list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetTerms(pub Vec<FacetTerm>);

impl FacetTerms {
    pub fn get(&self, term: &str) -> Option<u64> {
        self.0
            .iter()
            .find(|t| t.term.as_deref() == Some(term))
            .map(|t| t.count)
    }

    /// Add the counts of `other`, appending terms not seen yet.
    pub fn merge(&mut self, other: FacetTerms) {
        for incoming in other.0 {
            match self.0.iter_mut().find(|t| t.term == incoming.term) {
                Some(existing) => existing.count += incoming.count,
                None => self.0.push(incoming),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for FacetTerms {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        FacetTerms(
            iter.into_iter()
                .map(|(term, count)| FacetTerm {
                    term: Some(term.into()),
                    count,
                })
                .collect(),
        )
    }
}

impl Serialize for FacetTerms {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len() * 2))?;
        for term in &self.0 {
            seq.serialize_element(&term.term)?;
            seq.serialize_element(&term.count)?;
        }
        seq.end()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FacetTermsRepr {
    Flat(Vec<Value>),
    Object(Map<String, Value>),
}

impl<'de> Deserialize<'de> for FacetTerms {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let count = |value: &Value| {
            value
                .as_u64()
                .ok_or_else(|| D::Error::custom(format!("invalid facet count: {}", value)))
        };

        match FacetTermsRepr::deserialize(deserializer)? {
            FacetTermsRepr::Flat(values) => {
                if values.len() % 2 != 0 {
                    return Err(D::Error::custom("facet list has an odd number of entries"));
                }
                values
                    .chunks(2)
                    .map(|pair| {
                        let term = match &pair[0] {
                            Value::Null => None,
                            Value::String(s) => Some(s.clone()),
                            Value::Number(n) => Some(n.to_string()),
                            Value::Bool(b) => Some(b.to_string()),
                            other => {
                                return Err(D::Error::custom(format!("invalid facet term: {}", other)))
                            }
                        };
                        Ok(FacetTerm {
                            term,
                            count: count(&pair[1])?,
                        })
                    })
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map(FacetTerms)
            }
            FacetTermsRepr::Object(map) => map
                .iter()
                .map(|(term, value)| {
                    Ok(FacetTerm {
                        term: Some(term.clone()),
                        count: count(value)?,
                    })
                })
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(FacetTerms),
        }
    }
}

/// Rewrites responses of fanned-out queries
#[derive(Debug, Clone)]
pub struct MultilingualResultRewriter {
    language_field: String,
    id_field: String,
}

impl MultilingualResultRewriter {
    pub fn new(config: &MultilingualConfig) -> Self {
        Self {
            language_field: config.language_field.clone(),
            id_field: config.id_field.clone(),
        }
    }

    /// Rewrite a raw JSON body. Nothing is rewritten if it does not parse.
    pub fn rewrite_body(&self, body: &str) -> Result<String> {
        let response: EngineResponse = serde_json::from_str(body)?;
        Ok(serde_json::to_string(&self.rewrite(response))?)
    }

    pub fn rewrite(&self, mut response: EngineResponse) -> EngineResponse {
        let mut doc_languages = HashMap::new();

        if let Some(list) = response.response.as_mut() {
            for doc in &mut list.docs {
                let Some(language) = first_string(doc.get(&self.language_field)) else {
                    continue;
                };
                if let Some(id) = first_string(doc.get(&self.id_field)) {
                    doc_languages.insert(id, language.clone());
                }
                canonicalize(doc, &language);
            }
        }

        if let Some(highlighting) = response.highlighting.as_mut() {
            for (id, entry) in highlighting.iter_mut() {
                if let Some(language) = doc_languages.get(id) {
                    canonicalize(entry, language);
                }
            }
        }

        if let Some(facets) = response.facet_counts.as_mut() {
            merge_facets(&mut facets.facet_fields);
        }

        response
    }
}

/// Move variants of `language` to their canonical names, drop the others.
fn canonicalize(fields: &mut Map<String, Value>, language: &str) {
    let projected: Vec<(String, String, bool)> = fields
        .keys()
        .filter_map(|name| {
            let resolved = LanguageFieldProjector::resolve(name)?;
            Some((name.clone(), resolved.canonical, resolved.language == language))
        })
        .collect();

    for (name, canonical, matches) in projected {
        let Some(value) = fields.remove(&name) else {
            continue;
        };
        if matches {
            fields.insert(canonical, value);
        } else {
            tracing::trace!(field = %name, language, "Dropped field of another language");
        }
    }
}

/// Fold variants into their canonical field. The canonical field takes the
/// position of its first occurrence and its own terms come first.
fn merge_facets(facet_fields: &mut IndexMap<String, FacetTerms>) {
    let mut merged: IndexMap<String, FacetTerms> = IndexMap::with_capacity(facet_fields.len());
    let mut variants = Vec::new();

    for (name, terms) in std::mem::take(facet_fields) {
        match LanguageFieldProjector::resolve(&name) {
            Some(resolved) => {
                merged.entry(resolved.canonical.clone()).or_default();
                variants.push((resolved.canonical, terms));
            }
            None => merged.entry(name).or_default().merge(terms),
        }
    }

    for (canonical, terms) in variants {
        merged.entry(canonical).or_default().merge(terms);
    }

    *facet_fields = merged;
}

/// A string value, or the first element of a multi-valued field
fn first_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(values) => first_string(values.first()),
        _ => None,
    }
}
