//! Language-specific field names
//!
//! A fulltext field gets one physical variant per language. The language id
//! is placed right after the type prefix of the decoded name and separated
//! with `;`, then the result is encoded again:
//!
//! - `tm_title` + `en` → `tm;en_title` → `tm_X3b_en_title`
//! - `ts_body^2` + `de` → `ts_X3b_de_body^2`
//!
//! `;` never survives encoding, so a projected name can always be told
//! apart from a canonical one.

use regex::Regex;
use solrglot::codec;
use solrglot::BoostedField;
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

/// Separates the type prefix from the language id
pub const LANGUAGE_SEPARATOR: char = ';';

/// The suggester field is shared by all languages
pub const SUGGEST_FIELD: &str = "twm_suggest";

static TYPE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-z]+)_").expect("valid type prefix pattern"));

static LANGUAGE_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-z]+);([^_]+?)_").expect("valid language segment pattern"));

/// A projected name split back into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedField {
    /// Encoded canonical name
    pub canonical: String,
    pub language: String,
}

/// Derives and resolves language-specific field names
pub struct LanguageFieldProjector;

impl LanguageFieldProjector {
    /// Project a field entry (with optional `^boost`) onto a language.
    ///
    /// Names without a lowercase type prefix, the suggester field and names
    /// that are already projected come back unchanged.
    pub fn project_field(entry: &str, language: &str) -> String {
        if !Self::is_valid_language(language) {
            tracing::warn!(language, field = entry, "Language id cannot be embedded in a field name");
            return entry.to_string();
        }

        let field = BoostedField::parse(entry);
        if field.name == SUGGEST_FIELD {
            return entry.to_string();
        }

        let decoded = codec::decode(&field.name);
        let Some(prefix) = TYPE_PREFIX.captures(&decoded).and_then(|c| c.get(1)) else {
            return entry.to_string();
        };

        let interleaved = format!(
            "{}{}{}_{}",
            prefix.as_str(),
            LANGUAGE_SEPARATOR,
            language,
            &decoded[prefix.end() + 1..]
        );
        field.with_name(codec::encode(&interleaved)).to_string()
    }

    /// Project every entry; the map is keyed by the given entry.
    pub fn project_field_map<I, S>(entries: I, language: &str) -> BTreeMap<String, String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        entries
            .into_iter()
            .map(|entry| {
                let entry = entry.as_ref();
                (entry.to_string(), Self::project_field(entry, language))
            })
            .collect()
    }

    /// Split a projected engine name into canonical name and language.
    ///
    /// Returns `None` for names that carry no language segment.
    pub fn resolve(name: &str) -> Option<ResolvedField> {
        let decoded = codec::decode(name);
        let caps = LANGUAGE_SEGMENT.captures(&decoded)?;
        let prefix = caps.get(1)?.as_str();
        let language = caps.get(2)?.as_str();
        let rest = &decoded[caps.get(0)?.end()..];

        Some(ResolvedField {
            canonical: codec::encode(&format!("{}_{}", prefix, rest)),
            language: language.to_string(),
        })
    }

    /// Encoded dynamic-field prefix for a type prefix: `tm` + `en` → `tm_X3b_en_`
    pub fn language_specific_prefix(prefix: &str, language: &str) -> String {
        codec::encode(&format!("{}{}{}_", prefix, LANGUAGE_SEPARATOR, language))
    }

    /// Encoded name of the analyzed text type for a language
    pub fn field_type_name(language: &str) -> String {
        codec::encode(&format!("text_{}", language))
    }

    /// Language ids end at the first `_` of a projected name.
    pub fn is_valid_language(language: &str) -> bool {
        !language.is_empty() && !language.contains('_')
    }
}

/// Per-request projection tables, built once per (query, language).
#[derive(Debug, Clone, Default)]
pub struct FanOutTable {
    languages: Vec<String>,
    maps: HashMap<String, BTreeMap<String, String>>,
}

impl FanOutTable {
    /// Project `fields` onto every language, keeping the language order.
    pub fn build<S: AsRef<str>>(fields: &[S], languages: &[String]) -> Self {
        let mut table = Self::default();
        for language in languages {
            table.language_map(language, fields);
        }
        table
    }

    /// The map for `language`, projecting `fields` on first use
    pub fn language_map<S: AsRef<str>>(
        &mut self,
        language: &str,
        fields: &[S],
    ) -> &BTreeMap<String, String> {
        if !self.maps.contains_key(language) {
            self.languages.push(language.to_string());
        }
        self.maps.entry(language.to_string()).or_insert_with(|| {
            LanguageFieldProjector::project_field_map(fields.iter().map(|f| f.as_ref()), language)
        })
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    pub fn get(&self, language: &str) -> Option<&BTreeMap<String, String>> {
        self.maps.get(language)
    }

    /// The projected name of `field` for `language`, if it differs
    pub fn projected(&self, language: &str, field: &str) -> Option<&str> {
        self.maps
            .get(language)?
            .get(field)
            .filter(|projected| projected.as_str() != field)
            .map(String::as_str)
    }

    /// All projected variants of `field`, in language order
    pub fn variants(&self, field: &str) -> Vec<String> {
        self.languages
            .iter()
            .filter_map(|language| self.projected(language, field))
            .map(str::to_string)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}
