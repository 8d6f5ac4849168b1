//! Language fan-out of outgoing queries
//!
//! A query against canonical fulltext fields is turned into one query per
//! language against the language-specific variants of those fields. The
//! per-language queries are OR-combined into a single pre-escaped query
//! string and the query field list is cleared, so the engine receives them
//! verbatim.

use crate::config::MultilingualConfig;
use crate::language::{LanguageContext, LANGUAGE_INDEPENDENT};
use crate::projector::{FanOutTable, LanguageFieldProjector};
use crate::Result;
use serde::{Deserialize, Serialize};
use solrglot::flatten::enclose;
use solrglot::{
    BoostedField, Condition, ConditionGroup, ConditionItem, Conjunction, FilterQueryBuilder,
    FlattenOptions, KeyExpression, KeyFlattener, KeyGroup, ParseMode, SearchKeys, SolrEscaper,
};
use std::collections::{BTreeMap, BTreeSet};

/// Index status queries must see the index as stored
pub const TAG_SERVER_INDEX_STATUS: &str = "server_index_status";

/// More-like-this queries
pub const TAG_MLT: &str = "mlt";

/// Queries built by listing pages; never limited to the content language
pub const TAG_VIEWS: &str = "views";

/// Suggester context tag that stands for "all languages of the query"
pub const MULTILINGUAL_CONTEXT_TAG: &str = "drupal/langcode:multilingual";

const LANGCODE_CONTEXT_PREFIX: &str = "drupal/langcode:";

/// A search request in canonical field names
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    pub keys: Option<SearchKeys>,
    pub parse_mode: ParseMode,
    pub options: FlattenOptions,
    /// Engine names of the fulltext fields the query searches
    pub fulltext_fields: Vec<String>,
    /// Query field entries (`name` or `name^boost`)
    pub query_fields: Vec<String>,
    /// Index field identifier → engine name, used by filters
    pub field_names: BTreeMap<String, String>,
    /// Explicit languages; empty means "decide from configuration"
    pub languages: Vec<String>,
    pub conditions: ConditionGroup,
    pub highlight_fields: Vec<String>,
    pub mlt_fields: Vec<String>,
    pub facet_fields: Vec<String>,
    pub return_fields: Vec<String>,
    pub tags: BTreeSet<String>,
}

impl SearchQuery {
    pub fn new(keys: SearchKeys) -> Self {
        Self {
            keys: Some(keys),
            ..Default::default()
        }
    }

    pub fn with_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = mode;
        self
    }

    pub fn with_fulltext_fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.fulltext_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_query_fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.query_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_languages<S: Into<String>>(mut self, languages: impl IntoIterator<Item = S>) -> Self {
        self.languages = languages.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_conditions(mut self, conditions: ConditionGroup) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

/// Everything the engine request needs after rewriting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreparedQuery {
    /// Flattened `q`; `None` without keys
    pub query: Option<String>,
    /// `qf` entries; empty after a fan-out
    pub query_fields: Vec<String>,
    pub filter_queries: Vec<String>,
    pub highlight_fields: Vec<String>,
    pub mlt_fields: Vec<String>,
    pub facet_fields: Vec<String>,
    pub return_fields: Vec<String>,
    pub autocomplete_fields: Vec<String>,
    pub languages: Vec<String>,
    /// Keys as given, for restoring after the search
    pub original_keys: Option<SearchKeys>,
    /// True when `query` is the per-language combination
    pub fanned_out: bool,
}

/// Suggester request options after language handling
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuggesterOptions {
    pub context_filter_tags: Vec<String>,
    pub dictionary: Option<String>,
}

/// Rewrites [`SearchQuery`]s for language-specific fields
pub struct MultilingualQueryRewriter<C> {
    config: MultilingualConfig,
    context: C,
    flattener: KeyFlattener,
    filters: FilterQueryBuilder,
}

impl<C: LanguageContext> MultilingualQueryRewriter<C> {
    pub fn new(config: MultilingualConfig, context: C) -> Self {
        Self {
            config,
            context,
            flattener: KeyFlattener::default(),
            filters: FilterQueryBuilder::default(),
        }
    }

    pub fn config(&self) -> &MultilingualConfig {
        &self.config
    }

    /// Active languages of a query.
    ///
    /// Explicit languages win. Otherwise the content language is used when
    /// configured (never for listing queries), else all site languages.
    /// Index status and more-like-this queries keep what they carry.
    pub fn resolve_languages(&self, query: &SearchQuery) -> Vec<String> {
        if query.has_tag(TAG_SERVER_INDEX_STATUS) {
            return query.languages.clone();
        }
        if query.has_tag(TAG_MLT) {
            return embeddable(query.languages.clone());
        }

        let mut languages = if !query.languages.is_empty() {
            embeddable(query.languages.clone())
        } else if self.config.limit_to_content_language && !query.has_tag(TAG_VIEWS) {
            vec![self.context.current_language()]
        } else {
            embeddable(self.context.languages())
        };

        if self.config.include_language_independent {
            for language in LANGUAGE_INDEPENDENT {
                push_unique(&mut languages, language.to_string());
            }
        }

        tracing::debug!(languages = ?languages, "Resolved query languages");
        languages
    }

    /// Rewrite a query for the active languages.
    pub fn rewrite_query(&self, query: &SearchQuery) -> Result<PreparedQuery> {
        if query.has_tag(TAG_SERVER_INDEX_STATUS) {
            return self.unaltered(query);
        }

        let languages = self.resolve_languages(query);
        if languages.is_empty() {
            return self.unaltered(query);
        }

        let table = FanOutTable::build(&query.fulltext_fields, &languages);

        let mut prepared = PreparedQuery {
            query_fields: query.query_fields.clone(),
            filter_queries: self.filter_queries(query, &languages, &table)?,
            highlight_fields: highlight_fields(&query.highlight_fields, &table),
            mlt_fields: query.mlt_fields.clone(),
            facet_fields: facet_fields(&query.facet_fields, &table),
            return_fields: query.return_fields.clone(),
            autocomplete_fields: autocomplete_fields(&query.fulltext_fields, &table),
            languages,
            original_keys: query.keys.clone(),
            ..Default::default()
        };

        if !self.config.retrieve_data {
            // results are mapped back by document language
            push_unique(&mut prepared.return_fields, self.config.language_field.clone());
        }

        if query.has_tag(TAG_MLT) {
            prepared.mlt_fields = mlt_fields(&query.mlt_fields, &table);
            prepared.query = self.canonical_query(query)?;
        } else if let Some(keys) = &query.keys {
            match self.fan_out_keys(keys, query, &table)? {
                Some(combined) => {
                    prepared.query = Some(combined);
                    prepared.query_fields.clear();
                    prepared.fanned_out = true;
                }
                None => prepared.query = self.canonical_query(query)?,
            }
        }

        Ok(prepared)
    }

    /// Options for a suggester request over `languages`.
    ///
    /// The multilingual context tag is narrowed to the single active
    /// language (which also selects its dictionary) or dropped.
    pub fn suggester_options(&self, languages: &[String], context_filter_tags: &[String]) -> SuggesterOptions {
        let mut options = SuggesterOptions {
            context_filter_tags: context_filter_tags.to_vec(),
            dictionary: None,
        };
        if !context_filter_tags.iter().any(|t| t == MULTILINGUAL_CONTEXT_TAG) {
            return options;
        }

        if let [language] = languages {
            for tag in &mut options.context_filter_tags {
                if tag == MULTILINGUAL_CONTEXT_TAG {
                    *tag = format!("{}{}", LANGCODE_CONTEXT_PREFIX, language);
                }
            }
            options.dictionary = Some(language.clone());
        } else if let Some(pos) = options
            .context_filter_tags
            .iter()
            .position(|t| t == MULTILINGUAL_CONTEXT_TAG)
        {
            options.context_filter_tags.remove(pos);
        }
        options
    }

    fn unaltered(&self, query: &SearchQuery) -> Result<PreparedQuery> {
        Ok(PreparedQuery {
            query: self.canonical_query(query)?,
            query_fields: query.query_fields.clone(),
            filter_queries: self.filters.filter_queries(&query.conditions, &query.field_names)?,
            highlight_fields: query.highlight_fields.clone(),
            mlt_fields: query.mlt_fields.clone(),
            facet_fields: query.facet_fields.clone(),
            return_fields: query.return_fields.clone(),
            autocomplete_fields: query.fulltext_fields.clone(),
            languages: query.languages.clone(),
            original_keys: query.keys.clone(),
            fanned_out: false,
        })
    }

    fn canonical_query(&self, query: &SearchQuery) -> Result<Option<String>> {
        let Some(keys) = &query.keys else {
            return Ok(None);
        };
        let flat = self
            .flattener
            .flatten(keys, &query.query_fields, query.parse_mode, &query.options)?;
        Ok(Some(flat))
    }

    /// One flattened query per language, OR-combined.
    ///
    /// `None` when the query fields contain no projectable field; this is
    /// decided on the first language.
    fn fan_out_keys(
        &self,
        keys: &SearchKeys,
        query: &SearchQuery,
        table: &FanOutTable,
    ) -> Result<Option<String>> {
        if query.query_fields.is_empty() {
            return Ok(None);
        }

        let mut fragments = Vec::with_capacity(table.languages().len());
        for (i, language) in table.languages().iter().enumerate() {
            let fields: Vec<String> = query
                .query_fields
                .iter()
                .map(|entry| {
                    let field = BoostedField::parse(entry);
                    match table.projected(language, &field.name) {
                        Some(projected) => field.with_name(projected).to_string(),
                        None => entry.clone(),
                    }
                })
                .collect();

            if i == 0 && fields == query.query_fields {
                tracing::debug!(language = %language, "No language-specific query fields, keeping canonical query");
                return Ok(None);
            }

            let flat = self
                .flattener
                .flatten(keys, &fields, query.parse_mode, &query.options)?;
            if !flat.is_empty() {
                fragments.push(KeyExpression::Term(disjunct(&flat)));
            }
        }

        let combined = self.flattener.flatten(
            &SearchKeys::escaped(KeyGroup::or(fragments)),
            &[],
            ParseMode::Keys,
            &FlattenOptions::default(),
        )?;
        tracing::debug!(languages = table.languages().len(), query = %combined, "Fanned out query keys");
        Ok(Some(combined))
    }

    /// Filter queries with every condition restricted per language.
    ///
    /// Each top-level condition becomes
    /// `(+lang:"a" +cond_a) (+lang:"b" +cond_b) …`, where `cond_x` uses
    /// the fulltext field variants of language `x`.
    fn filter_queries(
        &self,
        query: &SearchQuery,
        languages: &[String],
        table: &FanOutTable,
    ) -> Result<Vec<String>> {
        let conditions = &query.conditions;
        if conditions.is_empty() || languages.is_empty() {
            return Ok(self.filters.filter_queries(conditions, &query.field_names)?);
        }

        let items = match conditions.conjunction {
            Conjunction::And => conditions.items.clone(),
            Conjunction::Or => vec![ConditionItem::Group(conditions.clone())],
        };

        let language_names: Vec<(&String, BTreeMap<String, String>)> = languages
            .iter()
            .map(|language| (language, language_field_names(query, language, table)))
            .collect();

        let mut fq = Vec::with_capacity(items.len());
        for item in items {
            if matches!(&item, ConditionItem::Group(group) if group.is_empty()) {
                continue;
            }

            let mut per_language = Vec::with_capacity(language_names.len());
            for (language, names) in &language_names {
                let restricted = ConditionGroup::and(vec![
                    Condition::eq(self.config.language_field.as_str(), language.as_str()).into(),
                    item.clone(),
                ]);
                per_language.push(self.filters.render_group(&restricted, names)?);
            }
            fq.push(FilterQueryBuilder::<SolrEscaper>::combine_or(&per_language));
        }

        Ok(fq)
    }
}

/// `+(…)` fragments lose their required marker so the combination is a
/// disjunction.
fn disjunct(flat: &str) -> String {
    match flat.strip_prefix('+') {
        Some(rest) if rest.starts_with('(') => enclose(rest),
        _ => enclose(flat),
    }
}

/// Field name table for filters of one language
fn language_field_names(
    query: &SearchQuery,
    language: &str,
    table: &FanOutTable,
) -> BTreeMap<String, String> {
    let mut names = query.field_names.clone();
    for field in &query.fulltext_fields {
        names.entry(field.clone()).or_insert_with(|| field.clone());
    }
    for name in names.values_mut() {
        if let Some(projected) = table.projected(language, name) {
            *name = projected.to_string();
        }
    }
    names
}

/// Fulltext fields replaced by all their language variants
fn highlight_fields(fields: &[String], table: &FanOutTable) -> Vec<String> {
    let mut rewritten = Vec::with_capacity(fields.len() * table.languages().len().max(1));
    for field in fields {
        let variants = table.variants(field);
        if variants.is_empty() {
            push_unique(&mut rewritten, field.clone());
        } else {
            for variant in variants {
                push_unique(&mut rewritten, variant);
            }
        }
    }
    rewritten
}

/// Canonical facet fields plus the variants of each language
fn facet_fields(fields: &[String], table: &FanOutTable) -> Vec<String> {
    let mut rewritten = fields.to_vec();
    for language in table.languages() {
        for field in fields {
            if let Some(projected) = table.projected(language, field) {
                push_unique(&mut rewritten, projected.to_string());
            }
        }
    }
    rewritten
}

/// Per language, projected fields; fields without a variant are kept
fn mlt_fields(fields: &[String], table: &FanOutTable) -> Vec<String> {
    let mut rewritten = Vec::new();
    for language in table.languages() {
        for field in fields {
            let name = table.projected(language, field).unwrap_or(field);
            push_unique(&mut rewritten, name.to_string());
        }
    }
    rewritten
}

fn autocomplete_fields(fulltext_fields: &[String], table: &FanOutTable) -> Vec<String> {
    let mut fields = Vec::new();
    for language in table.languages() {
        for field in fulltext_fields {
            let name = table.projected(language, field).unwrap_or(field);
            push_unique(&mut fields, name.to_string());
        }
    }
    fields
}

/// Drop language ids that cannot be part of a field name
fn embeddable(mut languages: Vec<String>) -> Vec<String> {
    languages.retain(|language| {
        let valid = LanguageFieldProjector::is_valid_language(language);
        if !valid {
            tracing::warn!(language = %language, "Ignoring language id that cannot be embedded in field names");
        }
        valid
    });
    languages
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}
