//! Search-key expression tree and parse modes

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the children of a group are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

impl Conjunction {
    /// Lucene prefix operator applied to every clause of a group
    pub fn prefix(self) -> &'static str {
        match self {
            Conjunction::And => "+",
            Conjunction::Or => "",
        }
    }
}

/// A node of the search-key tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyExpression {
    /// A literal term or phrase
    Term(String),

    /// A nested sub-expression
    Group(KeyGroup),
}

impl KeyExpression {
    pub fn term(value: impl Into<String>) -> Self {
        KeyExpression::Term(value.into())
    }

    pub fn group(group: KeyGroup) -> Self {
        KeyExpression::Group(group)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KeyGroup {
    #[serde(default)]
    pub children: Vec<KeyExpression>,
    #[serde(default)]
    pub conjunction: Conjunction,
    #[serde(default)]
    pub negated: bool,
}

impl KeyGroup {
    pub fn new(children: Vec<KeyExpression>, conjunction: Conjunction) -> Self {
        Self {
            children,
            conjunction,
            negated: false,
        }
    }

    pub fn and(children: Vec<KeyExpression>) -> Self {
        Self::new(children, Conjunction::And)
    }

    pub fn or(children: Vec<KeyExpression>) -> Self {
        Self::new(children, Conjunction::Or)
    }

    /// Build an AND group from plain terms
    pub fn terms<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::and(terms.into_iter().map(KeyExpression::term).collect())
    }

    pub fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    pub fn push(&mut self, child: KeyExpression) {
        self.children.push(child);
    }

    /// True when no term anywhere below this group has content
    pub fn is_empty(&self) -> bool {
        self.children.iter().all(|child| match child {
            KeyExpression::Term(t) => t.trim().is_empty(),
            KeyExpression::Group(g) => g.is_empty(),
        })
    }

    /// True when any direct child is a group
    pub fn has_nested_groups(&self) -> bool {
        self.children
            .iter()
            .any(|child| matches!(child, KeyExpression::Group(_)))
    }
}

/// Top-level search keys as handed over by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchKeys {
    /// Unprocessed user input; only `direct` mode accepts it
    Raw(String),

    /// A key tree; `escaped` terms are engine-ready fragments
    Parsed {
        root: KeyGroup,
        #[serde(default)]
        escaped: bool,
    },
}

impl SearchKeys {
    pub fn raw(keys: impl Into<String>) -> Self {
        SearchKeys::Raw(keys.into())
    }

    pub fn parsed(root: KeyGroup) -> Self {
        SearchKeys::Parsed {
            root,
            escaped: false,
        }
    }

    /// Keys whose terms are already valid query fragments
    pub fn escaped(root: KeyGroup) -> Self {
        SearchKeys::Parsed {
            root,
            escaped: true,
        }
    }

    pub fn is_escaped(&self) -> bool {
        matches!(self, SearchKeys::Parsed { escaped: true, .. })
    }
}

/// How search keys are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseMode {
    #[default]
    Terms,
    SloppyTerms,
    Phrase,
    SloppyPhrase,
    FuzzyTerms,
    Edismax,
    Direct,
    Keys,
}

impl ParseMode {
    pub const ALL: [ParseMode; 8] = [
        ParseMode::Terms,
        ParseMode::SloppyTerms,
        ParseMode::Phrase,
        ParseMode::SloppyPhrase,
        ParseMode::FuzzyTerms,
        ParseMode::Edismax,
        ParseMode::Direct,
        ParseMode::Keys,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ParseMode::Terms => "terms",
            ParseMode::SloppyTerms => "sloppy_terms",
            ParseMode::Phrase => "phrase",
            ParseMode::SloppyPhrase => "sloppy_phrase",
            ParseMode::FuzzyTerms => "fuzzy_terms",
            ParseMode::Edismax => "edismax",
            ParseMode::Direct => "direct",
            ParseMode::Keys => "keys",
        }
    }

    /// Modes that need at least one field
    pub fn requires_fields(self) -> bool {
        matches!(self, ParseMode::Edismax | ParseMode::Direct)
    }

    /// Modes that refuse any field
    pub fn forbids_fields(self) -> bool {
        matches!(self, ParseMode::Keys)
    }

    /// Modes that treat every key as a term or a quoted phrase
    pub fn is_phrase_family(self) -> bool {
        matches!(
            self,
            ParseMode::Terms
                | ParseMode::SloppyTerms
                | ParseMode::FuzzyTerms
                | ParseMode::Phrase
                | ParseMode::SloppyPhrase
                | ParseMode::Edismax
        )
    }

    /// Modes that add the per-term field disjunction
    pub fn is_terms_family(self) -> bool {
        matches!(
            self,
            ParseMode::Terms | ParseMode::SloppyTerms | ParseMode::FuzzyTerms
        )
    }

    pub fn is_sloppy(self) -> bool {
        matches!(self, ParseMode::SloppyTerms | ParseMode::SloppyPhrase)
    }

    pub fn is_fuzzy(self) -> bool {
        matches!(self, ParseMode::FuzzyTerms)
    }
}

impl fmt::Display for ParseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParseMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParseMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| Error::UnknownParseMode(s.to_string()))
    }
}
