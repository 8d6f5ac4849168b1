//! Field entries with optional boost suffixes (`title^2`, `title^=5`)

use crate::codec;
use std::fmt;

/// Boost rendered for fields that carry none
pub const DEFAULT_BOOST: &str = "^1";

/// A field name split from its `^` boost suffix.
///
/// The suffix is kept verbatim (including the `^`), so both relevance
/// boosts (`^2`) and constant scores (`^=5`) survive a rename.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BoostedField {
    pub name: String,
    pub boost: Option<String>,
}

impl BoostedField {
    /// Split an engine field entry on its first `^`.
    pub fn parse(entry: &str) -> Self {
        match entry.find('^') {
            Some(pos) if pos > 0 => Self {
                name: entry[..pos].to_string(),
                boost: Some(entry[pos..].to_string()),
            },
            _ => Self {
                name: entry.to_string(),
                boost: None,
            },
        }
    }

    /// Split a canonical entry and encode its base name for the engine.
    pub fn from_canonical(entry: &str) -> Self {
        let mut field = Self::parse(entry);
        field.name = codec::encode(&field.name);
        field
    }

    /// Boost suffix used in query strings
    pub fn boost_or_default(&self) -> &str {
        self.boost.as_deref().unwrap_or(DEFAULT_BOOST)
    }

    /// Same boost, different base name
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            boost: self.boost.clone(),
        }
    }

    /// `name^boost` with the default boost filled in
    pub fn weighted(&self) -> String {
        format!("{}{}", self.name, self.boost_or_default())
    }
}

impl fmt::Display for BoostedField {
    /// Renders the entry as it was given, without inventing a boost.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(boost) = &self.boost {
            f.write_str(boost)?;
        }
        Ok(())
    }
}
