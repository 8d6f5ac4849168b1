//! Language ids and the site language collaborator

use crate::config::LanguagesConfig;

/// Content whose language was never set
pub const LANGCODE_NOT_SPECIFIED: &str = "und";

/// Content that has no language (numbers, codes, images)
pub const LANGCODE_NOT_APPLICABLE: &str = "zxx";

/// Both language-independent ids, in fan-out order
pub const LANGUAGE_INDEPENDENT: [&str; 2] = [LANGCODE_NOT_SPECIFIED, LANGCODE_NOT_APPLICABLE];

/// Source of the request language and of all configured languages
pub trait LanguageContext: Send + Sync {
    /// Content language of the current request
    fn current_language(&self) -> String;

    /// All configured languages
    fn languages(&self) -> Vec<String>;
}

/// A fixed set of languages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticLanguageContext {
    current: String,
    languages: Vec<String>,
}

impl StaticLanguageContext {
    pub fn new(current: impl Into<String>, languages: Vec<String>) -> Self {
        Self {
            current: current.into(),
            languages,
        }
    }

    pub fn from_config(config: &LanguagesConfig) -> Self {
        Self::new(config.current.clone(), config.enabled.clone())
    }
}

impl LanguageContext for StaticLanguageContext {
    fn current_language(&self) -> String {
        self.current.clone()
    }

    fn languages(&self) -> Vec<String> {
        self.languages.clone()
    }
}
