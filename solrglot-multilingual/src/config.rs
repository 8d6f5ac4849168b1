//! Configuration for the multilingual layer
//!
//! Loaded from a TOML file; every key is optional.
//!
//! ```toml
//! limit_to_content_language = true
//! language_field = "ss_search_api_language"
//!
//! [languages]
//! current = "de"
//! enabled = ["de", "en"]
//!
//! [logging]
//! level = "debug"
//! format = "json"
//! ```

use crate::error::MultilingualError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MultilingualConfig {
    /// Search only the language of the current request
    #[serde(default)]
    pub limit_to_content_language: bool,

    /// Also search documents tagged `und` and `zxx`
    #[serde(default)]
    pub include_language_independent: bool,

    /// Index into the canonical fields when the schema lacks a language
    #[serde(default = "default_true")]
    pub language_unspecific_fallback: bool,

    /// Results are read from the engine; the language field is then
    /// already part of the returned data
    #[serde(default)]
    pub retrieve_data: bool,

    #[serde(default = "default_language_field")]
    pub language_field: String,

    #[serde(default = "default_id_field")]
    pub id_field: String,

    #[serde(default)]
    pub languages: LanguagesConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_true() -> bool {
    true
}

fn default_language_field() -> String {
    "ss_search_api_language".to_string()
}

fn default_id_field() -> String {
    "id".to_string()
}

impl Default for MultilingualConfig {
    fn default() -> Self {
        Self {
            limit_to_content_language: false,
            include_language_independent: false,
            language_unspecific_fallback: default_true(),
            retrieve_data: false,
            language_field: default_language_field(),
            id_field: default_id_field(),
            languages: LanguagesConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Languages known to the site
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LanguagesConfig {
    /// Content language of the current request
    #[serde(default = "default_current_language")]
    pub current: String,

    /// All configured languages, in fan-out order
    #[serde(default = "default_enabled_languages")]
    pub enabled: Vec<String>,
}

fn default_current_language() -> String {
    "en".to_string()
}

fn default_enabled_languages() -> Vec<String> {
    vec![default_current_language()]
}

impl Default for LanguagesConfig {
    fn default() -> Self {
        Self {
            current: default_current_language(),
            enabled: default_enabled_languages(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl MultilingualConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load a config file, falling back to defaults when it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: MultilingualConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Language ids end up inside field names and must not contain the
    /// `_` that terminates the language segment.
    pub fn validate(&self) -> crate::Result<()> {
        if self.language_field.is_empty() {
            return Err(MultilingualError::Config("language_field is empty".into()));
        }
        if self.id_field.is_empty() {
            return Err(MultilingualError::Config("id_field is empty".into()));
        }

        let languages = std::iter::once(&self.languages.current).chain(&self.languages.enabled);
        for language in languages {
            if language.is_empty() || language.contains('_') {
                return Err(MultilingualError::Config(format!(
                    "invalid language id '{}'",
                    language
                )));
            }
        }
        Ok(())
    }
}
