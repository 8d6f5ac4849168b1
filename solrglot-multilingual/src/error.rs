//! Error types for the multilingual layer

use crate::schema::SchemaKind;

#[derive(Debug, thiserror::Error)]
pub enum MultilingualError {
    #[error("Query error: {0}")]
    Query(#[from] solrglot::Error),

    #[error("Invalid response body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing {kind} '{name}' for language '{language}'")]
    MissingSchemaPart {
        language: String,
        kind: SchemaKind,
        name: String,
    },

    #[error("Schema lookup failed: {0}")]
    Schema(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MultilingualError {
    pub(crate) fn missing(language: &str, kind: SchemaKind, name: impl Into<String>) -> Self {
        Self::MissingSchemaPart {
            language: language.to_string(),
            kind,
            name: name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_schema_part_message() {
        let err = MultilingualError::missing("de", SchemaKind::FieldTypes, "text_de");
        assert_eq!(err.to_string(), "Missing field type 'text_de' for language 'de'");
    }

    #[test]
    fn test_query_error_converts() {
        let err: MultilingualError = solrglot::Error::UnknownParseMode("fuzzy".into()).into();
        assert!(matches!(err, MultilingualError::Query(_)));
    }
}
