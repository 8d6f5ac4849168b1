//! Error types for key flattening and filter rendering

use crate::keys::ParseMode;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Incompatible parse mode '{mode}': {reason}")]
    IncompatibleMode { mode: ParseMode, reason: String },

    #[error("Unknown parse mode: {0}")]
    UnknownParseMode(String),

    #[error("Unknown filter operator: {0}")]
    UnknownOperator(String),

    #[error("Invalid filter on '{field}': {reason}")]
    InvalidFilter { field: String, reason: String },
}

impl Error {
    pub(crate) fn incompatible(mode: ParseMode, reason: impl Into<String>) -> Self {
        Self::IncompatibleMode {
            mode,
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_filter(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidFilter {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// True for mode/field-arity violations raised by the flattener
    pub fn is_incompatible_mode(&self) -> bool {
        matches!(self, Self::IncompatibleMode { .. })
    }
}
