//! Error types for pgfilter

use thiserror::Error;

/// Result type alias for pgfilter operations
pub type FilterResult<T> = Result<T, FilterError>;

/// Errors raised while building or compiling a query.
///
/// Unrecognized operators are not errors unless the builder is configured
/// with [`UnknownOperatorPolicy::Reject`](crate::UnknownOperatorPolicy::Reject).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// A combinator, `BETWEEN` or operator node has a value of unexpected shape
    #[error("Malformed where clause: {0}")]
    MalformedWhereClause(String),

    /// Sort direction outside `ASC` / `DESC`
    #[error("Invalid sort direction: {0:?}")]
    InvalidSortDirection(String),

    /// Combinator key other than `AND` / `OR` / `NOT`
    #[error("Invalid boolean operator: {0:?}")]
    InvalidBooleanOperator(String),

    /// Operator token not in the supported set (strict mode only)
    #[error("Unknown operator {operator:?} on column '{column}'")]
    UnknownOperator { column: String, operator: String },

    /// Configuration could not be read or parsed
    #[error("Config error: {0}")]
    Config(String),
}

impl FilterError {
    /// Create a malformed where clause error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedWhereClause(message.into())
    }

    /// Check if this is a malformed where clause error
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedWhereClause(_))
    }

    /// Check if this is an invalid sort direction error
    pub fn is_invalid_sort_direction(&self) -> bool {
        matches!(self, Self::InvalidSortDirection(_))
    }

    /// Check if this is an unknown operator error
    pub fn is_unknown_operator(&self) -> bool {
        matches!(self, Self::UnknownOperator { .. })
    }
}

impl From<toml::de::Error> for FilterError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}
