//! Error types for fluxsql

use thiserror::Error;

/// Result type alias for fluxsql operations
pub type QbResult<T> = Result<T, QbError>;

/// Error types for query building and execution
#[derive(Debug, Error)]
pub enum QbError {
    /// A where/having field expression could not be interpreted
    #[error("Invalid condition: {0}")]
    InvalidCondition(String),

    /// Compilation attempted without any table reference
    #[error("No table has been set for this {0} statement")]
    UndefinedTable(&'static str),

    /// The active dialect cannot express the requested operation
    #[error("{dialect} does not support {feature}")]
    UnsupportedFeature {
        dialect: &'static str,
        feature: String,
    },

    /// Malformed argument (empty IN-list, missing comparison column, ...)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A write statement has no column data
    #[error("No data provided for {0}")]
    MissingData(&'static str),

    /// The builder has no driver to execute against
    #[error("No driver attached to this connection")]
    NoDriver,

    /// Error reported by the underlying driver
    #[error("Driver error: {0}")]
    Driver(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),
}

impl QbError {
    /// Create an unsupported-feature error for a dialect
    pub fn unsupported(dialect: &'static str, feature: impl Into<String>) -> Self {
        Self::UnsupportedFeature {
            dialect,
            feature: feature.into(),
        }
    }

    /// Create an invalid condition error
    pub fn invalid_condition(message: impl Into<String>) -> Self {
        Self::InvalidCondition(message.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a driver error
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver(message.into())
    }

    /// Check if this is an unsupported-feature error
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedFeature { .. })
    }

    /// Check if this is an undefined-table error
    pub fn is_undefined_table(&self) -> bool {
        matches!(self, Self::UndefinedTable(_))
    }
}

impl From<toml::de::Error> for QbError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<std::io::Error> for QbError {
    fn from(err: std::io::Error) -> Self {
        Self::Config(err.to_string())
    }
}
