//! Cost analytics error types

use thiserror::Error;

/// Cost analytics error types
///
/// Insufficient data is never reported through this type; analyzers return
/// sentinel results for that case instead.
#[derive(Debug, Error)]
pub enum CostAnalyticsError {
    /// A caller supplied a parameter outside its valid range
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    ConfigurationError { message: String },

    /// The cost data source could not be read
    #[error("Cost data source failed: {message}")]
    DataSource { message: String },

    /// An alert could not be delivered
    #[error("Alert delivery failed on {channel}: {reason}")]
    AlertDelivery { channel: String, reason: String },

    /// I/O error
    #[error("I/O error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {source}")]
    JsonError {
        #[from]
        source: serde_json::Error,
    },
}

impl CostAnalyticsError {
    /// Shorthand for [`CostAnalyticsError::InvalidParameter`]
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for [`CostAnalyticsError::ConfigurationError`]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }
}

/// Cost analytics result type
pub type CostAnalyticsResult<T> = Result<T, CostAnalyticsError>;
