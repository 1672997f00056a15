//! Error types for the Bowser client.

use thiserror::Error;

/// Result type alias using BowserError.
pub type BowserResult<T> = Result<T, BowserError>;

/// Primary error type for client operations.
///
/// None of these are fatal to a session: callers log them and fall back to
/// the previous state or drop the dependent parameter.
#[derive(Debug, Error)]
pub enum BowserError {
    // === Transport Errors ===
    #[error("Network failure calling {endpoint}: {message}")]
    Network { endpoint: String, message: String },

    #[error("Malformed response from {endpoint}: {message}")]
    MalformedResponse { endpoint: String, message: String },

    // === Data Errors ===
    #[error("No reference value for dataset '{dataset}' at time index {time_idx}")]
    MissingReferenceData { dataset: String, time_idx: usize },

    #[error("Dataset not found: {0}")]
    DatasetNotFound(String),

    // === State Errors ===
    #[error("Unknown action type: {0}")]
    UnknownAction(String),

    // === Storage Errors ===
    #[error("Preference storage unavailable: {0}")]
    StorageUnavailable(String),

    // === Configuration Errors ===
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl BowserError {
    pub fn network(endpoint: impl Into<String>, message: impl ToString) -> Self {
        BowserError::Network {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }

    pub fn malformed(endpoint: impl Into<String>, message: impl ToString) -> Self {
        BowserError::MalformedResponse {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }

    /// Short label used for log fields and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            BowserError::Network { .. } => "network",
            BowserError::MalformedResponse { .. } => "malformed_response",
            BowserError::MissingReferenceData { .. } => "missing_reference_data",
            BowserError::DatasetNotFound(_) => "dataset_not_found",
            BowserError::UnknownAction(_) => "unknown_action",
            BowserError::StorageUnavailable(_) => "storage_unavailable",
            BowserError::Config(_) => "config",
        }
    }
}

impl From<std::io::Error> for BowserError {
    fn from(err: std::io::Error) -> Self {
        BowserError::StorageUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for BowserError {
    fn from(err: serde_json::Error) -> Self {
        BowserError::malformed("json", err)
    }
}
