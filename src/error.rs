//! Error types for Synheart Health

use thiserror::Error;

/// Failure reported by the native health store (Health Connect / HealthKit).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct NativeError {
    pub message: String,
}

impl NativeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors surfaced to bridge callers
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid ISO-8601 date for {field}: {value}")]
    InvalidDate { field: &'static str, value: String },

    #[error("Invalid time range: start must be before end")]
    InvalidTimeRange,

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Unsupported bucket: {0}")]
    UnsupportedBucket(String),

    #[error("Permission not granted: {0}")]
    PermissionDenied(&'static str),

    #[error("A permission request is already in progress")]
    PermissionRequestInFlight,

    #[error("Health data is not available on this device")]
    HealthUnavailable,

    #[error("Error querying {operation}: {source}")]
    NativeQueryFailure {
        operation: &'static str,
        #[source]
        source: NativeError,
    },

    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl BridgeError {
    pub(crate) fn native(operation: &'static str, source: NativeError) -> Self {
        BridgeError::NativeQueryFailure { operation, source }
    }

    /// Stable machine-readable code for error envelopes
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::MissingParameter(_) => "MISSING_PARAMETER",
            BridgeError::InvalidDate { .. } => "INVALID_DATE",
            BridgeError::InvalidTimeRange => "INVALID_TIME_RANGE",
            BridgeError::UnsupportedDataType(_) => "UNSUPPORTED_DATA_TYPE",
            BridgeError::UnsupportedBucket(_) => "UNSUPPORTED_BUCKET",
            BridgeError::PermissionDenied(_) => "PERMISSION_DENIED",
            BridgeError::PermissionRequestInFlight => "PERMISSION_REQUEST_IN_FLIGHT",
            BridgeError::HealthUnavailable => "HEALTH_UNAVAILABLE",
            BridgeError::NativeQueryFailure { .. } => "NATIVE_QUERY_FAILURE",
            BridgeError::UnknownMethod(_) => "UNKNOWN_METHOD",
            BridgeError::JsonError(_) => "INVALID_JSON",
            BridgeError::InvalidConfig(_) => "INVALID_CONFIG",
        }
    }
}
