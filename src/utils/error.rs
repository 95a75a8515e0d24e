//! Error types and handling
//!
//! Common error taxonomy used across the disclosure subsystem.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure taxonomy for the disclosure-and-capture flow.
///
/// Engine-local variants (`PermissionDenied`, `DeviceError`, `RecorderError`,
/// `EmptyCapture`) never retry automatically; token-local and pipeline-local
/// variants are surfaced to the viewing state machine for caller-driven
/// recovery.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DisclosureError {
    #[error("camera/microphone permission denied: {0}")]
    PermissionDenied(String),

    #[error("capture device error: {0}")]
    DeviceError(String),

    #[error("recorder error: {0}")]
    RecorderError(String),

    #[error("capture produced no usable data")]
    EmptyCapture,

    #[error("disclosure grant expired")]
    Expired,

    #[error("disclosure grant already consumed")]
    AlreadyConsumed,

    #[error("not eligible for a disclosure grant: {0}")]
    NotEligible(String),

    #[error("recording upload rejected: {0}")]
    UploadRejected(String),

    #[error("network error: {0}")]
    NetworkError(String),
}

impl DisclosureError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            DisclosureError::PermissionDenied(_) => "PERMISSION_DENIED",
            DisclosureError::DeviceError(_) => "DEVICE_ERROR",
            DisclosureError::RecorderError(_) => "RECORDER_ERROR",
            DisclosureError::EmptyCapture => "EMPTY_CAPTURE",
            DisclosureError::Expired => "EXPIRED",
            DisclosureError::AlreadyConsumed => "ALREADY_CONSUMED",
            DisclosureError::NotEligible(_) => "NOT_ELIGIBLE",
            DisclosureError::UploadRejected(_) => "UPLOAD_REJECTED",
            DisclosureError::NetworkError(_) => "NETWORK_ERROR",
        }
    }
}

/// Error response for API-facing callers
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<DisclosureError> for ErrorResponse {
    fn from(error: DisclosureError) -> Self {
        ErrorResponse {
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}

/// Result type alias using DisclosureError
pub type DisclosureResult<T> = Result<T, DisclosureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_code_mapping() {
        let resp: ErrorResponse = DisclosureError::Expired.into();
        assert_eq!(resp.code, "EXPIRED");

        let resp: ErrorResponse = DisclosureError::PermissionDenied("camera".into()).into();
        assert_eq!(resp.code, "PERMISSION_DENIED");
        assert!(resp.message.contains("camera"));
    }
}
