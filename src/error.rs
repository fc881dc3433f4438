//! Bridge error types with HTTP status code mapping.
//!
//! [`BridgeError`] is the central error type for the bridge. Transport
//! failures propagate as [`BridgeError::Connection`] and trigger a session
//! teardown; field-level problems surface as [`BridgeError::MalformedField`]
//! and are swallowed by the synchronizers after logging. Bounded reads never
//! produce an error: they return [`crate::session::Outcome::TimedOut`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Structured JSON error response body for the diagnostic router.
///
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "connection error: socket closed"
///   }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
}

/// Bridge error enum.
///
/// # Error Code Ranges
///
/// | Range     | Category              | HTTP Status                 |
/// |-----------|-----------------------|-----------------------------|
/// | 1000–1999 | Configuration / input | 400 Bad Request / 404       |
/// | 2000–2999 | Backend connection    | 502 Bad Gateway / 504       |
/// | 3000–3999 | Backend data          | 422 Unprocessable Entity    |
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    /// Missing or invalid configuration (server name, credentials, ports).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Transport-level failure talking to the backend.
    #[error("connection error: {0}")]
    Connection(String),

    /// The backend refused the configured credentials.
    #[error("authentication rejected for user {0}")]
    Authentication(String),

    /// A bounded wait elapsed.
    #[error("timed out after {0} ms")]
    Timeout(u64),

    /// A message field was present with an unexpected type.
    #[error("malformed field {field}: expected {expected}")]
    MalformedField {
        /// Wire name of the offending field.
        field: String,
        /// Type that was expected.
        expected: &'static str,
    },

    /// The backend answered a command with an error reply.
    #[error("backend rejected {method}: {reason}")]
    CommandRejected {
        /// Method name of the rejected command.
        method: String,
        /// Reason reported by the backend.
        reason: String,
    },

    /// Entity with the given id is not known to the bridge.
    #[error("not found: {0}")]
    NotFound(String),
}

impl BridgeError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Configuration(_) => 1001,
            Self::NotFound(_) => 1004,
            Self::Connection(_) => 2001,
            Self::Authentication(_) => 2002,
            Self::Timeout(_) => 2003,
            Self::MalformedField { .. } => 3001,
            Self::CommandRejected { .. } => 3002,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Configuration(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Connection(_) | Self::Authentication(_) => StatusCode::BAD_GATEWAY,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::MalformedField { .. } | Self::CommandRejected { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
        }
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_category() {
        assert_eq!(
            BridgeError::Configuration("no server".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            BridgeError::Timeout(5).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        let malformed = BridgeError::MalformedField {
            field: "channelNumber".to_string(),
            expected: "s64",
        };
        assert_eq!(malformed.error_code(), 3001);
        assert_eq!(malformed.to_string(), "malformed field channelNumber: expected s64");
    }

    #[test]
    fn into_response_sets_status() {
        let response = BridgeError::NotFound("channel 7".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
