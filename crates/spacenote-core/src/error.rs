//! Error types for SpaceNote.
//!
//! The first block of variants is the user-facing taxonomy every failure is
//! normalised into (HTTP status, transport failure, or local validation). The
//! second block covers failures raised by the schema and query machinery
//! before anything reaches the network.

use serde::Serialize;
use thiserror::Error;

/// Result type alias using SpaceNote's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for SpaceNote operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Authentication missing or expired (HTTP 401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (HTTP 403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found (HTTP 404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed request (HTTP 400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request understood but rejected by validation (HTTP 422, or local form checks)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Server-side failure (HTTP 5xx)
    #[error("Server error: {0}")]
    Server(String),

    /// Transport failure: connection refused, timeout, TLS, aborted body
    #[error("Network error: {0}")]
    Network(String),

    /// Field definition is not shape-compatible with its type
    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    /// Field name not present in the space schema
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// Filter condition or query string could not be used
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Stable, machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    BadRequest,
    Validation,
    ServerError,
    NetworkError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::Validation => "validation",
            Self::ServerError => "server_error",
            Self::NetworkError => "network_error",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Map an HTTP status to the matching taxonomy variant.
    ///
    /// Returns `None` for statuses outside the taxonomy (2xx/3xx and
    /// unclassified 4xx such as 409), which callers report as `BadRequest`.
    pub fn from_status(status: u16, message: impl Into<String>) -> Option<Self> {
        let message = message.into();
        match status {
            401 => Some(Error::Unauthorized(message)),
            403 => Some(Error::Forbidden(message)),
            404 => Some(Error::NotFound(message)),
            400 => Some(Error::BadRequest(message)),
            422 => Some(Error::Validation(message)),
            500..=599 => Some(Error::Server(message)),
            _ => None,
        }
    }

    /// Category code for this error.
    ///
    /// Local schema/query failures are reported as `validation`; local
    /// serialization and configuration failures as `bad_request`.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Unauthorized(_) => ErrorCode::Unauthorized,
            Error::Forbidden(_) => ErrorCode::Forbidden,
            Error::NotFound(_) | Error::UnknownField(_) => ErrorCode::NotFound,
            Error::BadRequest(_) | Error::Serialization(_) | Error::Config(_) => {
                ErrorCode::BadRequest
            }
            Error::Validation(_) | Error::InvalidField { .. } | Error::InvalidQuery(_) => {
                ErrorCode::Validation
            }
            Error::Server(_) => ErrorCode::ServerError,
            Error::Network(_) => ErrorCode::NetworkError,
        }
    }

    /// Human-readable message without the category prefix.
    pub fn message(&self) -> String {
        match self {
            Error::Unauthorized(m)
            | Error::Forbidden(m)
            | Error::NotFound(m)
            | Error::BadRequest(m)
            | Error::Validation(m)
            | Error::Server(m)
            | Error::Network(m)
            | Error::InvalidQuery(m)
            | Error::Serialization(m)
            | Error::Config(m) => m.clone(),
            Error::UnknownField(name) => format!("unknown field {}", name),
            Error::InvalidField { field, message } => format!("{}: {}", field, message),
        }
    }

    pub(crate) fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("space demo".to_string());
        assert_eq!(err.to_string(), "Not found: space demo");
    }

    #[test]
    fn test_error_display_invalid_field() {
        let err = Error::invalid_field("due", "default must be a datetime");
        assert_eq!(
            err.to_string(),
            "Invalid field 'due': default must be a datetime"
        );
    }

    #[test]
    fn test_from_status_mapping() {
        assert_eq!(
            Error::from_status(401, "x").map(|e| e.code()),
            Some(ErrorCode::Unauthorized)
        );
        assert_eq!(
            Error::from_status(403, "x").map(|e| e.code()),
            Some(ErrorCode::Forbidden)
        );
        assert_eq!(
            Error::from_status(404, "x").map(|e| e.code()),
            Some(ErrorCode::NotFound)
        );
        assert_eq!(
            Error::from_status(400, "x").map(|e| e.code()),
            Some(ErrorCode::BadRequest)
        );
        assert_eq!(
            Error::from_status(422, "x").map(|e| e.code()),
            Some(ErrorCode::Validation)
        );
        assert_eq!(
            Error::from_status(503, "x").map(|e| e.code()),
            Some(ErrorCode::ServerError)
        );
        assert!(Error::from_status(409, "x").is_none());
        assert!(Error::from_status(200, "x").is_none());
    }

    #[test]
    fn test_code_strings() {
        assert_eq!(ErrorCode::NotFound.as_str(), "not_found");
        assert_eq!(ErrorCode::ServerError.to_string(), "server_error");
        assert_eq!(
            Error::Network("refused".into()).code().as_str(),
            "network_error"
        );
    }

    #[test]
    fn test_message_strips_prefix() {
        let err = Error::Forbidden("not a member".into());
        assert_eq!(err.message(), "not a member");
        assert_eq!(err.to_string(), "Forbidden: not a member");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(_)));
        assert!(err.to_string().contains("Serialization error:"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
