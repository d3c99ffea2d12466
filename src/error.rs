// src/error.rs
//! Application error types with structured error handling.
//!
//! Error types form the vocabulary for failure modes in the system.
//! Each error variant tells the story of what went wrong and where,
//! enabling composable recovery strategies.

use std::fmt;
use thiserror::Error;

/// Prismic API failure reasons as a typed vocabulary.
///
/// Prismic reports errors either with a JSON body carrying a `type` field
/// or with a bare HTTP status; both collapse into this enum so recovery
/// code never matches on strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrismicErrorCode {
    /// Too many requests; back off and retry
    RateLimited,
    /// The ref (release or preview session) no longer exists
    RefNotFound,
    /// Access token missing, invalid or revoked
    Unauthorized,
    /// The query string could not be parsed by the API
    QueryParsing,
    /// Prismic internal server error
    InternalError,
    /// Prismic is temporarily unavailable
    ServiceUnavailable,
    /// HTTP status code fallback when the error body is unparseable
    HttpStatus(u16),
    /// An error type this client doesn't recognize yet
    Unknown(String),
}

impl PrismicErrorCode {
    /// Parse the `type` field of a Prismic error body.
    pub fn from_api_response(code: &str) -> Self {
        match code {
            "api_notfound_error" | "api_ref_not_found" => Self::RefNotFound,
            "api_security_error" | "invalid_access_token" => Self::Unauthorized,
            "api_parsing_error" | "parsing-error" => Self::QueryParsing,
            "api_rate_limit_error" => Self::RateLimited,
            "api_internal_error" => Self::InternalError,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Create from an HTTP status code when the error body is unparseable.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Unauthorized,
            429 => Self::RateLimited,
            500 => Self::InternalError,
            502..=504 => Self::ServiceUnavailable,
            other => Self::HttpStatus(other),
        }
    }

    /// Whether this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::ServiceUnavailable | Self::InternalError
        )
    }

    /// Whether this error means the thing asked for simply doesn't exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RefNotFound | Self::HttpStatus(404))
    }
}

impl fmt::Display for PrismicErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited => write!(f, "rate_limited"),
            Self::RefNotFound => write!(f, "ref_not_found"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::QueryParsing => write!(f, "query_parsing"),
            Self::InternalError => write!(f, "internal_server_error"),
            Self::ServiceUnavailable => write!(f, "service_unavailable"),
            Self::HttpStatus(code) => write!(f, "http_{}", code),
            Self::Unknown(code) => write!(f, "{}", code),
        }
    }
}

/// Main application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("Network failure: {0}")]
    NetworkFailure(#[from] reqwest::Error),

    #[error("Prismic API returned an error ({code}): {message}")]
    PrismicService {
        code: PrismicErrorCode,
        message: String,
        status: reqwest::StatusCode,
    },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Filesystem IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template file not found at {path}: {source}")]
    TemplateNotFound {
        path: String,
        source: std::io::Error,
    },

    #[error("Template render error for template {name}: {message}")]
    TemplateRenderError { name: String, message: String },

    #[error("JSON parse error for {path}: {source}")]
    JsonParseError {
        path: std::path::PathBuf,
        source: serde_json::Error,
    },

    #[error("Post not found: {uid}")]
    PostNotFound { uid: String },

    #[error("A page of posts is already being loaded")]
    LoadInFlight,

    #[error("Loading more posts from {cursor} failed: {source}")]
    LoadMoreFailed {
        cursor: String,
        #[source]
        source: Box<AppError>,
    },

    #[error("Page state cannot leave {state}")]
    InvalidTransition { state: &'static str },

    #[error("Output delivery failed: {}", failures.join(", "))]
    DeliveryFailed { failures: Vec<String> },

    #[error("Server error: {0}")]
    Server(String),

    #[error("Internal error: {message}")]
    InternalError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error(transparent)]
    ValidationError(#[from] crate::types::ValidationError),
}

impl AppError {
    /// Whether retrying the same request could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::NetworkFailure(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            AppError::PrismicService { code, .. } => code.is_retryable(),
            _ => false,
        }
    }

    /// Whether the caller may offer the user another attempt.
    ///
    /// A failed "load more" leaves the pagination state untouched, so it is
    /// always recoverable; so is bumping into a load already in flight.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AppError::LoadMoreFailed { .. } | AppError::LoadInFlight)
            || self.is_retryable()
    }
}

impl From<std::fmt::Error> for AppError {
    fn from(err: std::fmt::Error) -> Self {
        AppError::InternalError {
            message: "Formatting error".to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::MalformedResponse(err.to_string())
    }
}

/// Result type alias for convenience
pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_from_api_response() {
        assert_eq!(
            PrismicErrorCode::from_api_response("api_notfound_error"),
            PrismicErrorCode::RefNotFound
        );
        assert_eq!(
            PrismicErrorCode::from_api_response("something_new"),
            PrismicErrorCode::Unknown("something_new".to_string())
        );
    }

    #[test]
    fn test_error_code_from_http_status() {
        assert_eq!(
            PrismicErrorCode::from_http_status(401),
            PrismicErrorCode::Unauthorized
        );
        assert!(PrismicErrorCode::from_http_status(503).is_retryable());
        assert!(PrismicErrorCode::from_http_status(404).is_not_found());
        assert!(!PrismicErrorCode::from_http_status(400).is_retryable());
    }

    #[test]
    fn test_load_more_failure_is_recoverable() {
        let err = AppError::LoadMoreFailed {
            cursor: "https://example.cdn.prismic.io/api/v2/documents/search?page=2".to_string(),
            source: Box::new(AppError::MalformedResponse("truncated body".to_string())),
        };
        assert!(err.is_recoverable());
        assert!(!err.is_retryable());
        assert!(AppError::LoadInFlight.is_recoverable());
        assert!(!AppError::PostNotFound {
            uid: "missing".to_string()
        }
        .is_recoverable());
    }

    #[test]
    fn test_service_error_message() {
        let err = AppError::PrismicService {
            code: PrismicErrorCode::Unauthorized,
            message: "Invalid access token".to_string(),
            status: reqwest::StatusCode::UNAUTHORIZED,
        };
        assert_eq!(
            err.to_string(),
            "Prismic API returned an error (unauthorized): Invalid access token"
        );
    }
}
