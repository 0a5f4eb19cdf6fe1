//! Error types for the Keycloak authorization client
//!
//! Every operation returns exactly one [`AuthzError`]. The variants carry
//! enough detail for logging, while [`AuthzError::kind`] collapses them to the
//! small [`ErrorKind`] taxonomy callers branch on.

use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// Server Error Bodies
// ============================================================================

/// Error document returned by Keycloak
///
/// The OAuth endpoints answer with `error`/`error_description`, the admin
/// REST API with `errorMessage`. Both shapes are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default, rename = "errorMessage")]
    pub error_message: Option<String>,
}

impl ApiErrorResponse {
    /// Best human readable message in the document, if any
    pub fn message(&self) -> Option<String> {
        match (&self.error, &self.error_description, &self.error_message) {
            (_, _, Some(msg)) => Some(msg.clone()),
            (Some(err), Some(desc), None) => Some(format!("{}: {}", err, desc)),
            (Some(err), None, None) => Some(err.clone()),
            (None, Some(desc), None) => Some(desc.clone()),
            (None, None, None) => None,
        }
    }
}

// ============================================================================
// Error Kinds
// ============================================================================

/// Coarse error categories shared by all operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The server rejected the request body or an identifier in it
    BadParameter,
    /// The referenced record does not exist server-side
    NotFound,
    /// Authentication failed, or an entitlement was denied
    Unauthorized,
    /// Transport failure or an undecodable response
    Internal,
    /// The caller canceled the call or its deadline elapsed
    Canceled,
}

impl ErrorKind {
    /// Map an HTTP status code to an error kind
    ///
    /// This is the one status table used by every operation. Success codes
    /// map to `None`.
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            200..=299 => None,
            404 => Some(ErrorKind::NotFound),
            400 | 422 => Some(ErrorKind::BadParameter),
            401 | 403 => Some(ErrorKind::Unauthorized),
            _ => Some(ErrorKind::Internal),
        }
    }
}

// ============================================================================
// Client Error Type
// ============================================================================

/// Errors that can occur when talking to the authorization server
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Invalid id or malformed payload (400, 422)
    #[error("Bad parameter: {0}")]
    BadParameter(String),

    /// Record not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Authentication failed or access denied (401, 403)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Connection, TLS or timeout failure before a response arrived
    #[error("Network error: {0}")]
    Network(String),

    /// Response arrived but could not be decoded into the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Unexpected non-2xx status
    #[error("Server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    /// Client misconfiguration (missing credentials, bad header value, etc.)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The request context was canceled
    #[error("Request canceled")]
    Canceled,

    /// The request context deadline elapsed
    #[error("Deadline exceeded")]
    DeadlineExceeded,
}

impl AuthzError {
    /// The coarse category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthzError::BadParameter(_) => ErrorKind::BadParameter,
            AuthzError::NotFound(_) => ErrorKind::NotFound,
            AuthzError::Unauthorized(_) => ErrorKind::Unauthorized,
            AuthzError::Network(_)
            | AuthzError::InvalidResponse(_)
            | AuthzError::Server { .. }
            | AuthzError::Configuration(_) => ErrorKind::Internal,
            AuthzError::Canceled | AuthzError::DeadlineExceeded => ErrorKind::Canceled,
        }
    }

    /// Returns true if the referenced record does not exist
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Returns true if authentication failed or access was denied
    pub fn is_unauthorized(&self) -> bool {
        self.kind() == ErrorKind::Unauthorized
    }

    /// Returns true if the server rejected the request payload
    pub fn is_bad_parameter(&self) -> bool {
        self.kind() == ErrorKind::BadParameter
    }

    /// Returns true for transport, server and decoding failures
    pub fn is_internal(&self) -> bool {
        self.kind() == ErrorKind::Internal
    }

    /// Returns true if the call was abandoned because of its context
    pub fn is_canceled(&self) -> bool {
        self.kind() == ErrorKind::Canceled
    }

    /// Returns true if repeating the same call might succeed
    ///
    /// Only transport failures and 5xx responses qualify. Nothing in this
    /// crate retries on its own; see [`crate::retry`] for a caller-side helper.
    pub fn is_retryable(&self) -> bool {
        match self {
            AuthzError::Network(_) => true,
            AuthzError::Server { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }

    /// Build an error from a non-2xx status and its body
    ///
    /// The body only enriches the message; the status alone decides the kind.
    pub fn from_status(status: u16, body: &str) -> Self {
        let msg = error_message(body, status);
        match ErrorKind::from_status(status) {
            Some(ErrorKind::NotFound) => AuthzError::NotFound(msg),
            Some(ErrorKind::BadParameter) => AuthzError::BadParameter(msg),
            Some(ErrorKind::Unauthorized) => AuthzError::Unauthorized(msg),
            _ => AuthzError::Server {
                status,
                message: msg,
            },
        }
    }

    /// Build an error for a token endpoint response
    ///
    /// Token endpoints report bad credentials with assorted 4xx codes, so any
    /// client error is treated as an authentication failure.
    pub fn from_token_status(status: u16, body: &str) -> Self {
        if (400..=499).contains(&status) {
            AuthzError::Unauthorized(error_message(body, status))
        } else {
            Self::from_status(status, body)
        }
    }

    /// Classify a failure while reading a response body
    ///
    /// Bodies are read as lossy UTF-8 without content decoding, so any
    /// failure here is the connection dropping mid-body.
    pub fn from_body_error(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AuthzError::Network(format!("Request timed out: {}", err))
        } else {
            AuthzError::Network(format!("Response body interrupted: {}", err))
        }
    }

    /// Classify a transport error
    pub fn from_reqwest_error(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AuthzError::Network(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            AuthzError::Network(format!("Connection failed: {}", err))
        } else if err.is_body() {
            AuthzError::Network(format!("Response body interrupted: {}", err))
        } else if err.is_decode() {
            AuthzError::InvalidResponse(format!("Failed to decode response: {}", err))
        } else if let Some(status) = err.status() {
            Self::from_status(status.as_u16(), &err.to_string())
        } else {
            AuthzError::Network(format!("Request failed: {}", err))
        }
    }
}

fn error_message(body: &str, status: u16) -> String {
    if let Ok(doc) = serde_json::from_str::<ApiErrorResponse>(body) {
        if let Some(msg) = doc.message() {
            return msg;
        }
    }

    if body.trim().is_empty() {
        format!("HTTP {}", status)
    } else {
        body.trim().to_string()
    }
}
