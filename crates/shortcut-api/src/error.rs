//! API error types.

/// Errors that can occur while talking to the Shortcut API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The token was rejected (HTTP 401).
    #[error("authentication failed (401): check SHORTCUT_API_TOKEN")]
    Unauthorized,

    /// The requested resource does not exist (HTTP 404).
    #[error("not found: {path}")]
    NotFound {
        /// The request path.
        path: String,
    },

    /// The API kept answering 429 after all retries were spent.
    #[error("rate limited on {path}; gave up after {retries} retries")]
    RateLimited {
        /// The request path.
        path: String,
        /// How many retries were attempted.
        retries: u32,
    },

    /// Any other non-success status.
    #[error("{method} {path} failed with status {status}: {body}")]
    Status {
        /// HTTP method of the failed request.
        method: &'static str,
        /// The request path.
        path: String,
        /// The HTTP status code.
        status: u16,
        /// The (possibly truncated) response body.
        body: String,
    },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(#[from] ureq::Error),

    /// A response body could not be decoded.
    #[error("failed to decode response from {path}: {source}")]
    Decode {
        /// The request path.
        path: String,
        /// The JSON error.
        source: serde_json::Error,
    },

    /// A request body could not be encoded.
    #[error("failed to encode request body: {0}")]
    Encode(serde_json::Error),

    /// The response decoded but did not have the expected shape.
    #[error("unexpected response from {path}: {reason}")]
    Unexpected {
        /// The request path.
        path: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Reading a local file (e.g. an attachment) failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the API crate.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Maximum number of response-body bytes kept in [`ApiError::Status`].
const MAX_BODY_LEN: usize = 500;

impl ApiError {
    // -- Constructors --------------------------------------------------------

    /// Creates an [`ApiError::Status`], truncating long bodies.
    pub fn status(method: &'static str, path: impl Into<String>, status: u16, body: &str) -> Self {
        let mut body = body.trim().to_string();
        if body.len() > MAX_BODY_LEN {
            let mut cut = MAX_BODY_LEN;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
            body.push_str("...");
        }
        Self::Status {
            method,
            path: path.into(),
            status,
            body,
        }
    }

    /// Creates an [`ApiError::Unexpected`].
    pub fn unexpected(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unexpected {
            path: path.into(),
            reason: reason.into(),
        }
    }

    // -- Predicates ----------------------------------------------------------

    /// Returns `true` if this is an [`ApiError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if the token was rejected.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Returns `true` if the error is transient and the operation may succeed
    /// on a later run (rate limits, server errors, network failures).
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Transport(_) => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// HTTP status code carried by the error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::NotFound { .. } => Some(404),
            Self::RateLimited { .. } => Some(429),
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_body_is_truncated() {
        let body = "x".repeat(2000);
        let ApiError::Status { body, .. } = ApiError::status("POST", "/stories", 400, &body) else {
            panic!("expected Status");
        };
        assert_eq!(body.len(), MAX_BODY_LEN + 3);
        assert!(body.ends_with("..."));
    }

    #[test]
    fn predicates() {
        assert!(ApiError::NotFound { path: "/x".into() }.is_not_found());
        assert!(ApiError::Unauthorized.is_unauthorized());
        assert!(ApiError::status("GET", "/x", 503, "").is_retryable());
        assert!(!ApiError::status("GET", "/x", 422, "").is_retryable());
        assert_eq!(ApiError::status("GET", "/x", 422, "").status_code(), Some(422));
        assert_eq!(ApiError::unexpected("/x", "empty").status_code(), None);
    }
}
