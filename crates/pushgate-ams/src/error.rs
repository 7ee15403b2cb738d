//! Error types for broker API operations.

use thiserror::Error;

/// Result type alias for broker operations.
pub type Result<T> = std::result::Result<T, AmsError>;

/// Errors produced while talking to the broker.
#[derive(Debug, Clone, Error)]
pub enum AmsError {
    /// The broker answered outside the 2xx range. The display text is the
    /// raw response body; error classifiers parse it as the broker's
    /// structured error payload.
    #[error("{body}")]
    Upstream {
        /// Raw response body returned by the broker.
        body: String,
    },

    /// The request never produced a response (connection failure, timeout,
    /// malformed response body).
    #[error("{message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },
}

impl AmsError {
    /// Creates an upstream error from a non-2xx response body.
    pub fn upstream(body: impl Into<String>) -> Self {
        Self::Upstream { body: body.into() }
    }

    /// Creates a transport error from a message.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport { message: message.into() }
    }

    /// Whether the broker itself rejected the request (as opposed to the
    /// request never reaching it).
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Upstream { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_error_displays_raw_body() {
        let body = r#"{"error":{"code":404,"message":"Subscription doesn't exist","status":"NOT_FOUND"}}"#;
        let error = AmsError::upstream(body);
        assert_eq!(error.to_string(), body);
        assert!(error.is_upstream());
    }

    #[test]
    fn transport_error_displays_message() {
        let error = AmsError::transport("connection refused");
        assert_eq!(error.to_string(), "connection refused");
        assert!(!error.is_upstream());
    }
}
