use thiserror::Error;

use crate::response::BlockReason;

/// Defines errors that can occur when talking to the generation API.
///
/// # Example: Handling API Errors
///
/// ```ignore
/// match model.generate_content("hello").await {
///     Err(GenaiError::Api { status_code: 429, request_id, .. }) => {
///         tracing::warn!("Rate limited, request_id: {:?}", request_id);
///         // Retry with backoff
///     }
///     Err(GenaiError::Api { status_code, message, request_id }) => {
///         tracing::error!("API error {}: {} (request: {:?})", status_code, message, request_id);
///     }
///     // ...
/// }
/// ```
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GenaiError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    /// Chunk framing failed. `unconsumed` holds whatever bytes were left in
    /// the decode buffer when the stream ended, lossily decoded for
    /// diagnostics.
    #[error("chunk framing error: {message}")]
    Parse {
        /// What went wrong
        message: String,
        /// Undecoded remainder of the stream buffer
        unconsumed: String,
    },
    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    /// API error with structured context for debugging and automated handling.
    ///
    /// Contains the HTTP status code (for retry logic), error message, and
    /// optional request ID (for correlation with server-side logs).
    #[error("API error (HTTP {status_code}): {message}")]
    Api {
        /// HTTP status code (e.g., 400, 429, 500)
        status_code: u16,
        /// Error message from the API response body
        message: String,
        /// Request ID from the `x-goog-request-id` header, if available
        request_id: Option<String>,
    },
    /// The service blocked the request or the generated content.
    ///
    /// Returned by text extraction on a response that carries a block reason
    /// but no candidates, instead of silently yielding an empty string.
    #[error("content blocked by the service: {reason:?}")]
    Blocked {
        /// The block reason reported in prompt feedback, if any
        reason: Option<BlockReason>,
    },
    /// The turn was cancelled via its cancellation token or timed out
    /// cooperatively mid-stream.
    ///
    /// For chat turns, `user_entry_committed` tells the caller whether the
    /// turn's user message had already been appended to the session history
    /// when the abort landed (a half-committed turn). The aborted turn never
    /// contributes a model entry.
    #[error("request aborted (user entry committed: {user_entry_committed})")]
    Aborted {
        /// Whether the aborted chat turn left its user entry in history
        user_entry_committed: bool,
    },
    /// Request exceeded the timeout configured via `RequestOptions`.
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("internal client error: {0}")]
    Internal(String),
}

impl GenaiError {
    /// Shorthand for an abort outside a chat turn (no history involved).
    #[must_use]
    pub const fn aborted() -> Self {
        Self::Aborted {
            user_entry_committed: false,
        }
    }

    /// Returns `true` if this error is likely transient and the request may
    /// succeed on retry.
    ///
    /// Retryable: network-level failures, rate limits (429), server errors
    /// (5xx), and timeouts. Everything else is a permanent condition —
    /// framing and deserialization failures, blocked content, aborts, and
    /// input validation errors won't go away on retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            GenaiError::Http(_) => true,
            GenaiError::Api { status_code, .. } => *status_code == 429 || *status_code >= 500,
            GenaiError::Timeout(_) => true,
            GenaiError::Parse { .. }
            | GenaiError::Json(_)
            | GenaiError::Utf8(_)
            | GenaiError::Blocked { .. }
            | GenaiError::Aborted { .. }
            | GenaiError::InvalidInput(_)
            | GenaiError::Internal(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display_and_unconsumed() {
        let error = GenaiError::Parse {
            message: "unterminated JSON object at end of stream".to_string(),
            unconsumed: "{\"candidates\": [".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("chunk framing error"));
        assert!(display.contains("unterminated"));

        match error {
            GenaiError::Parse { unconsumed, .. } => {
                assert_eq!(unconsumed, "{\"candidates\": [");
            }
            _ => panic!("Expected Parse variant"),
        }
    }

    #[test]
    fn test_api_error_display() {
        let error = GenaiError::Api {
            status_code: 429,
            message: "Rate limited".to_string(),
            request_id: Some("req-123".to_string()),
        };
        let display = format!("{}", error);
        assert!(display.contains("429"));
        assert!(display.contains("Rate limited"));
    }

    #[test]
    fn test_blocked_error_display() {
        let error = GenaiError::Blocked {
            reason: Some(BlockReason::Safety),
        };
        let display = format!("{}", error);
        assert!(display.contains("blocked"));
        assert!(display.contains("Safety"));
    }

    #[test]
    fn test_aborted_error_carries_commit_flag() {
        let half_committed = GenaiError::Aborted {
            user_entry_committed: true,
        };
        assert!(format!("{}", half_committed).contains("true"));

        let clean = GenaiError::aborted();
        match clean {
            GenaiError::Aborted {
                user_entry_committed,
            } => assert!(!user_entry_committed),
            _ => panic!("Expected Aborted variant"),
        }
    }

    #[test]
    fn test_timeout_display() {
        let error = GenaiError::Timeout(std::time::Duration::from_secs(30));
        let display = format!("{}", error);
        assert!(display.contains("timed out"));
        assert!(display.contains("30s"));
    }

    #[test]
    fn test_is_retryable_rate_limit_and_server_errors() {
        for status_code in [429, 500, 502, 503, 504] {
            let error = GenaiError::Api {
                status_code,
                message: "transient".to_string(),
                request_id: None,
            };
            assert!(
                error.is_retryable(),
                "{} errors should be retryable",
                status_code
            );
        }
    }

    #[test]
    fn test_is_retryable_client_errors_not_retryable() {
        for status_code in [400, 401, 403, 404, 422] {
            let error = GenaiError::Api {
                status_code,
                message: "permanent".to_string(),
                request_id: None,
            };
            assert!(
                !error.is_retryable(),
                "{} errors should NOT be retryable",
                status_code
            );
        }
    }

    #[test]
    fn test_is_retryable_timeout() {
        assert!(GenaiError::Timeout(std::time::Duration::from_secs(10)).is_retryable());
    }

    #[test]
    fn test_is_retryable_permanent_errors() {
        let permanent: Vec<GenaiError> = vec![
            GenaiError::Parse {
                message: "bad".to_string(),
                unconsumed: String::new(),
            },
            GenaiError::Blocked { reason: None },
            GenaiError::aborted(),
            GenaiError::InvalidInput("empty prompt".to_string()),
            GenaiError::Internal("oops".to_string()),
        ];
        for error in permanent {
            assert!(!error.is_retryable(), "{} should NOT be retryable", error);
        }
    }

    #[test]
    fn test_json_error_from() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let error: GenaiError = json_err.into();
        assert!(format!("{}", error).contains("JSON deserialization error"));
    }

    #[test]
    fn test_utf8_error_from() {
        let bytes = vec![0xff, 0xfe];
        let utf8_err = std::str::from_utf8(&bytes).unwrap_err();
        let error: GenaiError = utf8_err.into();
        assert!(format!("{}", error).contains("UTF-8 decoding error"));
    }
}
