use reqwest::Response;

use crate::errors::GenaiError;

/// Represents the API version to target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    /// V1 Beta API version (current)
    V1Beta,
}

impl ApiVersion {
    const fn as_str(self) -> &'static str {
        match self {
            Self::V1Beta => "v1beta",
        }
    }
}

// --- URL Construction ---
const BASE_URL_PREFIX: &str = "https://generativelanguage.googleapis.com";

/// Header name for API key authentication.
///
/// Header-based authentication keeps the key out of URLs, so it never lands
/// in server logs, proxy logs, or error messages.
pub const API_KEY_HEADER: &str = "X-Goog-Api-Key";

/// Google's request ID header name.
///
/// Uniquely identifies each request; useful for correlating a failure with
/// server-side logs. See: <https://cloud.google.com/apis/docs/system-parameters>
const REQUEST_ID_HEADER: &str = "x-goog-request-id";

/// Maximum characters to include from an error body in error messages
const ERROR_BODY_PREVIEW_LENGTH: usize = 200;

/// The model endpoints this client calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint<'a> {
    /// Generate content from a model, optionally streaming
    GenerateContent { model: &'a str, stream: bool },
}

impl Endpoint<'_> {
    /// Constructs the URL path for this endpoint
    fn to_path(&self, version: ApiVersion) -> String {
        match self {
            Self::GenerateContent {
                model,
                stream: false,
            } => {
                format!("/{}/models/{}:generateContent", version.as_str(), model)
            }
            Self::GenerateContent {
                model,
                stream: true,
            } => {
                format!(
                    "/{}/models/{}:streamGenerateContent",
                    version.as_str(),
                    model
                )
            }
        }
    }

    /// Returns whether this endpoint requires SSE parameters
    const fn requires_sse(&self) -> bool {
        match self {
            Self::GenerateContent { stream, .. } => *stream,
        }
    }
}

/// Constructs a URL for a specific endpoint.
///
/// Note: API key authentication is handled via the `X-Goog-Api-Key` header,
/// not as a query parameter. Use [`API_KEY_HEADER`] when making requests.
#[must_use]
pub fn construct_endpoint_url(endpoint: Endpoint) -> String {
    let version = ApiVersion::V1Beta;
    let path = endpoint.to_path(version);

    let query_string = if endpoint.requires_sse() {
        "?alt=sse"
    } else {
        ""
    };

    format!("{BASE_URL_PREFIX}{path}{query_string}")
}

/// Checks if an HTTP response is successful, returning it if so or a
/// structured [`GenaiError::Api`] otherwise.
///
/// # Errors
///
/// Returns an error with status code, body preview, and the request ID from
/// the `x-goog-request-id` header on non-success status.
pub async fn check_response(response: Response) -> Result<Response, GenaiError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status_code = response.status().as_u16();

    // Extract the request ID before consuming the body
    let request_id = response
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(String::from);

    let error_body = response
        .text()
        .await
        .unwrap_or_else(|e| format!("Failed to read error body: {e}"));

    Err(GenaiError::Api {
        status_code,
        message: truncate_for_context(&error_body, ERROR_BODY_PREVIEW_LENGTH),
        request_id,
    })
}

/// Truncates a string to `max_len` bytes, adding "..." if truncated.
///
/// Slices on UTF-8 character boundaries only.
fn truncate_for_context(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let truncate_at = s
            .char_indices()
            .take_while(|(i, c)| i + c.len_utf8() <= max_len)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        format!("{}...", &s[..truncate_at])
    }
}
