use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client as ReqwestClient;
use tracing::debug;

use super::common::{API_KEY_HEADER, Endpoint, check_response, construct_endpoint_url};
use crate::errors::GenaiError;
use crate::framing::Framing;
use crate::request::GenerateContentRequest;
use crate::response::GenerateContentResponse;
use crate::transport::{RequestOptions, StreamSource, Transport};

/// Reqwest-backed [`Transport`] against the generative language API.
///
/// Holds the API key and a shared connection pool. Cancellation and timeout
/// controls from [`RequestOptions`] are applied by the calling layer; this
/// type only executes the wire calls.
pub struct HttpTransport {
    http_client: ReqwestClient,
    api_key: String,
}

impl HttpTransport {
    /// Creates a transport with a default connection pool.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_client(api_key, ReqwestClient::new())
    }

    /// Creates a transport over a caller-configured reqwest client (custom
    /// timeouts, proxies, TLS settings).
    #[must_use]
    pub fn with_client(api_key: impl Into<String>, http_client: ReqwestClient) -> Self {
        Self {
            http_client,
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn generate(
        &self,
        request: GenerateContentRequest,
        _options: &RequestOptions,
    ) -> Result<GenerateContentResponse, GenaiError> {
        let url = construct_endpoint_url(Endpoint::GenerateContent {
            model: &request.model,
            stream: false,
        });
        debug!(model = %request.model, "POST generateContent");

        let response = self
            .http_client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await?;

        let response = check_response(response).await?;
        let decoded = response.json::<GenerateContentResponse>().await?;
        Ok(decoded)
    }

    async fn stream_generate(
        &self,
        request: GenerateContentRequest,
        _options: &RequestOptions,
    ) -> Result<StreamSource, GenaiError> {
        let url = construct_endpoint_url(Endpoint::GenerateContent {
            model: &request.model,
            stream: true,
        });
        debug!(model = %request.model, "POST streamGenerateContent");

        let response = self
            .http_client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await?;

        let response = check_response(response).await?;
        let bytes = response.bytes_stream().map(|read| read.map_err(GenaiError::Http));
        Ok(StreamSource::new(bytes.boxed(), Framing::Sse))
    }
}
