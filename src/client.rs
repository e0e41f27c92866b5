//! Client entry points: builder, model handles, and the generate calls.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client as ReqwestClient;
use tracing::debug;

use crate::chat::ChatSession;
use crate::content::Content;
use crate::errors::GenaiError;
use crate::http::HttpTransport;
use crate::request::{GenerateContentRequest, GenerationConfig, IntoContents, Tool};
use crate::response::GenerateContentResponse;
use crate::streaming::StreamedResponse;
use crate::transport::{RequestOptions, Transport, with_controls};

/// The main client for interacting with the generative language API.
///
/// Cheap to clone; all handles derived from one client share its transport
/// and connection pool.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
}

/// Builder for `Client` instances.
///
/// # Example
///
/// ```
/// use genai_stream::Client;
/// use std::time::Duration;
///
/// let client = Client::builder("api_key".to_string())
///     .timeout(Duration::from_secs(120))
///     .connect_timeout(Duration::from_secs(10))
///     .build();
/// ```
#[derive(Debug)]
pub struct ClientBuilder {
    api_key: String,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
}

impl ClientBuilder {
    /// Sets the total request timeout.
    ///
    /// Maximum time a request can take from start to finish, including
    /// connection time, sending the request, and receiving the response.
    /// Generation requests can run long; 120-300 seconds is a reasonable
    /// range. If not set, uses reqwest's default (no timeout).
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connection timeout.
    ///
    /// Maximum time to wait for establishing a connection to the server.
    /// A shorter timeout here helps fail fast if the network is unavailable.
    /// If not set, uses reqwest's default.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Builds the `Client`.
    #[must_use]
    pub fn build(self) -> Client {
        let mut builder = ReqwestClient::builder();

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(connect_timeout) = self.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }

        // This should never fail with our configuration
        let http_client = builder.build().expect("Failed to build HTTP client");

        Client {
            transport: Arc::new(HttpTransport::with_client(self.api_key, http_client)),
        }
    }
}

impl Client {
    /// Creates a new builder for `Client` instances.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Your API key.
    #[must_use]
    pub const fn builder(api_key: String) -> ClientBuilder {
        ClientBuilder {
            api_key,
            timeout: None,
            connect_timeout: None,
        }
    }

    /// Creates a new client with default HTTP settings.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Your API key.
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self {
            transport: Arc::new(HttpTransport::new(api_key)),
        }
    }

    /// Creates a client over a custom [`Transport`].
    ///
    /// The seam used by tests to inject a mock transport; also the hook for
    /// callers that need to route requests through something other than the
    /// bundled HTTP implementation.
    #[must_use]
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Returns a handle for a specific model.
    #[must_use]
    pub fn generative_model(&self, model: impl Into<String>) -> GenerativeModel {
        GenerativeModel {
            transport: Arc::clone(&self.transport),
            model: model.into(),
            system_instruction: None,
            tools: None,
            generation_config: None,
        }
    }
}

/// A handle for one model plus per-model request configuration.
///
/// # Example
///
/// ```ignore
/// let model = client
///     .generative_model("gemini-2.0-flash")
///     .with_system_instruction("Answer in one sentence.");
/// let response = model.generate_content("Why is the sky blue?").await?;
/// println!("{}", response.text()?);
/// ```
#[derive(Clone)]
pub struct GenerativeModel {
    transport: Arc<dyn Transport>,
    model: String,
    system_instruction: Option<Content>,
    tools: Option<Vec<Tool>>,
    generation_config: Option<GenerationConfig>,
}

impl GenerativeModel {
    /// The model name this handle targets.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.model
    }

    /// Sets a system instruction applied to every request from this handle.
    #[must_use]
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(Content {
            role: None,
            parts: vec![crate::content::Part::Text(instruction.into())],
        });
        self
    }

    /// Sets the tools (function declarations) offered to the model.
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Sets sampling and output configuration.
    #[must_use]
    pub fn with_generation_config(mut self, config: GenerationConfig) -> Self {
        self.generation_config = Some(config);
        self
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub(crate) fn build_request(&self, contents: Vec<Content>) -> GenerateContentRequest {
        GenerateContentRequest {
            model: self.model.clone(),
            contents,
            system_instruction: self.system_instruction.clone(),
            tools: self.tools.clone(),
            generation_config: self.generation_config.clone(),
        }
    }

    /// Generates a complete response for the given input.
    ///
    /// A blocked response resolves successfully; extraction via
    /// [`GenerateContentResponse::text`] surfaces the block as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request fails, the response status is
    /// not successful, or the response cannot be decoded.
    pub async fn generate_content(
        &self,
        input: impl IntoContents,
    ) -> Result<GenerateContentResponse, GenaiError> {
        self.generate_content_with_options(input, RequestOptions::default())
            .await
    }

    /// [`generate_content`](Self::generate_content) with per-call
    /// cancellation and timeout controls.
    pub async fn generate_content_with_options(
        &self,
        input: impl IntoContents,
        options: RequestOptions,
    ) -> Result<GenerateContentResponse, GenaiError> {
        let request = self.build_request(input.into_contents());
        debug!(model = %self.model, "generate_content");
        with_controls(&options, self.transport.generate(request, &options)).await
    }

    /// Opens a streaming generation call.
    ///
    /// The returned [`StreamedResponse`] yields cumulative snapshots as
    /// chunks arrive and seals into the final response via
    /// [`StreamedResponse::aggregate`].
    ///
    /// # Errors
    ///
    /// Returns an error if the call cannot be opened. Errors after the
    /// stream opens surface through the stream itself.
    pub async fn generate_content_stream(
        &self,
        input: impl IntoContents,
    ) -> Result<StreamedResponse, GenaiError> {
        self.generate_content_stream_with_options(input, RequestOptions::default())
            .await
    }

    /// [`generate_content_stream`](Self::generate_content_stream) with
    /// per-call cancellation and timeout controls.
    ///
    /// The timeout bounds opening the stream; once bytes are flowing,
    /// cancellation is the way to stop early.
    pub async fn generate_content_stream_with_options(
        &self,
        input: impl IntoContents,
        options: RequestOptions,
    ) -> Result<StreamedResponse, GenaiError> {
        let request = self.build_request(input.into_contents());
        debug!(model = %self.model, "generate_content_stream");
        let source =
            with_controls(&options, self.transport.stream_generate(request, &options)).await?;
        Ok(StreamedResponse::new(source, options.cancellation))
    }

    /// Starts a chat session with empty history.
    #[must_use]
    pub fn start_chat(&self) -> ChatSession {
        ChatSession::new(self.clone(), Vec::new())
    }

    /// Starts a chat session seeded with prior turns.
    #[must_use]
    pub fn start_chat_with_history(&self, history: Vec<Content>) -> ChatSession {
        ChatSession::new(self.clone(), history)
    }
}
