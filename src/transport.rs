//! Transport collaborator boundary.
//!
//! The core consumes a [`Transport`]: something that can execute a prepared
//! request and hand back either a complete decoded response (non-streaming)
//! or a live byte source plus its framing convention (streaming). The
//! default implementation is [`crate::http::HttpTransport`]; tests inject
//! mocks through the same seam.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use tokio_util::sync::CancellationToken;

use crate::errors::GenaiError;
use crate::framing::Framing;
use crate::request::GenerateContentRequest;
use crate::response::GenerateContentResponse;

/// A live byte source from a streaming call. Reads arrive with arbitrary
/// fragmentation; an aborted source simply ends early.
pub type ByteStream = BoxStream<'static, Result<Bytes, GenaiError>>;

/// A streaming response body together with the framing it uses.
pub struct StreamSource {
    pub bytes: ByteStream,
    pub framing: Framing,
}

impl StreamSource {
    #[must_use]
    pub fn new(bytes: ByteStream, framing: Framing) -> Self {
        Self { bytes, framing }
    }
}

/// Per-call cancellation and deadline controls.
///
/// Cancellation is cooperative: firing the token stops the framer from
/// requesting further bytes and the call's final future rejects with
/// [`GenaiError::Aborted`]. A timeout bounds the whole call and rejects
/// with [`GenaiError::Timeout`].
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
    pub timeout: Option<Duration>,
    pub cancellation: Option<CancellationToken>,
}

impl RequestOptions {
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

/// Runs a transport future under the options' cancellation and timeout
/// controls. Cancellation wins over a simultaneous completion; the timeout
/// bounds everything, cancellation wait included.
pub(crate) async fn with_controls<T>(
    options: &RequestOptions,
    fut: impl Future<Output = Result<T, GenaiError>>,
) -> Result<T, GenaiError> {
    let guarded = async {
        match &options.cancellation {
            Some(token) => {
                tokio::select! {
                    biased;
                    () = token.cancelled() => Err(GenaiError::aborted()),
                    result = fut => result,
                }
            }
            None => fut.await,
        }
    };
    match options.timeout {
        Some(limit) => tokio::time::timeout(limit, guarded)
            .await
            .map_err(|_| GenaiError::Timeout(limit))?,
        None => guarded.await,
    }
}

/// Executes prepared requests against the generation service.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Executes a non-streaming call and returns the complete decoded
    /// response.
    async fn generate(
        &self,
        request: GenerateContentRequest,
        options: &RequestOptions,
    ) -> Result<GenerateContentResponse, GenaiError>;

    /// Opens a streaming call and returns the live byte source.
    async fn stream_generate(
        &self,
        request: GenerateContentRequest,
        options: &RequestOptions,
    ) -> Result<StreamSource, GenaiError>;
}
