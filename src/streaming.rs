//! Streamed responses: partial snapshots plus a deferred final aggregate.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::stream::BoxStream;
use futures_util::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::errors::GenaiError;
use crate::framing::frame_chunks;
use crate::merge::ResponseAggregator;
use crate::response::GenerateContentResponse;
use crate::transport::StreamSource;

/// One in-flight streaming generation call.
///
/// Offers two views over a single underlying fold:
/// - a [`Stream`] of cumulative partial snapshots, one per transport chunk,
///   each reflecting everything received so far;
/// - [`aggregate`], resolving to the final sealed response.
///
/// Consuming only `aggregate` still drives the fold to completion. The
/// partial sequence is single-pass: once exhausted it yields nothing more.
/// The only suspension point is waiting for the next transport chunk.
///
/// [`aggregate`]: StreamedResponse::aggregate
///
/// # Example
///
/// ```ignore
/// let mut streamed = model.generate_content_stream("Tell me a story").await?;
/// while let Some(partial) = streamed.next().await {
///     print!("{}", partial?.text()?);
/// }
/// ```
pub struct StreamedResponse {
    chunks: BoxStream<'static, Result<GenerateContentResponse, GenaiError>>,
    /// `None` once the fold has finished (exhausted or failed)
    aggregator: Option<ResponseAggregator>,
    cancellation: Option<CancellationToken>,
}

impl StreamedResponse {
    /// Wraps a transport byte source in the framing/merge pipeline.
    #[must_use]
    pub fn new(source: StreamSource, cancellation: Option<CancellationToken>) -> Self {
        let chunks =
            frame_chunks::<GenerateContentResponse>(source.bytes, source.framing, cancellation.clone())
                .boxed();
        Self {
            chunks,
            aggregator: Some(ResponseAggregator::new()),
            cancellation,
        }
    }

    /// Drives the fold over any chunks the caller has not consumed and
    /// returns the final sealed response.
    ///
    /// # Errors
    ///
    /// Rejects with the first framing/transport error, or with
    /// [`GenaiError::Aborted`] when the call's cancellation token fired
    /// mid-stream.
    pub async fn aggregate(mut self) -> Result<GenerateContentResponse, GenaiError> {
        while let Some(partial) = self.next().await {
            partial?;
        }
        if self
            .cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
        {
            return Err(GenaiError::aborted());
        }
        self.aggregator
            .take()
            .map(ResponseAggregator::seal)
            .ok_or_else(|| GenaiError::Internal("stream fold finished without state".to_string()))
    }
}

impl std::fmt::Debug for StreamedResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamedResponse")
            .field("aggregator", &self.aggregator)
            .field("cancellation", &self.cancellation)
            .finish_non_exhaustive()
    }
}

impl Stream for StreamedResponse {
    type Item = Result<GenerateContentResponse, GenaiError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.aggregator.is_none() {
            return Poll::Ready(None);
        }
        match this.chunks.poll_next_unpin(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Ready(Some(Ok(chunk))) => {
                let aggregator = this
                    .aggregator
                    .as_mut()
                    .expect("checked above; fold is active");
                aggregator.ingest(chunk);
                Poll::Ready(Some(Ok(aggregator.snapshot())))
            }
            Poll::Ready(Some(Err(error))) => {
                // A failed fold yields no further snapshots and cannot seal
                this.aggregator = None;
                Poll::Ready(Some(Err(error)))
            }
        }
    }
}
