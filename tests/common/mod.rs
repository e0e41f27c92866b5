//! Common test utilities shared across integration test files.
//!
//! Usage in test files:
//! ```ignore
//! mod common;
//! use common::*;
//! ```
//!
//! The centerpiece is [`MockTransport`], a scripted [`Transport`] that
//! replaces the network: each expected call is described up front, streamed
//! bodies can be fed byte-by-byte from the test, and every request the
//! client sends is recorded for later assertions.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use genai_stream::{
    Candidate, Content, FinishReason, Framing, GenaiError, GenerateContentRequest,
    GenerateContentResponse, Part, RequestOptions, Role, StreamSource, Transport,
};
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::UnboundedReceiverStream;

/// One scripted transport call, consumed in order.
pub enum Behavior {
    /// Resolve a non-streaming call, optionally waiting for a gate first.
    Unary {
        response: Result<GenerateContentResponse, GenaiError>,
        gate: Option<oneshot::Receiver<()>>,
    },
    /// Open a streaming call whose whole body is known up front.
    StreamBody { body: Bytes, framing: Framing },
    /// Open a streaming call fed read-by-read from the test.
    StreamChannel {
        reads: mpsc::UnboundedReceiver<Result<Bytes, GenaiError>>,
        framing: Framing,
    },
    /// Fail to open a streaming call.
    StreamRefused(GenaiError),
}

/// Scripted [`Transport`]: pops one [`Behavior`] per call and records every
/// request it sees.
#[derive(Default)]
pub struct MockTransport {
    behaviors: Mutex<VecDeque<Behavior>>,
    requests: Mutex<Vec<GenerateContentRequest>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, behavior: Behavior) {
        self.behaviors.lock().unwrap().push_back(behavior);
    }

    /// Every request the client sent, in call order.
    pub fn requests(&self) -> Vec<GenerateContentRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_behavior(&self, request: GenerateContentRequest) -> Behavior {
        self.requests.lock().unwrap().push(request);
        self.behaviors
            .lock()
            .unwrap()
            .pop_front()
            .expect("mock transport called more times than scripted")
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn generate(
        &self,
        request: GenerateContentRequest,
        _options: &RequestOptions,
    ) -> Result<GenerateContentResponse, GenaiError> {
        match self.next_behavior(request) {
            Behavior::Unary { response, gate } => {
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                response
            }
            _ => panic!("scripted a streaming behavior for a non-streaming call"),
        }
    }

    async fn stream_generate(
        &self,
        request: GenerateContentRequest,
        _options: &RequestOptions,
    ) -> Result<StreamSource, GenaiError> {
        match self.next_behavior(request) {
            Behavior::StreamBody { body, framing } => Ok(StreamSource::new(
                futures_util::stream::once(async move { Ok(body) }).boxed(),
                framing,
            )),
            Behavior::StreamChannel { reads, framing } => Ok(StreamSource::new(
                UnboundedReceiverStream::new(reads).boxed(),
                framing,
            )),
            Behavior::StreamRefused(error) => Err(error),
            Behavior::Unary { .. } => {
                panic!("scripted a non-streaming behavior for a streaming call")
            }
        }
    }
}

/// A handle for feeding a [`Behavior::StreamChannel`] from the test.
pub struct StreamFeeder {
    tx: mpsc::UnboundedSender<Result<Bytes, GenaiError>>,
}

impl StreamFeeder {
    /// Sends one SSE-framed chunk as a single read.
    pub fn send_chunk(&self, chunk: &GenerateContentResponse) {
        let _ = self.tx.send(Ok(sse_event(chunk)));
    }

    /// Sends one raw read, exactly as given.
    pub fn send_bytes(&self, bytes: impl Into<Bytes>) {
        let _ = self.tx.send(Ok(bytes.into()));
    }

    pub fn send_error(&self, error: GenaiError) {
        let _ = self.tx.send(Err(error));
    }

    /// Ends the byte source (a normal close).
    pub fn close(self) {}
}

/// Creates a channel-fed SSE streaming behavior plus its feeder.
pub fn sse_stream() -> (Behavior, StreamFeeder) {
    let (tx, reads) = mpsc::unbounded_channel();
    (
        Behavior::StreamChannel {
            reads,
            framing: Framing::Sse,
        },
        StreamFeeder { tx },
    )
}

/// Serializes one chunk as a complete SSE event.
pub fn sse_event(chunk: &GenerateContentResponse) -> Bytes {
    let json = serde_json::to_string(chunk).expect("chunk should serialize");
    Bytes::from(format!("data: {json}\r\n\r\n"))
}

/// Serializes chunks as one SSE body.
pub fn sse_body(chunks: &[GenerateContentResponse]) -> Bytes {
    let mut body = Vec::new();
    for chunk in chunks {
        body.extend_from_slice(&sse_event(chunk));
    }
    Bytes::from(body)
}

/// A streaming chunk carrying one text delta for candidate 0.
pub fn text_chunk(text: &str) -> GenerateContentResponse {
    indexed_text_chunk(0, text)
}

/// A streaming chunk carrying one text delta for the given candidate index.
pub fn indexed_text_chunk(index: u32, text: &str) -> GenerateContentResponse {
    GenerateContentResponse {
        candidates: vec![Candidate {
            index,
            content: Content {
                role: Some(Role::Model),
                parts: vec![Part::Text(text.to_string())],
            },
            ..Candidate::default()
        }],
        ..GenerateContentResponse::default()
    }
}

/// A complete non-streamed response with finished text for candidate 0.
pub fn full_response(text: &str) -> GenerateContentResponse {
    let mut response = text_chunk(text);
    response.candidates[0].finish_reason = Some(FinishReason::Stop);
    response
}

/// A blocked response: prompt feedback with a block reason, no candidates.
pub fn blocked_response() -> GenerateContentResponse {
    serde_json::from_value(serde_json::json!({
        "promptFeedback": {"blockReason": "SAFETY"}
    }))
    .expect("blocked response should deserialize")
}

/// The concatenated user-visible text of a history entry, for compact
/// order assertions.
pub fn entry_text(entry: &Content) -> String {
    entry.text().unwrap_or_default()
}
