//! Streaming-first client core for a generative language API.
//!
//! The crate is organized around four pieces:
//!
//! - **Chunk framing** ([`framing`]): turns an arbitrarily fragmented byte
//!   stream into complete JSON response chunks, for both JSON-array and SSE
//!   response bodies.
//! - **Response merging** ([`merge`]): folds chunks into one cumulative
//!   response, concatenating text deltas and keeping structured parts
//!   atomic.
//! - **Streaming iteration** ([`streaming`]): [`StreamedResponse`] exposes
//!   cumulative snapshots chunk by chunk and seals into the final response.
//! - **Chat sessions** ([`chat`]): [`ChatSession`] serializes history
//!   commits so pipelined turns always land in submission order.
//!
//! # Example
//!
//! ```no_run
//! use futures_util::StreamExt;
//! use genai_stream::Client;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), genai_stream::GenaiError> {
//! let client = Client::new("api-key".to_string());
//! let model = client.generative_model("gemini-2.0-flash");
//!
//! let mut stream = model.generate_content_stream("Tell me a story").await?;
//! while let Some(snapshot) = stream.next().await {
//!     println!("{}", snapshot?.text()?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod chat;
pub mod client;
pub mod content;
pub mod errors;
pub mod framing;
pub mod merge;
pub mod request;
pub mod response;
pub mod streaming;
pub mod transport;

mod http;

pub use chat::{ChatSession, ChatStreamTurn, ChatTurn};
pub use client::{Client, ClientBuilder, GenerativeModel};
pub use content::{
    Blob, CodeExecutionResult, Content, ExecutableCode, FileData, FunctionCall, FunctionResponse,
    Part, Role,
};
pub use errors::GenaiError;
pub use framing::{Framing, JsonChunkDecoder, frame_chunks};
pub use http::HttpTransport;
pub use merge::ResponseAggregator;
pub use request::{
    FunctionDeclaration, GenerateContentRequest, GenerationConfig, IntoContents, Tool,
};
pub use response::{
    BlockReason, Candidate, FinishReason, GenerateContentResponse, PromptFeedback, SafetyRating,
    UsageMetadata,
};
pub use streaming::StreamedResponse;
pub use transport::{ByteStream, RequestOptions, StreamSource, Transport};

// Re-exported so callers can construct cancellation tokens without adding
// tokio-util themselves.
pub use tokio_util::sync::CancellationToken;
