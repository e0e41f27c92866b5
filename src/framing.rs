//! Chunk framing: reassembling discrete JSON chunks from a raw byte stream.
//!
//! The transport delivers bytes with arbitrary fragmentation — a network read
//! may end in the middle of a JSON object, inside a string, or even inside a
//! multi-byte UTF-8 sequence. [`JsonChunkDecoder`] buffers raw bytes and
//! emits a value only once a structurally complete JSON object has
//! accumulated, tracking brace/bracket depth and string-escape state instead
//! of assuming line-delimited input.
//!
//! Two framing conventions are supported:
//! - [`Framing::JsonStream`]: self-delimited JSON objects, optionally
//!   wrapped in a streaming top-level array with comma separators (the raw
//!   `streamGenerateContent` body shape).
//! - [`Framing::Sse`]: `data:`-prefixed Server-Sent-Event lines
//!   (`alt=sse` responses).

use async_stream::try_stream;
use futures_util::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::errors::GenaiError;
use crate::transport::ByteStream;

/// How discrete chunks are delimited on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Framing {
    /// Concatenated or array-wrapped JSON objects
    JsonStream,
    /// `data:`-prefixed SSE lines
    Sse,
}

/// Incremental decoder that splits a byte stream into parsed JSON values.
///
/// Feed it raw network reads in arrival order; it returns every value that
/// became structurally complete with that read. Call [`finish`] once the
/// source ends to surface malformed trailing data.
///
/// [`finish`]: JsonChunkDecoder::finish
#[derive(Debug)]
pub struct JsonChunkDecoder {
    framing: Framing,
    buf: Vec<u8>,
    /// Bytes of `buf` already examined by the structural scanner
    scanned: usize,
    /// Offset of the current value's opening brace, while inside one
    value_start: Option<usize>,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl JsonChunkDecoder {
    #[must_use]
    pub const fn new(framing: Framing) -> Self {
        Self {
            framing,
            buf: Vec::new(),
            scanned: 0,
            value_start: None,
            depth: 0,
            in_string: false,
            escaped: false,
        }
    }

    /// Consumes one network read and returns the values completed by it.
    ///
    /// # Errors
    ///
    /// Fails with [`GenaiError::Parse`] on bytes that cannot belong to any
    /// chunk, with [`GenaiError::Json`] when a structurally complete object
    /// is not valid JSON, and with [`GenaiError::Utf8`] when an SSE line is
    /// not UTF-8.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<serde_json::Value>, GenaiError> {
        self.buf.extend_from_slice(bytes);
        match self.framing {
            Framing::JsonStream => self.scan_json_stream(),
            Framing::Sse => self.scan_sse_lines(),
        }
    }

    /// Signals end of the byte source.
    ///
    /// # Errors
    ///
    /// Fails with [`GenaiError::Parse`] carrying the unconsumed buffer when
    /// the source ended mid-chunk or with trailing garbage.
    pub fn finish(self) -> Result<(), GenaiError> {
        let leftover: &[u8] = match self.framing {
            Framing::JsonStream => &self.buf,
            // A fully scanned trailing line without a newline may still be
            // meaningful SSE noise (comments, blank padding); only actual
            // payload counts as truncation.
            Framing::Sse => {
                let line = self.buf.as_slice();
                if line.iter().all(|b| b.is_ascii_whitespace()) {
                    &[]
                } else {
                    line
                }
            }
        };
        if leftover.is_empty() {
            Ok(())
        } else {
            Err(GenaiError::Parse {
                message: "byte source ended mid-chunk".to_string(),
                unconsumed: String::from_utf8_lossy(leftover).into_owned(),
            })
        }
    }

    fn scan_json_stream(&mut self) -> Result<Vec<serde_json::Value>, GenaiError> {
        let mut completed = Vec::new();
        while self.scanned < self.buf.len() {
            let byte = self.buf[self.scanned];
            if self.value_start.is_none() {
                match byte {
                    b' ' | b'\t' | b'\r' | b'\n' | b',' | b'[' | b']' => {
                        self.scanned += 1;
                    }
                    b'{' => {
                        self.value_start = Some(self.scanned);
                        self.depth = 1;
                        self.in_string = false;
                        self.escaped = false;
                        self.scanned += 1;
                    }
                    other => {
                        return Err(GenaiError::Parse {
                            message: format!("unexpected byte {other:#04x} between chunks"),
                            unconsumed: String::from_utf8_lossy(&self.buf[self.scanned..])
                                .into_owned(),
                        });
                    }
                }
                continue;
            }

            // Inside a value. Multi-byte UTF-8 continuation bytes are all
            // >= 0x80 and cannot alias any structural byte below.
            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if byte == b'\\' {
                    self.escaped = true;
                } else if byte == b'"' {
                    self.in_string = false;
                }
                self.scanned += 1;
                continue;
            }
            match byte {
                b'"' => self.in_string = true,
                b'{' | b'[' => self.depth += 1,
                b'}' | b']' => {
                    self.depth -= 1;
                    if self.depth == 0 {
                        if let Some(start) = self.value_start.take() {
                            let value = serde_json::from_slice(&self.buf[start..=self.scanned])?;
                            completed.push(value);
                        }
                        self.buf.drain(..=self.scanned);
                        self.scanned = 0;
                        continue;
                    }
                }
                _ => {}
            }
            self.scanned += 1;
        }

        // Between values everything scanned so far is separator noise;
        // drop it so `finish` only ever sees a truncated value.
        if self.value_start.is_none() {
            self.buf.drain(..self.scanned);
            self.scanned = 0;
        }
        Ok(completed)
    }

    fn scan_sse_lines(&mut self) -> Result<Vec<serde_json::Value>, GenaiError> {
        let mut completed = Vec::new();
        while let Some(newline_pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line_bytes = self.buf.drain(..=newline_pos).collect::<Vec<u8>>();
            let line = std::str::from_utf8(&line_bytes)?.trim_end_matches(['\n', '\r']);

            if let Some(payload) = line.strip_prefix("data:") {
                let json_data = payload.trim_start();
                if !json_data.is_empty() {
                    completed.push(serde_json::from_str(json_data)?);
                }
            }
        }
        Ok(completed)
    }
}

/// Turns a live byte source into a lazy, forward-only sequence of decoded
/// chunks, preserving arrival order.
///
/// When `cancel` fires, the sequence ends early without emitting a final
/// value and without reporting the (expectedly) truncated buffer; the layer
/// driving the fold is responsible for surfacing [`GenaiError::Aborted`].
pub fn frame_chunks<T>(
    mut byte_stream: ByteStream,
    framing: Framing,
    cancel: Option<CancellationToken>,
) -> impl Stream<Item = Result<T, GenaiError>> + Send
where
    T: DeserializeOwned + Send,
{
    try_stream! {
        let mut decoder = JsonChunkDecoder::new(framing);
        loop {
            let next = match &cancel {
                Some(token) => {
                    tokio::select! {
                        biased;
                        () = token.cancelled() => return,
                        item = byte_stream.next() => item,
                    }
                }
                None => byte_stream.next().await,
            };
            let Some(read) = next else { break };
            for value in decoder.feed(&read?)? {
                let chunk: T = serde_json::from_value(value)?;
                yield chunk;
            }
        }
        decoder.finish()?;
    }
}
