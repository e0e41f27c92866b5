//! Wire-level content model shared by requests, responses, and chat history.
//!
//! A [`Content`] is one conversational turn: an optional role plus an ordered
//! list of [`Part`]s. `Part` is a closed tagged variant — the external serde
//! tag in camelCase produces exactly the one-key-per-kind part objects the
//! API speaks (`{"text": ...}`, `{"functionCall": ...}`, ...), and a closed
//! enum forces every merge and extraction path to handle each kind
//! explicitly rather than silently dropping one.

use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// The author of a [`Content`] entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
    Function,
}

/// One conversational turn: a role and an ordered sequence of parts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    /// A user turn with a single text part.
    #[must_use]
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Some(Role::User),
            parts: vec![Part::Text(text.into())],
        }
    }

    /// A model turn with the given parts.
    #[must_use]
    pub fn model_parts(parts: Vec<Part>) -> Self {
        Self {
            role: Some(Role::Model),
            parts,
        }
    }

    /// Concatenation of all text parts, or `None` if there are none.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        let mut collected: Option<String> = None;
        for part in &self.parts {
            if let Part::Text(text) = part {
                collected.get_or_insert_with(String::new).push_str(text);
            }
        }
        collected
    }
}

/// One atomic unit of content within a turn or a candidate.
///
/// Text parts may arrive as deltas during streaming and are concatenated
/// when merged. Every other variant is structured and atomic: the service
/// never splits one across stream chunks, so merging appends them whole.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Part {
    /// Plain text (or a streamed text delta)
    Text(String),
    /// Inline binary data, base64-encoded on the wire
    InlineData(Blob),
    /// Reference to a previously uploaded file
    FileData(FileData),
    /// A function invocation requested by the model
    FunctionCall(FunctionCall),
    /// Result of a function invocation, sent back to the model
    FunctionResponse(FunctionResponse),
    /// Code the model wants executed
    ExecutableCode(ExecutableCode),
    /// Outcome of executing model-generated code
    CodeExecutionResult(CodeExecutionResult),
}

impl Part {
    /// The text payload, if this is a text part.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns `true` for text parts; everything else is a structured part
    /// with atomic merge semantics.
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    /// Builds an inline-data part from raw bytes, base64-encoding them.
    #[must_use]
    pub fn inline_data(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::InlineData(Blob {
            mime_type: mime_type.into(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        })
    }
}

/// Inline binary payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    /// Base64-encoded bytes
    pub data: String,
}

/// Reference to an uploaded file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub file_uri: String,
}

/// A function invocation requested by the model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

/// The result of a function invocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionResponse {
    pub name: String,
    pub response: serde_json::Value,
}

/// Code the model wants executed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutableCode {
    pub language: String,
    pub code: String,
}

/// The outcome of executing model-generated code.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeExecutionResult {
    pub outcome: String,
    #[serde(default)]
    pub output: String,
}
