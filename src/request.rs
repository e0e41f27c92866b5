//! Request model and shorthand-input conversion.
//!
//! The core never formats requests beyond this module: callers hand in plain
//! text, a list of parts, prepared contents, or a fully-specified request,
//! and [`IntoContents`] produces the canonical shape the transport sends.

use serde::{Deserialize, Serialize};

use crate::content::{Content, Part, Role};

/// Canonical request body for a generate-content call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    /// Routing target (e.g. `gemini-2.0-flash`). Travels with the request
    /// for URL construction but is never part of the serialized body.
    #[serde(skip)]
    pub model: String,
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

/// A set of function declarations the model may call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub function_declarations: Vec<FunctionDeclaration>,
}

/// Declaration of a function the model may call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    /// JSON Schema for the parameters object
    pub parameters: serde_json::Value,
}

/// Sampling and output configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
}

/// Conversion from caller-supplied shorthand into request contents.
///
/// Implemented for plain text, an ordered list of parts, prepared contents,
/// and a single [`Content`]. The produced contents always carry an explicit
/// role where the shorthand implies one (plain text and parts become a user
/// turn).
pub trait IntoContents {
    fn into_contents(self) -> Vec<Content>;
}

impl IntoContents for &str {
    fn into_contents(self) -> Vec<Content> {
        vec![Content::user_text(self)]
    }
}

impl IntoContents for String {
    fn into_contents(self) -> Vec<Content> {
        vec![Content::user_text(self)]
    }
}

impl IntoContents for Vec<Part> {
    fn into_contents(self) -> Vec<Content> {
        vec![Content {
            role: Some(Role::User),
            parts: self,
        }]
    }
}

impl IntoContents for Content {
    fn into_contents(self) -> Vec<Content> {
        vec![self]
    }
}

impl IntoContents for Vec<Content> {
    fn into_contents(self) -> Vec<Content> {
        self
    }
}

impl GenerateContentRequest {
    /// Builds a request from shorthand input with no extra configuration.
    pub fn from_input(input: impl IntoContents) -> Self {
        Self {
            contents: input.into_contents(),
            ..Self::default()
        }
    }
}
