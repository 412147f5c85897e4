//! Transport trait: the abstraction over the text-generation service.
//!
//! A Transport knows how to send formatted turns to the provider and get a
//! response back, either as one complete string or as a stream of raw chunks.
//! The optional tool-call signal embedded in a chunk is decoded once here, at
//! the transport boundary, so the pipeline never has to duck-type provider
//! payloads.

use crate::error::TransportError;
use crate::tool::ToolCallSignal;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The role of a provider-native turn. The provider has no system role;
/// formatting maps `assistant → model` and everything else to `user`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormattedRole {
    User,
    Model,
}

/// One part of a provider-native turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TurnPart {
    Text {
        text: String,
    },
    /// Inline binary data (e.g. an image) with its mime type, carried as a
    /// base64 payload.
    InlineData {
        mime_type: String,
        data: String,
    },
}

/// A provider-native turn: a role plus an ordered, non-empty part list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedTurn {
    pub role: FormattedRole,
    pub parts: Vec<TurnPart>,
}

impl FormattedTurn {
    /// A single-text-part user turn; the common case for synthetic turns.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: FormattedRole::User,
            parts: vec![TurnPart::Text { text: text.into() }],
        }
    }

    /// A single-text-part model turn.
    pub fn model_text(text: impl Into<String>) -> Self {
        Self {
            role: FormattedRole::Model,
            parts: vec![TurnPart::Text { text: text.into() }],
        }
    }
}

/// A tool schema in the provider's native declaration format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderToolSchema {
    pub name: String,
    pub description: String,
    /// JSON Schema describing the tool's parameters.
    pub parameters: serde_json::Value,
}

/// A generation request handed to the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// The model to use (e.g., "models/gemini-2.0-flash")
    pub model: String,

    /// The formatted conversation turns
    pub contents: Vec<FormattedTurn>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Tool schemas the model may call; empty means tools are not offered
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ProviderToolSchema>,
}

impl GenerateRequest {
    /// A request with no tools attached; used for continuation and fallback
    /// passes, which are treated as plain text.
    pub fn plain(model: impl Into<String>, contents: Vec<FormattedTurn>) -> Self {
        Self {
            model: model.into(),
            contents,
            temperature: None,
            max_tokens: None,
            tools: Vec::new(),
        }
    }
}

/// A single raw chunk from a streaming response.
///
/// Exactly one generation pass owns the receiving end; chunks expose
/// extractable text and, optionally, an embedded tool-call signal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawChunk {
    /// Extracted text delta, if this chunk carried any.
    #[serde(default)]
    pub text: Option<String>,

    /// A decoded function-call signal, if this chunk carried one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<ToolCallSignal>,
}

impl RawChunk {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            function_call: None,
        }
    }
}

/// The core Transport trait.
///
/// The pipeline calls `generate()` or `generate_stream()` without knowing
/// which provider backs it. A new, independent model handle is created per
/// invocation on the provider side, so concurrent pipelines never interfere.
#[async_trait]
pub trait Transport: Send + Sync {
    /// A human-readable name for this transport (e.g., "gemini").
    fn name(&self) -> &str;

    /// Send a request and get the complete response text.
    async fn generate(&self, request: GenerateRequest) -> Result<String, TransportError>;

    /// Send a request and get a stream of raw chunks.
    ///
    /// The returned receiver is a lazy, finite sequence; dropping it signals
    /// the transport to stop requesting further chunks.
    async fn generate_stream(
        &self,
        request: GenerateRequest,
    ) -> Result<tokio::sync::mpsc::Receiver<Result<RawChunk, TransportError>>, TransportError>;
}
