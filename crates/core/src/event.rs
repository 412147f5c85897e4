//! Pipeline output events.
//!
//! `StreamEvent` is what a chat UI consumes: classified fragments of the
//! model's output, plus bracketed marker events around tool invocations so
//! the UI can render "calling tool X" / "tool X responded" / "resuming".

use serde::{Deserialize, Serialize};

/// One classified event in a pipeline's output stream.
///
/// Consumers must treat `reasoning_content` as advisory and never concatenate
/// it into displayed answer text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A fragment of ordinary answer text, streamed incrementally.
    Content { content: String },

    /// One complete reasoning span, emitted atomically once its closing
    /// marker has been observed.
    Reasoning { reasoning_content: String },

    /// A tool-phase marker. `content` carries the bracketed marker text for
    /// plain-text renderers; `tool_calling_content` carries the tool name (or
    /// the error message on the failure marker).
    ToolCalling {
        content: String,
        tool_calling_content: String,
    },
}

impl StreamEvent {
    /// Wire-level event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Content { .. } => "content",
            Self::Reasoning { .. } => "reasoning",
            Self::ToolCalling { .. } => "tool_calling",
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self::Content {
            content: content.into(),
        }
    }

    pub fn reasoning(reasoning_content: impl Into<String>) -> Self {
        Self::Reasoning {
            reasoning_content: reasoning_content.into(),
        }
    }
}

/// The aggregated result of a non-streaming generation call: the full answer
/// text with the first well-formed reasoning span extracted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,
}
