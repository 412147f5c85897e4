//! Chat turn domain types.
//!
//! These are the value objects handed to the pipeline by the application:
//! an ordered sequence of role-tagged turns, optionally carrying inline media.
//! Turns are immutable once constructed; the pipeline only ever appends new
//! turns, never mutates existing ones.

use serde::{Deserialize, Serialize};

/// The role of a turn's author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// System instructions (identity, rules)
    System,
    /// The end user
    User,
    /// The AI assistant
    Assistant,
}

/// The content of a turn: plain text, or an ordered list of parts for
/// multimodal input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TurnContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// One element of a multimodal turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text {
        #[serde(default)]
        text: Option<String>,
    },
    /// An image referenced by URL. Only `data:<mime>;base64,<payload>` URLs
    /// survive formatting; anything else is skipped.
    ImageUrl { url: String },
}

/// A single turn in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub content: TurnContent,
}

impl ChatTurn {
    /// Create a new system turn.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::System,
            content: TurnContent::Text(content.into()),
        }
    }

    /// Create a new user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: TurnContent::Text(content.into()),
        }
    }

    /// Create a new assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: TurnContent::Text(content.into()),
        }
    }

    /// Create a multimodal user turn from parts.
    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self {
            role: TurnRole::User,
            content: TurnContent::Parts(parts),
        }
    }
}
