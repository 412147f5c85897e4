//! Provider transport implementations for chatloom.
//!
//! All transports implement the `chatloom_core::Transport` trait; the
//! pipeline drives them without knowing which provider is behind the handle.

pub mod config;
pub mod gemini;

pub use config::{ConfigError, ProviderProfile};
pub use gemini::GeminiTransport;
