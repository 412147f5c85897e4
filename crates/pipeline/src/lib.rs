//! The chatloom streaming inference response pipeline.
//!
//! Turns a raw token stream from a text-generation service into a structured,
//! semantically tagged event stream, transparently handling in-band
//! `<think>…</think>` reasoning markup and model-initiated tool invocation.
//!
//! The entry point is [`Pipeline`]: build one over a
//! [`Transport`](chatloom_core::Transport) (plus optional tool collaborators),
//! then call [`Pipeline::run`] for the streaming surface or
//! [`Pipeline::complete`] for the aggregated one.

pub mod bridge;
pub mod controller;
pub mod detector;
pub mod formatter;
pub mod response;
pub mod scanner;

pub use controller::{ChatRequest, Pipeline};
pub use formatter::format_turns;
pub use response::classify_response;
pub use scanner::{ScanEvent, TagScanner};
