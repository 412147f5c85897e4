//! Tool-call detection over raw provider chunks.
//!
//! The transport decodes any embedded function call into
//! `RawChunk::function_call`; the detector's job is only to recognize the
//! first usable signal of a pass. A payload without a usable name is treated
//! as no signal at all, and scanning continues normally.

use chatloom_core::tool::ToolCallSignal;
use chatloom_core::transport::RawChunk;
use tracing::warn;

/// Inspect one raw chunk for a usable tool-call signal.
pub fn detect_tool_call(chunk: &RawChunk) -> Option<ToolCallSignal> {
    let call = chunk.function_call.as_ref()?;
    if call.name.trim().is_empty() {
        warn!("Ignoring tool-call payload with empty name");
        return None;
    }
    Some(call.clone())
}
