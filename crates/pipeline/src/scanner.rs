//! Tag-aware stream scanner.
//!
//! Reclassifies a live sequence of text fragments into content and reasoning
//! events, given a start/end marker pair that bounds a single reasoning span.
//! Markers may be split across network fragments, so the scanner buffers
//! until a full marker is visible, at the cost of one fragment of latency
//! when a marker spans a boundary.
//!
//! The state lives in an explicit struct owned by exactly one generation
//! pass, never shared, which keeps it independently testable.

/// Default reasoning span markers.
pub const THINK_START: &str = "<think>";
pub const THINK_END: &str = "</think>";

/// A classified fragment produced by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// Ordinary answer text, streamed incrementally.
    Content(String),
    /// One complete reasoning span, emitted atomically at the end marker.
    Reasoning(String),
}

/// Buffer-based scanner for one generation pass.
///
/// At most one reasoning span is recognized per pass: a second start marker
/// after a completed span is treated as literal content.
#[derive(Debug)]
pub struct TagScanner {
    start_marker: String,
    end_marker: String,
    buffer: String,
    in_reasoning: bool,
    seen_span: bool,
}

impl Default for TagScanner {
    fn default() -> Self {
        Self::new(THINK_START, THINK_END)
    }
}

impl TagScanner {
    pub fn new(start_marker: impl Into<String>, end_marker: impl Into<String>) -> Self {
        Self {
            start_marker: start_marker.into(),
            end_marker: end_marker.into(),
            buffer: String::new(),
            in_reasoning: false,
            seen_span: false,
        }
    }

    /// Feed one fragment; returns the events it unlocked, in order.
    pub fn push(&mut self, fragment: &str) -> Vec<ScanEvent> {
        self.buffer.push_str(fragment);
        let mut events = Vec::new();

        loop {
            if self.in_reasoning {
                let Some(end) = self.buffer.find(&self.end_marker) else {
                    // Keep accumulating; reasoning is never streamed
                    // incrementally.
                    break;
                };
                let reasoning = self.buffer[..end].to_string();
                self.buffer.drain(..end + self.end_marker.len());
                self.in_reasoning = false;
                self.seen_span = true;
                events.push(ScanEvent::Reasoning(reasoning));
                continue;
            }

            if self.seen_span {
                // Post-span text is plain passthrough, markers included.
                if !self.buffer.is_empty() {
                    events.push(ScanEvent::Content(std::mem::take(&mut self.buffer)));
                }
                break;
            }

            if let Some(start) = self.buffer.find(&self.start_marker) {
                if start > 0 {
                    events.push(ScanEvent::Content(self.buffer[..start].to_string()));
                }
                self.buffer.drain(..start + self.start_marker.len());
                self.in_reasoning = true;
                continue;
            }

            // No full start marker yet. Emit what cannot be part of one and
            // hold back a trailing suffix that is a prefix of the marker.
            let hold = marker_prefix_suffix_len(&self.buffer, &self.start_marker);
            let emit_len = self.buffer.len() - hold;
            if emit_len > 0 {
                let emitted: String = self.buffer.drain(..emit_len).collect();
                events.push(ScanEvent::Content(emitted));
            }
            break;
        }

        events
    }

    /// Signal end of input; flushes any remaining buffered text (an
    /// unterminated reasoning span, a held-back marker prefix, or trailing
    /// content) once, as plain content.
    pub fn finish(&mut self) -> Option<ScanEvent> {
        if self.buffer.is_empty() {
            return None;
        }
        self.in_reasoning = false;
        Some(ScanEvent::Content(std::mem::take(&mut self.buffer)))
    }
}

/// Length of the longest proper prefix of `marker` that is a suffix of `text`.
fn marker_prefix_suffix_len(text: &str, marker: &str) -> usize {
    let max = marker.len().saturating_sub(1).min(text.len());
    (1..=max)
        .rev()
        .find(|&k| marker.is_char_boundary(k) && text.ends_with(&marker[..k]))
        .unwrap_or(0)
}
