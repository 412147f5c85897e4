//! Whole-string response classification for the non-streaming surface.
//!
//! Applies the same reasoning-span semantics as the scanner, but over one
//! complete response string: the first well-formed `<think>…</think>` span is
//! extracted (trimmed), and the text before and after it is joined as the
//! answer. An unpaired start tag leaves the whole text as plain content.

use chatloom_core::event::Completion;

use crate::scanner::{THINK_END, THINK_START};

/// Classify one complete response string.
pub fn classify_response(text: &str) -> Completion {
    if text.is_empty() {
        return Completion {
            content: String::new(),
            reasoning_content: None,
        };
    }

    let trimmed = text.trim_start();
    let Some(think_start) = trimmed.find(THINK_START) else {
        return Completion {
            content: text.to_string(),
            reasoning_content: None,
        };
    };

    let Some(think_end) = trimmed.find(THINK_END).filter(|&end| end > think_start) else {
        // No paired end tag: everything is plain content.
        return Completion {
            content: text.to_string(),
            reasoning_content: None,
        };
    };

    let reasoning = trimmed[think_start + THINK_START.len()..think_end]
        .trim()
        .to_string();
    let before = trimmed[..think_start].trim();
    let after = trimmed[think_end + THINK_END.len()..].trim();

    let content = [before, after]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("\n");

    Completion {
        content,
        reasoning_content: Some(reasoning),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_all_content() {
        let result = classify_response("just an answer");
        assert_eq!(result.content, "just an answer");
        assert!(result.reasoning_content.is_none());
    }

    #[test]
    fn span_is_extracted_and_trimmed() {
        let result = classify_response("<think> weighing options </think>\nThe answer is 42.");
        assert_eq!(result.reasoning_content.as_deref(), Some("weighing options"));
        assert_eq!(result.content, "The answer is 42.");
    }

    #[test]
    fn text_around_span_is_joined_with_newline() {
        let result = classify_response("intro <think>r</think> outro");
        assert_eq!(result.content, "intro\noutro");
        assert_eq!(result.reasoning_content.as_deref(), Some("r"));
    }

    #[test]
    fn unpaired_start_tag_is_plain_content() {
        let result = classify_response("hello <think> never closed");
        assert_eq!(result.content, "hello <think> never closed");
        assert!(result.reasoning_content.is_none());
    }

    #[test]
    fn empty_input() {
        let result = classify_response("");
        assert_eq!(result.content, "");
        assert!(result.reasoning_content.is_none());
    }

    #[test]
    fn leading_whitespace_before_span() {
        let result = classify_response("   \n<think>hm</think>done");
        assert_eq!(result.reasoning_content.as_deref(), Some("hm"));
        assert_eq!(result.content, "done");
    }
}
