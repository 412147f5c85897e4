//! Message formatting: chat turns to provider-native turns.
//!
//! The provider has no native system role, so all leading system text is
//! merged into a single synthetic user turn. Image parts are accepted only as
//! `data:<mime>;base64,<payload>` URLs and become inline binary parts; any
//! other part shape is silently skipped. A turn whose final part list is
//! empty is dropped entirely.

use base64::Engine;
use chatloom_core::transport::{FormattedRole, FormattedTurn, TurnPart};
use chatloom_core::turn::{ChatTurn, ContentPart, TurnContent, TurnRole};

/// Convert an ordered sequence of chat turns into provider-native turns.
///
/// Pure and deterministic; the output may be empty.
pub fn format_turns(turns: &[ChatTurn]) -> Vec<FormattedTurn> {
    let mut formatted = Vec::with_capacity(turns.len() + 1);

    // Merge all system turns into one synthetic leading user turn.
    let system_text: Vec<&str> = turns
        .iter()
        .filter(|t| t.role == TurnRole::System)
        .filter_map(|t| match &t.content {
            TurnContent::Text(text) => Some(text.as_str()),
            TurnContent::Parts(_) => None,
        })
        .collect();

    if !system_text.is_empty() {
        formatted.push(FormattedTurn::user_text(system_text.join("\n")));
    }

    for turn in turns.iter().filter(|t| t.role != TurnRole::System) {
        let parts = build_parts(&turn.content);
        if parts.is_empty() {
            continue;
        }

        let role = match turn.role {
            TurnRole::Assistant => FormattedRole::Model,
            _ => FormattedRole::User,
        };

        formatted.push(FormattedTurn { role, parts });
    }

    formatted
}

fn build_parts(content: &TurnContent) -> Vec<TurnPart> {
    match content {
        TurnContent::Text(text) => vec![TurnPart::Text { text: text.clone() }],
        TurnContent::Parts(elements) => elements.iter().filter_map(translate_part).collect(),
    }
}

fn translate_part(part: &ContentPart) -> Option<TurnPart> {
    match part {
        ContentPart::Text { text } => Some(TurnPart::Text {
            text: text.clone().unwrap_or_default(),
        }),
        ContentPart::ImageUrl { url } => parse_data_url(url),
    }
}

/// Accept only `data:<mime>;base64,<payload>` image URLs with a non-empty,
/// decodable payload; anything else is skipped.
fn parse_data_url(url: &str) -> Option<TurnPart> {
    let rest = url.strip_prefix("data:")?;
    let (mime_type, payload) = rest.split_once(";base64,")?;
    if mime_type.is_empty() || payload.is_empty() {
        return None;
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .ok()?;
    Some(TurnPart::InlineData {
        mime_type: mime_type.to_string(),
        data: payload.to_string(),
    })
}
