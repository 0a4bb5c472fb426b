//! Inbound frame normalization.
//!
//! Upstream frames arrive as JSON in either snake_case or lowerCamelCase.
//! Each frame gets one key-normalization pass ([`snake_case_keys`]) and is
//! then decoded into a fixed schema, so the translation logic below never
//! looks at alternate spellings.
//!
//! Translation priority:
//! 1. `error` (object or string) → one error event
//! 2. `go_away` / `reconnect: true` → fixed advisory error, session ends
//! 3. `server_content` → status on interruption, text for transcriptions,
//!    text/audio for each model-turn part

use base64::Engine as _;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;
use vista_core::constants::DEFAULT_OUTPUT_AUDIO_MIME;
use vista_core::{LiveEvent, RiskMode, StatusState};

/// Error text emitted when upstream asks the client to reconnect.
pub const RECONNECT_ADVISORY: &str =
    "Live session ended by the model service; please reconnect to continue.";

/// Result of translating one upstream frame.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FrameOutcome {
    /// Events in emission order.
    pub events: Vec<LiveEvent>,
    /// Frame carried the setup acknowledgement.
    pub setup_complete: bool,
    /// Upstream asked for a reconnect; the reader should stop.
    pub terminate: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InboundFrame {
    setup_complete: Option<Value>,
    error: Option<Value>,
    go_away: Option<Value>,
    reconnect: Option<Value>,
    server_content: Option<ServerContent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServerContent {
    interrupted: Option<Value>,
    input_transcription: Option<Transcription>,
    output_transcription: Option<Transcription>,
    input_audio_transcription: Option<Transcription>,
    output_audio_transcription: Option<Transcription>,
    model_turn: Option<ModelTurn>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Transcription {
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ModelTurn {
    parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Part {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InlineData {
    mime_type: Option<String>,
    data: Option<String>,
}

/// Translate one raw upstream frame.
///
/// `skill` is carried on the status event re-emitted after an interruption.
/// Returns an error only when the frame is not JSON; callers drop those.
pub fn normalize_frame(raw: &str, skill: &str) -> serde_json::Result<FrameOutcome> {
    let value: Value = serde_json::from_str(raw)?;
    let frame: InboundFrame = serde_json::from_value(snake_case_keys(value))?;
    Ok(translate(frame, skill))
}

fn translate(frame: InboundFrame, skill: &str) -> FrameOutcome {
    let mut outcome = FrameOutcome {
        setup_complete: frame.setup_complete.is_some(),
        terminate: frame.go_away.is_some() || is_truthy(frame.reconnect.as_ref()),
        ..FrameOutcome::default()
    };

    if let Some(error) = frame.error.filter(|e| !e.is_null()) {
        outcome.events.push(LiveEvent::error(describe_error(&error)));
        return outcome;
    }
    if outcome.terminate {
        outcome.events.push(LiveEvent::error(RECONNECT_ADVISORY));
        return outcome;
    }
    if let Some(content) = frame.server_content {
        translate_content(content, skill, &mut outcome.events);
    }
    outcome
}

fn translate_content(content: ServerContent, skill: &str, events: &mut Vec<LiveEvent>) {
    if is_truthy(content.interrupted.as_ref()) {
        events.push(LiveEvent::status(StatusState::Connected, RiskMode::Normal, skill));
    }

    let transcriptions = [
        content.input_transcription,
        content.output_transcription,
        content.input_audio_transcription,
        content.output_audio_transcription,
    ];
    for text in transcriptions.into_iter().flatten().filter_map(|t| t.text) {
        if !text.trim().is_empty() {
            events.push(LiveEvent::text(text));
        }
    }

    let parts = content.model_turn.map(|turn| turn.parts).unwrap_or_default();
    for part in parts {
        if let Some(text) = part.text.filter(|t| !t.is_empty()) {
            events.push(LiveEvent::text(text));
        }
        if let Some(audio) = part.inline_data.and_then(decode_inline_data) {
            events.push(audio);
        }
    }
}

fn decode_inline_data(inline: InlineData) -> Option<LiveEvent> {
    let encoded = inline.data.filter(|d| !d.is_empty())?;
    match base64::engine::general_purpose::STANDARD.decode(encoded.as_bytes()) {
        Ok(data) if !data.is_empty() => Some(LiveEvent::Audio {
            mime: inline
                .mime_type
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_OUTPUT_AUDIO_MIME.to_string()),
            data,
        }),
        Ok(_) => None,
        Err(e) => {
            warn!(error = %e, "dropping inline data with invalid base64");
            None
        }
    }
}

/// `"code: message"` from an error object, or the string itself.
fn describe_error(error: &Value) -> String {
    match error {
        Value::String(message) => message.clone(),
        Value::Object(fields) => {
            let code = fields
                .get("code")
                .or_else(|| fields.get("status"))
                .and_then(scalar_text);
            let message = fields.get("message").and_then(scalar_text);
            match (code, message) {
                (Some(code), Some(message)) => format!("{code}: {message}"),
                (None, Some(text)) | (Some(text), None) => text,
                (None, None) => "Upstream error".to_string(),
            }
        }
        other => other.to_string(),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn is_truthy(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::Bool(true)))
}

/// Recursively rewrite every object key from lowerCamelCase to snake_case.
pub fn snake_case_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, inner)| (to_snake_case(&key), snake_case_keys(inner)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(snake_case_keys).collect()),
        other => other,
    }
}

fn to_snake_case(key: &str) -> String {
    if !key.bytes().any(|b| b.is_ascii_uppercase()) {
        return key.to_string();
    }
    let mut out = String::with_capacity(key.len() + 4);
    for (i, ch) in key.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 && !out.ends_with('_') {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
