//! Client → server messages on `/ws/live`.

use base64::Engine as _;
use serde::Deserialize;
use serde_json::Value;

/// Query string accepted by `/ws/live`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct LiveQuery {
    /// Client token.
    pub token: Option<String>,
    /// Session id (UUID).
    pub session_id: Option<String>,
    /// Skill code.
    pub mode: Option<String>,
    /// Optional goal text.
    pub goal: Option<String>,
}

/// A recognized client message.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Base64 PCM audio chunk.
    #[serde(rename = "client.audio")]
    Audio {
        /// Base64 payload.
        #[serde(default)]
        data_b64: String,
    },
    /// Base64 JPEG camera frame.
    #[serde(rename = "client.video")]
    Video {
        /// Base64 payload.
        #[serde(default)]
        data_b64: String,
    },
    /// User confirmed the pending step.
    #[serde(rename = "client.confirm")]
    Confirm,
    /// User ended the session.
    #[serde(rename = "client.stop")]
    Stop,
}

const KNOWN_TYPES: &[&str] = &["client.audio", "client.video", "client.confirm", "client.stop"];

/// Why a client frame could not be handled.
#[derive(Debug, thiserror::Error)]
pub enum ClientMessageError {
    /// Not JSON, or a known type with malformed fields.
    #[error("Invalid JSON message")]
    InvalidJson,
    /// Payload is not valid base64.
    #[error("Invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

/// Parse one text frame. Unknown or missing `type` yields `Ok(None)`.
pub fn parse_client_message(text: &str) -> Result<Option<ClientMessage>, ClientMessageError> {
    let value: Value = serde_json::from_str(text).map_err(|_| ClientMessageError::InvalidJson)?;
    let known = value
        .get("type")
        .and_then(Value::as_str)
        .is_some_and(|t| KNOWN_TYPES.contains(&t));
    if !known {
        return Ok(None);
    }
    serde_json::from_value(value)
        .map(Some)
        .map_err(|_| ClientMessageError::InvalidJson)
}

/// Decode a standard-alphabet base64 payload.
pub fn decode_payload(data_b64: &str) -> Result<Vec<u8>, ClientMessageError> {
    Ok(base64::engine::general_purpose::STANDARD.decode(data_b64.trim())?)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parses_audio_and_ignores_extra_fields() {
        let msg = parse_client_message(
            r#"{"type":"client.audio","mime":"audio/pcm;rate=16000","data_b64":"AQI="}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            Some(ClientMessage::Audio {
                data_b64: "AQI=".into()
            })
        );
    }

    #[test]
    fn parses_unit_messages() {
        assert_eq!(
            parse_client_message(r#"{"type":"client.confirm"}"#).unwrap(),
            Some(ClientMessage::Confirm)
        );
        assert_eq!(
            parse_client_message(r#"{"type":"client.stop"}"#).unwrap(),
            Some(ClientMessage::Stop)
        );
    }

    #[test]
    fn unknown_or_missing_type_is_ignored() {
        assert_eq!(parse_client_message(r#"{"type":"client.wave"}"#).unwrap(), None);
        assert_eq!(parse_client_message(r#"{"hello":1}"#).unwrap(), None);
        assert_eq!(parse_client_message("[1,2]").unwrap(), None);
    }

    #[test]
    fn invalid_json_is_reported() {
        assert_matches!(
            parse_client_message("{not json"),
            Err(ClientMessageError::InvalidJson)
        );
        assert_matches!(
            parse_client_message(r#"{"type":"client.video","data_b64":42}"#),
            Err(ClientMessageError::InvalidJson)
        );
    }

    #[test]
    fn base64_errors_carry_prefix() {
        let err = decode_payload("not-base64!!").unwrap_err();
        assert!(err.to_string().starts_with("Invalid base64 payload: "));
        assert_eq!(decode_payload("AQI=").unwrap(), vec![1, 2]);
    }
}
