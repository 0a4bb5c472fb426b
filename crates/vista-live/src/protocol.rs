//! Outbound frames for the direct websocket protocol.

use base64::Engine as _;
use serde_json::{Value, json};

use crate::config::LiveConfig;

/// Setup handshake sent as the first frame of every connection.
pub fn setup_message(config: &LiveConfig, project: &str, region: &str) -> Value {
    json!({
        "setup": {
            "model": config.model_resource(project, region),
            "generation_config": {
                "response_modalities": [config.response_modality],
            },
            "system_instruction": {
                "parts": [{ "text": config.system_instructions }],
            },
            "input_audio_transcription": {},
            "output_audio_transcription": {},
            "context_window_compression": {
                "trigger_tokens": config.compression.trigger_tokens,
                "sliding_window": {
                    "target_tokens": config.compression.target_tokens,
                },
            },
        }
    })
}

/// Realtime media chunk (audio or video).
pub fn realtime_media(mime_type: &str, data: &[u8]) -> Value {
    json!({
        "realtime_input": {
            "media_chunks": [{
                "mime_type": mime_type,
                "data": base64::engine::general_purpose::STANDARD.encode(data),
            }],
        }
    })
}

/// Complete client-content turn carrying one text part.
pub fn client_text_turn(text: &str, role: &str) -> Value {
    json!({
        "client_content": {
            "turns": [{
                "role": role,
                "parts": [{ "text": text }],
            }],
            "turn_complete": true,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_carries_model_modality_and_compression() {
        let config = LiveConfig {
            system_instructions: "be careful".into(),
            ..LiveConfig::default()
        };
        let setup = setup_message(&config, "proj", "us-east4");
        let inner = &setup["setup"];
        assert_eq!(
            inner["model"],
            "projects/proj/locations/us-east4/publishers/google/models/gemini-live-2.5-flash-native-audio"
        );
        assert_eq!(inner["generation_config"]["response_modalities"], json!(["AUDIO"]));
        assert_eq!(inner["system_instruction"]["parts"][0]["text"], "be careful");
        assert_eq!(inner["input_audio_transcription"], json!({}));
        assert_eq!(inner["output_audio_transcription"], json!({}));
        assert_eq!(inner["context_window_compression"]["trigger_tokens"], 25_600);
        assert_eq!(
            inner["context_window_compression"]["sliding_window"]["target_tokens"],
            12_800
        );
    }

    #[test]
    fn media_chunk_is_base64() {
        let frame = realtime_media("audio/pcm;rate=16000", &[0, 1, 2]);
        let chunk = &frame["realtime_input"]["media_chunks"][0];
        assert_eq!(chunk["mime_type"], "audio/pcm;rate=16000");
        assert_eq!(chunk["data"], "AAEC");
    }

    #[test]
    fn text_turn_is_complete() {
        let frame = client_text_turn("hello", "user");
        assert_eq!(frame["client_content"]["turn_complete"], true);
        assert_eq!(frame["client_content"]["turns"][0]["role"], "user");
        assert_eq!(frame["client_content"]["turns"][0]["parts"][0]["text"], "hello");
    }
}
