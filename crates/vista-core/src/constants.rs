//! Media and protocol constants shared by transports and the server.

/// MIME type for outbound microphone audio (16-bit little-endian PCM, 16 kHz mono).
pub const INPUT_AUDIO_MIME: &str = "audio/pcm;rate=16000";

/// MIME type for outbound camera frames.
pub const INPUT_IMAGE_MIME: &str = "image/jpeg";

/// MIME type assumed for model audio when the upstream frame omits one.
pub const DEFAULT_OUTPUT_AUDIO_MIME: &str = "audio/pcm;rate=24000";

/// Skill used when the client requests none or an unknown one.
pub const DEFAULT_SKILL: &str = "NAV_FIND";

/// Role tag for text turns authored on behalf of the user.
pub const ROLE_USER: &str = "user";
