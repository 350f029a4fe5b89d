//! Base64 helpers for embedded payloads and data URLs

use base64::{engine::general_purpose::STANDARD, DecodeError, Engine};

/// Encode binary data to base64 string
pub fn encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decode plain base64 or a `data:<mime>;base64,<payload>` URL
pub fn decode(encoded: &str) -> Result<Vec<u8>, DecodeError> {
    STANDARD.decode(payload(encoded).trim())
}

/// Strip a data URL prefix if present
fn payload(encoded: &str) -> &str {
    match encoded.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map(|(_, data)| data).unwrap_or(rest),
        None => encoded,
    }
}
