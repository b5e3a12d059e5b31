//! Wire shapes for the transcription endpoint.

use serde::{Deserialize, Serialize};

/// Success envelope: HTTP 200 with `{ "data": { ... } }`.
#[derive(Debug, Deserialize)]
pub struct TranscriptionEnvelope {
    pub data: TranscriptionResult,
}

/// Transcription produced by the endpoint for one uploaded payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub id: String,
    pub filename: String,
    pub transcription: String,
}

/// Structured failure body: `{ "error": "..." }`.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// The `options` form field accompanying every upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadOptions {
    pub language: String,
    pub endpoint: String,
    pub temperature: f32,
    #[serde(rename = "saveFile")]
    pub save_file: bool,
    pub key: String,
}

impl UploadOptions {
    pub fn from_config(config: &crate::config::TranscriptionConfig) -> Self {
        Self {
            language: config.language.clone(),
            endpoint: config.endpoint.clone(),
            temperature: config.temperature,
            save_file: config.save_file,
            key: config.credential.clone(),
        }
    }
}

/// Build the most specific failure message obtainable from a non-200 reply.
///
/// The endpoint may answer with `{error}` JSON, a plain-text body, or
/// nothing at all; all three shapes must be handled.
pub fn failure_message(status: u16, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return format!("Error response {}: {}", status, parsed.error);
    }
    let text = body.trim();
    if !text.is_empty() {
        return format!("Error response {}: {}", status, text);
    }
    format!("Error response {}: No response body", status)
}
