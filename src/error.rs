//! Error taxonomy for the capture core

use thiserror::Error;

/// Failures raised by the capture pipeline and its collaborators
#[derive(Error, Debug)]
pub enum CaptureError {
    /// No audio device or permission. Fatal to the recording feature:
    /// surfaced once as a persistent notice, arming stays halted.
    #[error("audio device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The requested encoder configuration cannot be constructed.
    /// Recovered locally by retrying once with the fallback config.
    #[error("encoder configuration not supported: {0}")]
    EncoderConfigUnsupported(String),

    /// A transcription upload reached a terminal failure. Non-fatal,
    /// reported per task, never retried automatically.
    #[error("upload failed: {0}")]
    UploadFailed(String),

    /// The endpoint replied with a body none of the known shapes match.
    /// Degrades to best-effort text extraction before being reported
    /// as an upload failure.
    #[error("could not parse transcription response: {0}")]
    ResponseUnparseable(String),
}
