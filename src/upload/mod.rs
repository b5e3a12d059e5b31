pub mod orchestrator;
pub mod response;

pub use orchestrator::{UploadOrchestrator, UploadStatus, UploadTask};
pub use response::{failure_message, TranscriptionEnvelope, TranscriptionResult, UploadOptions};
