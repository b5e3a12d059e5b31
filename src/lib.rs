pub mod audio;
pub mod capture;
pub mod config;
pub mod error;
pub mod events;
pub mod http;
pub mod notes;
pub mod upload;
pub mod vad;

pub use audio::{
    AmplitudeFrame, AudioDevice, AudioEncoder, Codec, DeviceFactory, DeviceSource,
    EncoderConfig, EncoderEvent, SignalAnalyzer, WavStreamDevice,
};
pub use capture::{CaptureHandle, CapturePayload, CapturePipeline, CaptureStatus, RecordingSession};
pub use config::Config;
pub use error::CaptureError;
pub use events::{Notice, NoticeKind, NoticeSeverity};
pub use http::{create_router, AppState};
pub use notes::{ClientSelection, MemoryNoteStore, Note, NoteStore, ResultIntegrator};
pub use upload::{TranscriptionResult, UploadOrchestrator, UploadStatus, UploadTask};
pub use vad::{VadCommand, VadMachine, VadState};
