pub mod pipeline;
pub mod session;

pub use pipeline::{
    CaptureControl, CaptureHandle, CapturePipeline, CaptureStatus, StatusSnapshot,
};
pub use session::{CapturePayload, RecordingSession};
