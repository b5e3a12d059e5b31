use std::sync::Arc;

use crate::capture::CaptureHandle;
use crate::notes::{ClientSelection, NoteStore};

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// External notes collection
    pub notes: Arc<dyn NoteStore>,

    /// Currently selected client context
    pub selection: ClientSelection,

    /// Handle to the running capture pipeline; `None` when the audio
    /// device could not be opened (arming stays halted).
    pub capture: Option<CaptureHandle>,
}

impl AppState {
    pub fn new(
        notes: Arc<dyn NoteStore>,
        selection: ClientSelection,
        capture: Option<CaptureHandle>,
    ) -> Self {
        Self {
            notes,
            selection,
            capture,
        }
    }
}
