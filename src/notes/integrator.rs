use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::{Note, NoteStore};
use crate::upload::TranscriptionResult;

/// Merges a successful transcription with the client context captured at
/// submission time and appends it to the notes collection. One append,
/// nothing else; ordering of the collection is the store's own contract.
#[derive(Clone)]
pub struct ResultIntegrator {
    notes: Arc<dyn NoteStore>,
}

impl ResultIntegrator {
    pub fn new(notes: Arc<dyn NoteStore>) -> Self {
        Self { notes }
    }

    pub async fn integrate(&self, result: TranscriptionResult, client_id: Option<String>) {
        info!(
            "Integrating transcription {} for client {:?}",
            result.id, client_id
        );

        self.notes
            .append(Note {
                id: result.id,
                filename: result.filename,
                date_time: Utc::now(),
                transcription: result.transcription,
                client_id,
                is_edited: false,
                edited_transcription: None,
            })
            .await;
    }
}
