pub mod integrator;

pub use integrator::ResultIntegrator;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// One session note produced from a finished transcription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub filename: String,
    pub date_time: DateTime<Utc>,
    pub transcription: String,
    pub client_id: Option<String>,
    pub is_edited: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_transcription: Option<String>,
}

/// External notes collection, injected into the core as a collaborator so
/// the pipeline can be tested without a live UI.
///
/// Ordering within the collection (most-recent-first) is this trait's own
/// contract; the integrator only ever appends.
#[async_trait::async_trait]
pub trait NoteStore: Send + Sync {
    async fn append(&self, note: Note);
    async fn list(&self) -> Vec<Note>;
    async fn list_by_client(&self, client_id: &str) -> Vec<Note>;
    async fn delete(&self, id: &str) -> bool;
    /// Cascade used when a client record is removed.
    async fn delete_by_client(&self, client_id: &str) -> usize;
    /// Stage an edited transcription without committing it.
    async fn set_edited(&self, id: &str, edited: String) -> bool;
    /// Commit the staged edit as the transcription.
    async fn save_edit(&self, id: &str) -> bool;
    /// Discard the staged edit.
    async fn cancel_edit(&self, id: &str) -> bool;
}

/// In-memory notes collection, most-recent-first.
#[derive(Default)]
pub struct MemoryNoteStore {
    items: RwLock<Vec<Note>>,
}

impl MemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl NoteStore for MemoryNoteStore {
    async fn append(&self, note: Note) {
        let mut items = self.items.write().await;
        items.insert(0, note);
    }

    async fn list(&self) -> Vec<Note> {
        self.items.read().await.clone()
    }

    async fn list_by_client(&self, client_id: &str) -> Vec<Note> {
        self.items
            .read()
            .await
            .iter()
            .filter(|note| note.client_id.as_deref() == Some(client_id))
            .cloned()
            .collect()
    }

    async fn delete(&self, id: &str) -> bool {
        let mut items = self.items.write().await;
        let before = items.len();
        items.retain(|note| note.id != id);
        items.len() != before
    }

    async fn delete_by_client(&self, client_id: &str) -> usize {
        let mut items = self.items.write().await;
        let before = items.len();
        items.retain(|note| note.client_id.as_deref() != Some(client_id));
        before - items.len()
    }

    async fn set_edited(&self, id: &str, edited: String) -> bool {
        let mut items = self.items.write().await;
        match items.iter_mut().find(|note| note.id == id) {
            Some(note) => {
                note.edited_transcription = Some(edited);
                note.is_edited = true;
                true
            }
            None => false,
        }
    }

    async fn save_edit(&self, id: &str) -> bool {
        let mut items = self.items.write().await;
        match items.iter_mut().find(|note| note.id == id) {
            Some(note) => match note.edited_transcription.take() {
                Some(edited) => {
                    note.transcription = edited;
                    note.is_edited = false;
                    true
                }
                None => false,
            },
            None => false,
        }
    }

    async fn cancel_edit(&self, id: &str) -> bool {
        let mut items = self.items.write().await;
        match items.iter_mut().find(|note| note.id == id) {
            Some(note) => {
                note.edited_transcription = None;
                note.is_edited = false;
                true
            }
            None => false,
        }
    }
}

/// Currently selected client, shared between the UI surface (writer) and
/// the upload orchestrator (reader).
///
/// The orchestrator snapshots the value once at submission time; a
/// selection change while an upload is in flight never re-associates it.
#[derive(Clone, Default)]
pub struct ClientSelection {
    inner: Arc<RwLock<Option<String>>>,
}

impl ClientSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self) -> Option<String> {
        self.inner.read().await.clone()
    }

    pub async fn set(&self, client_id: Option<String>) {
        *self.inner.write().await = client_id;
    }
}
