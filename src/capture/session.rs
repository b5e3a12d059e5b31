use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::audio::Codec;

/// One encoder-backed recording: opened when the state machine arms capture,
/// sealed when it disarms it, destroyed once the finalized payload has been
/// handed to the uploader.
#[derive(Debug)]
pub struct RecordingSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    codec: Codec,
    chunks: Vec<Vec<u8>>,
    active: bool,
}

/// Finalized audio blob ready for upload.
#[derive(Debug, Clone)]
pub struct CapturePayload {
    pub id: Uuid,
    /// Generated name sent alongside the file (no extension)
    pub name: String,
    pub filename: String,
    pub mime_type: &'static str,
    pub started_at: DateTime<Utc>,
    pub data: Vec<u8>,
}

impl RecordingSession {
    pub fn open(codec: Codec) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            codec,
            chunks: Vec::new(),
            active: true,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Append one encoded chunk. Append-only; chunks are never reordered.
    /// Chunks keep arriving between the stop instruction and its
    /// acknowledgement, so a sealed session still accepts them.
    pub fn push_chunk(&mut self, data: Vec<u8>) {
        self.chunks.push(data);
    }

    /// Mark the session as no longer recording. Called when the stop
    /// instruction is issued; finalize waits for the encoder's ack.
    pub fn seal(&mut self) {
        self.active = false;
    }

    /// Concatenate all chunks into one payload with a generated name.
    ///
    /// Consumes the session: runs exactly once, from the encoder's
    /// stop-completion event, after the last pending chunk has arrived.
    pub fn finalize(self) -> CapturePayload {
        let name = format!("file-{}", self.id.simple());
        let filename = format!("{}.{}", name, self.codec.file_extension());

        let mut data = Vec::with_capacity(self.chunks.iter().map(Vec::len).sum());
        for chunk in &self.chunks {
            data.extend_from_slice(chunk);
        }

        CapturePayload {
            id: self.id,
            name,
            filename,
            mime_type: self.codec.mime_type(),
            started_at: self.started_at,
            data,
        }
    }
}
