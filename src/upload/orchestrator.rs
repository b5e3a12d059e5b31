use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::response::{failure_message, TranscriptionEnvelope, TranscriptionResult, UploadOptions};
use crate::capture::CapturePayload;
use crate::config::TranscriptionConfig;
use crate::error::CaptureError;
use crate::events::{Notice, NoticeSeverity};
use crate::notes::ResultIntegrator;

const STATUS_PENDING: u8 = 0;
const STATUS_SUCCEEDED: u8 = 1;
const STATUS_FAILED: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    Pending,
    Succeeded,
    Failed,
}

/// Handle to one submitted upload. Owned by the orchestrator until it
/// reaches a terminal status; many may exist concurrently.
#[derive(Clone)]
pub struct UploadTask {
    pub id: Uuid,
    pub client_id: Option<String>,
    status: Arc<AtomicU8>,
}

impl UploadTask {
    pub fn status(&self) -> UploadStatus {
        match self.status.load(Ordering::SeqCst) {
            STATUS_SUCCEEDED => UploadStatus::Succeeded,
            STATUS_FAILED => UploadStatus::Failed,
            _ => UploadStatus::Pending,
        }
    }
}

/// Decrements the in-flight counter exactly once, on every exit path of an
/// upload task, so the counter never goes negative regardless of
/// completion order.
struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Sends finalized payloads to the transcription endpoint.
///
/// Submissions never block the scheduling tick: each becomes an independent
/// spawned task racing the shared cancellation token. Success hands the
/// result to the integrator with the client context captured at submission.
#[derive(Clone)]
pub struct UploadOrchestrator {
    http: reqwest::Client,
    config: TranscriptionConfig,
    integrator: ResultIntegrator,
    notices: tokio::sync::mpsc::Sender<Notice>,
    cancel: CancellationToken,
    in_flight: Arc<AtomicUsize>,
}

impl UploadOrchestrator {
    pub fn new(
        config: TranscriptionConfig,
        integrator: ResultIntegrator,
        notices: tokio::sync::mpsc::Sender<Notice>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            integrator,
            notices,
            cancel,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Submitted-but-not-terminal task count, surfaced for UI.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn in_flight_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.in_flight)
    }

    /// Shared token activated when the capture subsystem is torn down.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Submit one payload with the client context snapshot taken by the
    /// caller. Increments the in-flight counter synchronously; the rest
    /// runs detached.
    pub fn submit(&self, payload: CapturePayload, client_id: Option<String>) -> UploadTask {
        let task = UploadTask {
            id: payload.id,
            client_id: client_id.clone(),
            status: Arc::new(AtomicU8::new(STATUS_PENDING)),
        };

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = InFlightGuard(Arc::clone(&self.in_flight));

        let http = self.http.clone();
        let config = self.config.clone();
        let integrator = self.integrator.clone();
        let notices = self.notices.clone();
        let cancel = self.cancel.clone();
        let status = Arc::clone(&task.status);

        info!(
            "Submitting upload {} ({} bytes, client {:?})",
            payload.id,
            payload.data.len(),
            client_id
        );

        tokio::spawn(async move {
            let _guard = guard;

            let outcome = tokio::select! {
                _ = cancel.cancelled() => Err(CaptureError::UploadFailed(
                    "upload aborted: capture subsystem torn down".to_string(),
                )),
                result = send_payload(&http, &config, payload) => result,
            };

            match outcome {
                Ok(result) => {
                    status.store(STATUS_SUCCEEDED, Ordering::SeqCst);
                    let _ = notices
                        .send(Notice::transient(NoticeSeverity::Info, "Note saved"))
                        .await;
                    integrator.integrate(result, client_id).await;
                }
                Err(e) => {
                    status.store(STATUS_FAILED, Ordering::SeqCst);
                    let message = match e {
                        CaptureError::UploadFailed(m) => m,
                        CaptureError::ResponseUnparseable(m) => m,
                        other => other.to_string(),
                    };
                    warn!("Upload failed: {}", message);
                    let _ = notices
                        .send(Notice::transient(NoticeSeverity::Error, message))
                        .await;
                }
            }
        });

        task
    }
}

async fn send_payload(
    http: &reqwest::Client,
    config: &TranscriptionConfig,
    payload: CapturePayload,
) -> Result<TranscriptionResult, CaptureError> {
    let options = UploadOptions::from_config(config);
    let options_json = serde_json::to_string(&options)
        .map_err(|e| CaptureError::UploadFailed(format!("failed to encode options: {}", e)))?;

    let file = Part::bytes(payload.data)
        .file_name(payload.filename.clone())
        .mime_str(payload.mime_type)
        .map_err(|e| CaptureError::UploadFailed(format!("invalid mime type: {}", e)))?;

    let form = Form::new()
        .part("file", file)
        .text("name", payload.name.clone())
        .text("options", options_json);

    let response = http
        .post(&config.endpoint)
        .header(reqwest::header::ACCEPT, "application/json")
        .multipart(form)
        .send()
        .await
        .map_err(|e| {
            error!("Upload request never completed: {}", e);
            CaptureError::UploadFailed("Upload request failed, see log".to_string())
        })?;

    let status = response.status();
    if status.as_u16() != 200 {
        let body = response.text().await.unwrap_or_default();
        return Err(CaptureError::UploadFailed(failure_message(
            status.as_u16(),
            &body,
        )));
    }

    let body = response
        .text()
        .await
        .map_err(|e| CaptureError::ResponseUnparseable(e.to_string()))?;

    serde_json::from_str::<TranscriptionEnvelope>(&body)
        .map(|envelope| envelope.data)
        .map_err(|e| {
            CaptureError::ResponseUnparseable(format!("unexpected success body: {}", e))
        })
}
