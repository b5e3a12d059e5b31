// Integration tests for the upload orchestrator.
//
// The transcription endpoint is played by a loopback axum server so the
// real multipart request path, the three error-body shapes, the in-flight
// counter, and cancellation are all exercised end to end.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use docnotes_capture::capture::CapturePayload;
use docnotes_capture::config::TranscriptionConfig;
use docnotes_capture::{
    MemoryNoteStore, NoteStore, ResultIntegrator, UploadOrchestrator, UploadStatus,
};
use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

async fn spawn_endpoint(router: Router) -> Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(format!("http://{}", addr))
}

fn payload(bytes: &[u8]) -> CapturePayload {
    let id = Uuid::new_v4();
    CapturePayload {
        id,
        name: format!("file-{}", id.simple()),
        filename: format!("file-{}.wav", id.simple()),
        mime_type: "audio/wav",
        started_at: Utc::now(),
        data: bytes.to_vec(),
    }
}

fn orchestrator(
    endpoint: String,
    notes: Arc<MemoryNoteStore>,
) -> (UploadOrchestrator, mpsc::Receiver<docnotes_capture::Notice>) {
    let (notice_tx, notice_rx) = mpsc::channel(64);
    let config = TranscriptionConfig {
        endpoint,
        ..TranscriptionConfig::default()
    };
    let uploader = UploadOrchestrator::new(
        config,
        ResultIntegrator::new(notes),
        notice_tx,
        CancellationToken::new(),
    );
    (uploader, notice_rx)
}

async fn wait_until<F>(mut condition: F, timeout: Duration) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

#[tokio::test]
async fn successful_upload_integrates_one_note() -> Result<()> {
    let router = Router::new().route(
        "/api",
        post(|| async {
            Json(json!({
                "data": {
                    "id": "x1",
                    "filename": "f1.webm",
                    "transcription": "hello"
                }
            }))
        }),
    );
    let endpoint = format!("{}/api", spawn_endpoint(router).await?);

    let notes = Arc::new(MemoryNoteStore::new());
    let (uploader, _notices) = orchestrator(endpoint, notes.clone());

    let task = uploader.submit(payload(b"audio"), Some("c1".to_string()));

    let done = wait_until(|| task.status() == UploadStatus::Succeeded, Duration::from_secs(5)).await;
    assert!(done, "upload should succeed");

    // Integrator runs before the task finishes; give it a beat
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while notes.list().await.is_empty() && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let items = notes.list().await;
    assert_eq!(items.len(), 1, "exactly one note must be appended");
    let note = &items[0];
    assert_eq!(note.id, "x1");
    assert_eq!(note.filename, "f1.webm");
    assert_eq!(note.transcription, "hello");
    assert_eq!(note.client_id.as_deref(), Some("c1"));
    assert!(!note.is_edited);
    assert!(note.edited_transcription.is_none());

    assert_eq!(uploader.in_flight(), 0);
    Ok(())
}

#[tokio::test]
async fn structured_error_body_is_surfaced() -> Result<()> {
    let router = Router::new().route(
        "/api",
        post(|| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "model overloaded"})),
            )
        }),
    );
    let endpoint = format!("{}/api", spawn_endpoint(router).await?);

    let notes = Arc::new(MemoryNoteStore::new());
    let (uploader, mut notices) = orchestrator(endpoint, notes.clone());

    let task = uploader.submit(payload(b"audio"), None);
    let done = wait_until(|| task.status() == UploadStatus::Failed, Duration::from_secs(5)).await;
    assert!(done, "upload should fail");

    let notice = notices.recv().await.expect("a failure notice");
    assert_eq!(notice.message, "Error response 500: model overloaded");

    // Failed uploads never reach the integrator
    assert!(notes.list().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn plain_text_error_body_is_surfaced() -> Result<()> {
    let router = Router::new().route(
        "/api",
        post(|| async { (StatusCode::BAD_GATEWAY, "upstream unavailable") }),
    );
    let endpoint = format!("{}/api", spawn_endpoint(router).await?);

    let notes = Arc::new(MemoryNoteStore::new());
    let (uploader, mut notices) = orchestrator(endpoint, notes.clone());

    let task = uploader.submit(payload(b"audio"), None);
    wait_until(|| task.status() == UploadStatus::Failed, Duration::from_secs(5)).await;

    let notice = notices.recv().await.expect("a failure notice");
    assert_eq!(notice.message, "Error response 502: upstream unavailable");
    Ok(())
}

#[tokio::test]
async fn empty_error_body_degrades_to_generic_message() -> Result<()> {
    let router = Router::new().route(
        "/api",
        post(|| async { StatusCode::SERVICE_UNAVAILABLE.into_response() }),
    );
    let endpoint = format!("{}/api", spawn_endpoint(router).await?);

    let notes = Arc::new(MemoryNoteStore::new());
    let (uploader, mut notices) = orchestrator(endpoint, notes.clone());

    let task = uploader.submit(payload(b"audio"), None);
    wait_until(|| task.status() == UploadStatus::Failed, Duration::from_secs(5)).await;

    let notice = notices.recv().await.expect("a failure notice");
    assert_eq!(notice.message, "Error response 503: No response body");
    Ok(())
}

#[tokio::test]
async fn network_failure_marks_task_failed() -> Result<()> {
    // Nothing is listening on this port
    let notes = Arc::new(MemoryNoteStore::new());
    let (uploader, mut notices) =
        orchestrator("http://127.0.0.1:1/api".to_string(), notes.clone());

    let task = uploader.submit(payload(b"audio"), None);
    let done = wait_until(|| task.status() == UploadStatus::Failed, Duration::from_secs(5)).await;
    assert!(done);

    let notice = notices.recv().await.expect("a failure notice");
    assert_eq!(notice.message, "Upload request failed, see log");
    assert!(notes.list().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn in_flight_counter_tracks_concurrent_submissions() -> Result<()> {
    let router = Router::new().route(
        "/api",
        post(|| async {
            tokio::time::sleep(Duration::from_millis(300)).await;
            Json(json!({
                "data": {"id": "s", "filename": "s.wav", "transcription": "ok"}
            }))
        }),
    );
    let endpoint = format!("{}/api", spawn_endpoint(router).await?);

    let notes = Arc::new(MemoryNoteStore::new());
    let (uploader, _notices) = orchestrator(endpoint, notes.clone());

    let tasks: Vec<_> = (0..3)
        .map(|i| uploader.submit(payload(b"audio"), Some(format!("c{}", i))))
        .collect();

    // Incremented synchronously at submission
    assert_eq!(uploader.in_flight(), 3);

    let drained = {
        let uploader = uploader.clone();
        wait_until(move || uploader.in_flight() == 0, Duration::from_secs(5)).await
    };
    assert!(drained, "counter should return to zero");
    assert!(tasks.iter().all(|t| t.status() == UploadStatus::Succeeded));
    Ok(())
}

#[tokio::test]
async fn cancellation_aborts_pending_upload_without_integration() -> Result<()> {
    let router = Router::new().route(
        "/api",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Json(json!({
                "data": {"id": "late", "filename": "late.wav", "transcription": "late"}
            }))
        }),
    );
    let endpoint = format!("{}/api", spawn_endpoint(router).await?);

    let notes = Arc::new(MemoryNoteStore::new());
    let (uploader, _notices) = orchestrator(endpoint, notes.clone());

    let task = uploader.submit(payload(b"audio"), Some("c1".to_string()));
    assert_eq!(uploader.in_flight(), 1);
    assert_eq!(task.status(), UploadStatus::Pending);

    uploader.cancel_token().cancel();

    let done = wait_until(|| task.status() == UploadStatus::Failed, Duration::from_secs(5)).await;
    assert!(done, "cancelled task must end Failed");

    let drained = {
        let uploader = uploader.clone();
        wait_until(move || uploader.in_flight() == 0, Duration::from_secs(5)).await
    };
    assert!(drained);
    assert!(notes.list().await.is_empty(), "integrator must not run");
    Ok(())
}
