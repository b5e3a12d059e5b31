use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use docnotes_capture::capture::CapturePipeline;
use docnotes_capture::{
    create_router, AppState, CaptureError, ClientSelection, Config, DeviceFactory, DeviceSource,
    MemoryNoteStore, Notice, NoticeKind, NoticeSeverity, ResultIntegrator, UploadOrchestrator,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "docnotes-capture", about = "Hands-free session note capture")]
struct Args {
    /// Configuration file (without extension, config-crate style)
    #[arg(long, default_value = "config/docnotes-capture")]
    config: String,

    /// Stream a WAV file as the audio source instead of a microphone
    #[arg(long)]
    input: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!(
        "Detection: floor {} dB, max pause {} ms, tick {} ms",
        cfg.detection.min_decibels, cfg.detection.max_pause_ms, cfg.detection.tick_interval_ms
    );

    let notes = Arc::new(MemoryNoteStore::new());
    let selection = ClientSelection::new();

    // Notices feed; rendering is the embedding UI's job, here we just log
    let (notice_tx, mut notice_rx) = mpsc::channel::<Notice>(64);
    tokio::spawn(async move {
        while let Some(notice) = notice_rx.recv().await {
            match (notice.kind, notice.severity) {
                (NoticeKind::Persistent, _) => error!("[status] {}", notice.message),
                (_, NoticeSeverity::Error) => warn!("[notice] {}", notice.message),
                _ => info!("[notice] {}", notice.message),
            }
        }
    });

    let integrator = ResultIntegrator::new(notes.clone());
    let uploader = UploadOrchestrator::new(
        cfg.transcription.clone(),
        integrator,
        notice_tx.clone(),
        CancellationToken::new(),
    );

    let source = match &args.input {
        Some(path) => DeviceSource::File(path.clone()),
        None => DeviceSource::Microphone,
    };

    // Device- and encoder-level failures are reported once as a persistent
    // status; the service stays up with arming halted.
    let capture = match DeviceFactory::create(source, &cfg.detection) {
        Ok(device) => {
            match CapturePipeline::new(cfg.detection.clone(), device, uploader, selection.clone())
                .await
            {
                Ok((pipeline, handle)) => {
                    tokio::spawn(pipeline.run());
                    Some(handle)
                }
                Err(e) => {
                    report_device_failure(&notice_tx, &e).await;
                    None
                }
            }
        }
        Err(e) => {
            report_device_failure(&notice_tx, &anyhow::Error::new(e)).await;
            None
        }
    };

    let state = AppState::new(notes, selection, capture.clone());
    let router = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, router).await?;

    // Teardown: force-stop any active session and abort in-flight uploads
    if let Some(handle) = capture {
        let _ = handle.shutdown().await;
    }

    Ok(())
}

async fn report_device_failure(notices: &mpsc::Sender<Notice>, e: &anyhow::Error) {
    let message = match e.downcast_ref::<CaptureError>() {
        Some(CaptureError::DeviceUnavailable(reason)) => {
            format!("Audio device unavailable: {}", reason)
        }
        _ => format!("Recording disabled: {}", e),
    };
    error!("{}", message);
    let _ = notices
        .send(Notice::persistent(NoticeSeverity::Error, message))
        .await;
}
