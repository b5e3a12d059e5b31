//! The capture pipeline: one owned state struct driven by a single
//! scheduling loop.
//!
//! Every tick pulls an amplitude frame, reduces it to a voice-present
//! signal, and advances the VAD state machine; encoder events and control
//! events (arm, disarm, shutdown) are multiplexed into the same loop as
//! tagged variants. There is no parallel execution inside the core — the
//! only suspension points are the encoder's asynchronous stop
//! acknowledgement and the spawned upload requests, neither of which blocks
//! the tick.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};

use super::session::RecordingSession;
use crate::audio::{create_encoder_with_fallback, AudioDevice, AudioEncoder, EncoderEvent, SignalAnalyzer};
use crate::config::DetectionConfig;
use crate::notes::ClientSelection;
use crate::upload::UploadOrchestrator;
use crate::vad::{VadCommand, VadMachine, VadState};

/// Control events fed to the dispatcher from outside the tick loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureControl {
    Arm,
    Disarm,
    Shutdown,
}

const STATE_IDLE: u8 = 0;
const STATE_ARMED: u8 = 1;
const STATE_RECORDING: u8 = 2;
const STATE_COUNTDOWN: u8 = 3;

/// Shared snapshot of the pipeline, readable by the UI surface without
/// touching the loop.
pub struct CaptureStatus {
    vad_state: AtomicU8,
    device_ready: AtomicBool,
    in_flight: Arc<AtomicUsize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub vad_state: &'static str,
    pub armed: bool,
    pub device_ready: bool,
    pub in_flight: usize,
}

impl CaptureStatus {
    pub fn new(in_flight: Arc<AtomicUsize>) -> Self {
        Self {
            vad_state: AtomicU8::new(STATE_IDLE),
            device_ready: AtomicBool::new(false),
            in_flight,
        }
    }

    pub fn device_ready(&self) -> bool {
        self.device_ready.load(Ordering::SeqCst)
    }

    pub fn set_device_ready(&self, ready: bool) {
        self.device_ready.store(ready, Ordering::SeqCst);
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn set_vad_state(&self, state: VadState) {
        let value = match state {
            VadState::Idle => STATE_IDLE,
            VadState::Armed => STATE_ARMED,
            VadState::Recording => STATE_RECORDING,
            VadState::SilenceCountdown => STATE_COUNTDOWN,
        };
        self.vad_state.store(value, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let state = match self.vad_state.load(Ordering::SeqCst) {
            STATE_ARMED => "armed",
            STATE_RECORDING => "recording",
            STATE_COUNTDOWN => "silence_countdown",
            _ => "idle",
        };
        StatusSnapshot {
            vad_state: state,
            armed: state != "idle",
            device_ready: self.device_ready(),
            in_flight: self.in_flight(),
        }
    }
}

/// Cheap handle for controlling a running pipeline.
#[derive(Clone)]
pub struct CaptureHandle {
    control: mpsc::Sender<CaptureControl>,
    status: Arc<CaptureStatus>,
}

impl CaptureHandle {
    pub async fn arm(&self) -> Result<()> {
        self.control
            .send(CaptureControl::Arm)
            .await
            .context("capture pipeline is gone")
    }

    pub async fn disarm(&self) -> Result<()> {
        self.control
            .send(CaptureControl::Disarm)
            .await
            .context("capture pipeline is gone")
    }

    /// Tear the capture subsystem down: force-stop any active session,
    /// halt the tick loop, abort in-flight uploads.
    pub async fn shutdown(&self) -> Result<()> {
        self.control
            .send(CaptureControl::Shutdown)
            .await
            .context("capture pipeline is gone")
    }

    pub fn status(&self) -> &CaptureStatus {
        &self.status
    }

    pub fn status_arc(&self) -> Arc<CaptureStatus> {
        Arc::clone(&self.status)
    }
}

pub struct CapturePipeline {
    detection: DetectionConfig,
    device: Box<dyn AudioDevice>,
    encoder: Box<dyn AudioEncoder>,
    encoder_events: mpsc::Receiver<EncoderEvent>,
    analyzer: SignalAnalyzer,
    vad: VadMachine,
    /// Oldest-first queue of unfinalized sessions. Only the newest may be
    /// active; older entries are sealed and waiting for their stop ack.
    sessions: VecDeque<RecordingSession>,
    uploader: UploadOrchestrator,
    selection: ClientSelection,
    status: Arc<CaptureStatus>,
    control_rx: mpsc::Receiver<CaptureControl>,
}

impl CapturePipeline {
    /// Open the device, construct the encoder (with one fallback attempt),
    /// and wire up the dispatcher. Device and encoder failures propagate to
    /// the caller, which reports them once as a persistent status.
    pub async fn new(
        detection: DetectionConfig,
        mut device: Box<dyn AudioDevice>,
        uploader: UploadOrchestrator,
        selection: ClientSelection,
    ) -> Result<(Self, CaptureHandle)> {
        device.open().await?;

        let mut encoder = create_encoder_with_fallback(device.as_mut())?;
        let encoder_events = encoder
            .take_events()
            .context("encoder event channel already taken")?;

        info!("Capture pipeline ready (codec: {:?})", encoder.codec());

        let status = Arc::new(CaptureStatus::new(uploader.in_flight_counter()));
        status.set_device_ready(true);

        let (control_tx, control_rx) = mpsc::channel(16);
        let handle = CaptureHandle {
            control: control_tx,
            status: Arc::clone(&status),
        };

        let pipeline = Self {
            vad: VadMachine::new(Duration::from_millis(detection.max_pause_ms)),
            detection,
            device,
            encoder,
            encoder_events,
            analyzer: SignalAnalyzer::new(),
            sessions: VecDeque::new(),
            uploader,
            selection,
            status,
            control_rx,
        };

        Ok((pipeline, handle))
    }

    /// Drive the pipeline until shutdown. Single consumer of all events;
    /// ticks keep advancing while uploads are in flight.
    pub async fn run(mut self) {
        let mut interval =
            tokio::time::interval(Duration::from_millis(self.detection.tick_interval_ms.max(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_tick = Instant::now();

        loop {
            tokio::select! {
                // Control events are applied ahead of the tick queued behind
                // them: an explicit disarm wins over voice on the same slice.
                biased;

                control = self.control_rx.recv() => {
                    match control {
                        Some(CaptureControl::Arm) => {
                            self.vad.arm();
                            self.status.set_vad_state(self.vad.state());
                        }
                        Some(CaptureControl::Disarm) => {
                            let cmd = self.vad.disarm();
                            self.apply(cmd).await;
                            self.status.set_vad_state(self.vad.state());
                        }
                        Some(CaptureControl::Shutdown) | None => {
                            self.teardown();
                            break;
                        }
                    }
                }

                Some(event) = self.encoder_events.recv() => {
                    self.on_encoder_event(event).await;
                }

                _ = interval.tick() => {
                    let now = Instant::now();
                    let elapsed = now.duration_since(last_tick);
                    last_tick = now;
                    self.on_tick(elapsed).await;
                }
            }
        }

        info!("Capture pipeline stopped");
    }

    async fn on_tick(&mut self, elapsed: Duration) {
        let frame = self.device.sample_frame();
        let voice = self.analyzer.voice_present(&frame);
        let cmd = self.vad.tick(voice, elapsed);
        self.apply(cmd).await;
        self.status.set_vad_state(self.vad.state());
    }

    async fn apply(&mut self, cmd: Option<VadCommand>) {
        match cmd {
            Some(VadCommand::StartCapture) => {
                // At most one active session at a time
                if self.sessions.back().is_some_and(|s| s.is_active()) {
                    warn!("StartCapture refused: a session is already active");
                    return;
                }
                let session = RecordingSession::open(self.encoder.codec());
                info!("Recording session {} opened", session.id());
                self.sessions.push_back(session);
                self.encoder.start();
            }
            Some(VadCommand::StopCapture) => {
                match self.sessions.back_mut() {
                    Some(session) if session.is_active() => {
                        info!("Recording session {} stopping", session.id());
                        session.seal();
                        self.encoder.stop();
                    }
                    _ => warn!("StopCapture with no active session"),
                }
            }
            None => {}
        }
    }

    async fn on_encoder_event(&mut self, event: EncoderEvent) {
        match event {
            // Chunks belong to the oldest unfinalized session: with a single
            // encoder, everything delivered before a capture's stop ack was
            // recorded by that capture.
            EncoderEvent::Chunk(data) => match self.sessions.front_mut() {
                Some(session) => session.push_chunk(data),
                None => warn!("Dropping {} encoded bytes with no session", data.len()),
            },
            EncoderEvent::Stopped => {
                let Some(session) = self.sessions.pop_front() else {
                    warn!("Stop acknowledgement with no session");
                    return;
                };
                let payload = session.finalize();
                info!(
                    "Session {} finalized ({} bytes), submitting upload",
                    payload.id,
                    payload.data.len()
                );
                // Snapshot the selected client now; a later selection change
                // must not re-associate this upload.
                let client_id = self.selection.get().await;
                self.uploader.submit(payload, client_id);
            }
        }
    }

    fn teardown(&mut self) {
        info!("Tearing down capture pipeline");

        if self.vad.is_armed() {
            let cmd = self.vad.disarm();
            if cmd == Some(VadCommand::StopCapture) {
                if let Some(session) = self.sessions.back_mut() {
                    session.seal();
                }
                self.encoder.stop();
            }
        }
        self.status.set_vad_state(self.vad.state());

        // Abort rather than let uploads complete into a torn-down context
        self.uploader.cancel_token().cancel();
    }
}
