use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::warn;

use crate::config::DetectionConfig;
use crate::error::CaptureError;

/// One tick's worth of per-bin signal energy.
///
/// Bin values are bytes scaled against the configured noise floor: a bin at
/// or below `min_decibels` reads zero. Produced and consumed within a single
/// scheduling tick, never stored.
#[derive(Debug, Clone)]
pub struct AmplitudeFrame {
    pub bins: Vec<u8>,
}

impl AmplitudeFrame {
    pub fn silent(bin_count: usize) -> Self {
        Self {
            bins: vec![0; bin_count],
        }
    }
}

/// Encoding the capture session asks the device for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// Opus in a WebM container (preferred; matches browser capture output)
    OpusWebm,
    /// Raw PCM in a WAV container (degraded fallback)
    PcmWav,
}

impl Codec {
    pub fn file_extension(&self) -> &'static str {
        match self {
            Codec::OpusWebm => "webm",
            Codec::PcmWav => "wav",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Codec::OpusWebm => "audio/webm",
            Codec::PcmWav => "audio/wav",
        }
    }
}

/// Configuration for encoder construction
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    pub codec: Codec,
    pub bits_per_second: u32,
}

impl EncoderConfig {
    /// The configuration tried first
    pub fn preferred() -> Self {
        Self {
            codec: Codec::OpusWebm,
            bits_per_second: 128_000,
        }
    }

    /// Degraded configuration retried once if the preferred one is refused
    pub fn fallback() -> Self {
        Self {
            codec: Codec::PcmWav,
            bits_per_second: 128_000,
        }
    }
}

/// Events delivered by an encoder after capture is started.
///
/// Chunk delivery is strictly ordered; `Stopped` arrives after the last
/// chunk of a stopped capture, acknowledging the stop instruction.
#[derive(Debug, Clone)]
pub enum EncoderEvent {
    Chunk(Vec<u8>),
    Stopped,
}

/// Live audio input supplying amplitude sampling and encoder construction.
///
/// Implementations:
/// - WAV file streaming (offline runs, integration tests)
/// - Embedder-provided microphone backends
#[async_trait::async_trait]
pub trait AudioDevice: Send {
    /// Open the underlying stream. Must succeed before any sampling;
    /// fails with [`CaptureError::DeviceUnavailable`].
    async fn open(&mut self) -> Result<(), CaptureError>;

    /// Pull the amplitude frame for the current tick.
    ///
    /// Callers must have verified readiness via [`AudioDevice::open`].
    fn sample_frame(&mut self) -> AmplitudeFrame;

    /// Construct an encoder over the open stream.
    ///
    /// Fails with [`CaptureError::EncoderConfigUnsupported`] when the codec
    /// cannot be produced; the caller retries once with the fallback config.
    fn create_encoder(
        &mut self,
        config: &EncoderConfig,
    ) -> Result<Box<dyn AudioEncoder>, CaptureError>;
}

/// Encoder half of the capture contract: start/stop chunked capture with
/// events delivered on the channel handed out by [`AudioEncoder::take_events`].
pub trait AudioEncoder: Send {
    /// Begin accumulating encoded audio.
    fn start(&mut self);

    /// Stop capture. Asynchronous: the final chunk and the `Stopped`
    /// acknowledgement arrive later on the event channel.
    fn stop(&mut self);

    /// Codec this encoder actually produces (after any fallback).
    fn codec(&self) -> Codec;

    /// Take the event receiver. Yields `Some` exactly once.
    fn take_events(&mut self) -> Option<mpsc::Receiver<EncoderEvent>>;
}

/// Try the preferred encoder configuration, falling back once on refusal.
///
/// Only a refusal of both configurations is surfaced to the caller.
pub fn create_encoder_with_fallback(
    device: &mut dyn AudioDevice,
) -> Result<Box<dyn AudioEncoder>, CaptureError> {
    match device.create_encoder(&EncoderConfig::preferred()) {
        Ok(encoder) => Ok(encoder),
        Err(CaptureError::EncoderConfigUnsupported(reason)) => {
            warn!(
                "Preferred encoder config refused ({}), retrying with fallback",
                reason
            );
            device.create_encoder(&EncoderConfig::fallback())
        }
        Err(e) => Err(e),
    }
}

/// Where audio comes from
#[derive(Debug, Clone)]
pub enum DeviceSource {
    /// Live microphone input
    Microphone,
    /// Stream a WAV file as if it were live input (offline runs, tests)
    File(PathBuf),
}

/// Audio device factory
pub struct DeviceFactory;

impl DeviceFactory {
    pub fn create(
        source: DeviceSource,
        detection: &DetectionConfig,
    ) -> Result<Box<dyn AudioDevice>, CaptureError> {
        match source {
            DeviceSource::Microphone => Err(CaptureError::DeviceUnavailable(
                "no microphone backend is compiled into this build; \
                 supply an AudioDevice implementation or use a file source"
                    .to_string(),
            )),
            DeviceSource::File(path) => Ok(Box::new(
                super::wav::WavStreamDevice::new(path)
                    .with_noise_floor(detection.min_decibels)
                    .with_tick_interval_ms(detection.tick_interval_ms),
            )),
        }
    }
}
