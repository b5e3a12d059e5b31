//! WAV-file backed audio source.
//!
//! Streams a WAV file tick by tick as if it were live input, which is how
//! offline runs and integration tests exercise the pipeline without a
//! microphone backend.

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use hound::WavReader;
use tokio::sync::mpsc;
use tracing::{error, info};

use super::device::{
    AmplitudeFrame, AudioDevice, AudioEncoder, Codec, EncoderConfig, EncoderEvent,
};
use crate::error::CaptureError;

/// Frequency-ish bands reported per frame. The file device derives band
/// energies from time-domain windows, which is all the analyzer needs.
const FRAME_BINS: usize = 8;

/// Upper bound of the byte scale, mirroring an analyser ceiling of -10 dBFS.
const MAX_DECIBELS: f32 = -10.0;

/// State shared between the device (producer of PCM windows) and the
/// encoder created over it.
struct EncoderShared {
    active: bool,
    samples: Vec<i16>,
}

pub struct WavStreamDevice {
    path: PathBuf,
    min_decibels: f32,
    tick_interval_ms: u64,
    sample_rate: u32,
    channels: u16,
    samples: Vec<i16>,
    cursor: usize,
    opened: bool,
    shared: Option<Arc<Mutex<EncoderShared>>>,
}

impl WavStreamDevice {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            min_decibels: -60.0,
            tick_interval_ms: 100,
            sample_rate: 16000,
            channels: 1,
            samples: Vec::new(),
            cursor: 0,
            opened: false,
            shared: None,
        }
    }

    pub fn with_noise_floor(mut self, min_decibels: f32) -> Self {
        self.min_decibels = min_decibels;
        self
    }

    pub fn with_tick_interval_ms(mut self, tick_interval_ms: u64) -> Self {
        self.tick_interval_ms = tick_interval_ms.max(1);
        self
    }

    /// Samples consumed per tick (all channels interleaved).
    fn window_len(&self) -> usize {
        let per_channel = self.sample_rate as u64 * self.tick_interval_ms / 1000;
        (per_channel as usize * self.channels as usize).max(1)
    }

    /// Reduce a window of PCM to per-band energy bytes scaled against the
    /// noise floor. A band at or below the floor reads zero.
    fn bin_energies(&self, window: &[i16]) -> Vec<u8> {
        if window.is_empty() {
            return vec![0; FRAME_BINS];
        }

        let band_len = (window.len() / FRAME_BINS).max(1);
        let span = (MAX_DECIBELS - self.min_decibels).max(1.0);

        window
            .chunks(band_len)
            .take(FRAME_BINS)
            .map(|band| {
                let sum_squares: f64 = band.iter().map(|&s| {
                    let v = s as f64 / i16::MAX as f64;
                    v * v
                }).sum();
                let rms = (sum_squares / band.len() as f64).sqrt();
                if rms <= 0.0 {
                    return 0;
                }
                let db = 20.0 * rms.log10() as f32;
                if db <= self.min_decibels {
                    0
                } else {
                    let scaled = (db - self.min_decibels) / span * 255.0;
                    scaled.clamp(1.0, 255.0) as u8
                }
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl AudioDevice for WavStreamDevice {
    async fn open(&mut self) -> Result<(), CaptureError> {
        let reader = WavReader::open(&self.path).map_err(|e| {
            CaptureError::DeviceUnavailable(format!(
                "failed to open {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                CaptureError::DeviceUnavailable(format!("failed to read samples: {}", e))
            })?;

        info!(
            "WAV stream opened: {} ({}Hz, {}ch, {} samples)",
            self.path.display(),
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        self.sample_rate = spec.sample_rate;
        self.channels = spec.channels;
        self.samples = samples;
        self.cursor = 0;
        self.opened = true;

        Ok(())
    }

    fn sample_frame(&mut self) -> AmplitudeFrame {
        if !self.opened || self.cursor >= self.samples.len() {
            // Stream exhausted: silence from here on
            return AmplitudeFrame::silent(FRAME_BINS);
        }

        let end = (self.cursor + self.window_len()).min(self.samples.len());
        let window = &self.samples[self.cursor..end];
        self.cursor = end;

        // Feed the active encoder the same window the analyzer sees
        if let Some(shared) = &self.shared {
            let mut shared = shared.lock().expect("encoder state poisoned");
            if shared.active {
                shared.samples.extend_from_slice(window);
            }
        }

        AmplitudeFrame {
            bins: self.bin_energies(window),
        }
    }

    fn create_encoder(
        &mut self,
        config: &EncoderConfig,
    ) -> Result<Box<dyn AudioEncoder>, CaptureError> {
        match config.codec {
            Codec::OpusWebm => Err(CaptureError::EncoderConfigUnsupported(
                "no opus/webm encoder in this build".to_string(),
            )),
            Codec::PcmWav => {
                let shared = Arc::new(Mutex::new(EncoderShared {
                    active: false,
                    samples: Vec::new(),
                }));
                self.shared = Some(Arc::clone(&shared));

                Ok(Box::new(PcmWavEncoder::new(
                    shared,
                    self.sample_rate,
                    self.channels,
                )))
            }
        }
    }
}

/// PCM/WAV fallback encoder.
///
/// Accumulates samples while active; on stop, containerizes them into a
/// single WAV blob and delivers it as one chunk followed by the stop
/// acknowledgement. Matches capture without a timeslice: all data arrives
/// when the recording ends.
pub struct PcmWavEncoder {
    shared: Arc<Mutex<EncoderShared>>,
    sample_rate: u32,
    channels: u16,
    event_tx: mpsc::Sender<EncoderEvent>,
    event_rx: Option<mpsc::Receiver<EncoderEvent>>,
}

impl PcmWavEncoder {
    fn new(shared: Arc<Mutex<EncoderShared>>, sample_rate: u32, channels: u16) -> Self {
        let (event_tx, event_rx) = mpsc::channel(64);
        Self {
            shared,
            sample_rate,
            channels,
            event_tx,
            event_rx: Some(event_rx),
        }
    }
}

impl AudioEncoder for PcmWavEncoder {
    fn start(&mut self) {
        let mut shared = self.shared.lock().expect("encoder state poisoned");
        shared.samples.clear();
        shared.active = true;
    }

    fn stop(&mut self) {
        let samples = {
            let mut shared = self.shared.lock().expect("encoder state poisoned");
            shared.active = false;
            std::mem::take(&mut shared.samples)
        };

        let tx = self.event_tx.clone();
        let sample_rate = self.sample_rate;
        let channels = self.channels;

        // Containerizing and the stop acknowledgement are asynchronous but
        // causally ordered: the chunk precedes Stopped on the same channel.
        tokio::spawn(async move {
            match encode_wav(&samples, sample_rate, channels) {
                Ok(bytes) => {
                    if tx.send(EncoderEvent::Chunk(bytes)).await.is_err() {
                        return;
                    }
                }
                Err(e) => error!("Failed to containerize PCM chunk: {}", e),
            }
            let _ = tx.send(EncoderEvent::Stopped).await;
        });
    }

    fn codec(&self) -> Codec {
        Codec::PcmWav
    }

    fn take_events(&mut self) -> Option<mpsc::Receiver<EncoderEvent>> {
        self.event_rx.take()
    }
}

fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Result<Vec<u8>, hound::Error> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device_with(samples: Vec<i16>) -> WavStreamDevice {
        let mut device = WavStreamDevice::new(PathBuf::from("unused.wav"));
        device.sample_rate = 16000;
        device.channels = 1;
        device.samples = samples;
        device.opened = true;
        device
    }

    #[test]
    fn silence_maps_to_zero_bins() {
        let mut device = device_with(vec![0i16; 1600]);
        let frame = device.sample_frame();
        assert!(frame.bins.iter().all(|&b| b == 0));
    }

    #[test]
    fn loud_signal_maps_above_zero() {
        let loud: Vec<i16> = (0..1600).map(|i| if i % 2 == 0 { 12000 } else { -12000 }).collect();
        let mut device = device_with(loud);
        let frame = device.sample_frame();
        assert!(frame.bins.iter().any(|&b| b > 0));
    }

    #[test]
    fn exhausted_stream_reads_silent() {
        let mut device = device_with(vec![5000i16; 100]);
        device.sample_frame();
        let frame = device.sample_frame();
        assert!(frame.bins.iter().all(|&b| b == 0));
    }

    #[test]
    fn preferred_codec_is_refused() {
        let mut device = device_with(vec![0i16; 100]);
        let result = device.create_encoder(&EncoderConfig::preferred());
        assert!(matches!(
            result,
            Err(CaptureError::EncoderConfigUnsupported(_))
        ));
    }

    #[test]
    fn wav_blob_has_riff_header() {
        let bytes = encode_wav(&[0i16; 16], 16000, 1).unwrap();
        assert_eq!(&bytes[..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
    }
}
