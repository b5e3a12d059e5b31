use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub detection: DetectionConfig,
    pub transcription: TranscriptionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

/// Voice-activity detection tuning
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionConfig {
    /// Noise floor in dBFS; bin energies at or below it read as zero
    #[serde(default = "default_min_decibels")]
    pub min_decibels: f32,
    /// Silence duration before a recording auto-stops
    #[serde(default = "default_max_pause_ms")]
    pub max_pause_ms: u64,
    /// Scheduling tick interval
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

/// Options forwarded to the transcription endpoint with every upload
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionConfig {
    /// Transcription language hint
    pub language: String,
    /// Provider endpoint; also the POST target for uploads
    pub endpoint: String,
    /// Sampling temperature
    #[serde(default)]
    pub temperature: f32,
    /// Whether the server persists the raw audio file
    #[serde(default)]
    pub save_file: bool,
    /// API key passed through in the options payload
    #[serde(default)]
    pub credential: String,
}

fn default_min_decibels() -> f32 {
    -60.0
}

fn default_max_pause_ms() -> u64 {
    1500
}

fn default_tick_interval_ms() -> u64 {
    100
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_decibels: default_min_decibels(),
            max_pause_ms: default_max_pause_ms(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            endpoint: "http://localhost:9000/api/transcribe".to_string(),
            temperature: 0.0,
            save_file: false,
            credential: String::new(),
        }
    }
}
