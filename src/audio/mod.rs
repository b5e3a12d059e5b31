pub mod analyzer;
pub mod device;
pub mod wav;

pub use analyzer::SignalAnalyzer;
pub use device::{
    create_encoder_with_fallback, AmplitudeFrame, AudioDevice, AudioEncoder, Codec,
    DeviceFactory, DeviceSource, EncoderConfig, EncoderEvent,
};
pub use wav::{PcmWavEncoder, WavStreamDevice};
