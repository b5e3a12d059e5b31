use super::device::AmplitudeFrame;

/// Reduces one amplitude frame to a boolean voice-present signal.
///
/// Voice counts as present when any bin carries energy above the noise
/// floor, i.e. reads above zero. No smoothing or hysteresis happens here;
/// debouncing is entirely the state machine's job.
#[derive(Debug, Default)]
pub struct SignalAnalyzer;

impl SignalAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Pure reduction over the frame; no side effects.
    pub fn voice_present(&self, frame: &AmplitudeFrame) -> bool {
        frame.bins.iter().any(|&bin| bin > 0)
    }
}
