//! Voice-activity detection state machine.
//!
//! Consumes one boolean voice-present signal per scheduling tick and decides
//! when encoded capture starts and stops. All debouncing lives here: the
//! analyzer feeds it a raw per-tick signal, and the silence countdown turns
//! that into utterance boundaries without truncating recordings on brief
//! pauses.

use std::time::Duration;

use tracing::debug;

/// Current position of the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadState {
    /// Disarmed; voice has no effect.
    Idle,
    /// Armed by explicit user action, listening for the first voiced tick.
    Armed,
    /// A recording session is open.
    Recording,
    /// Silence observed while recording; accumulating elapsed time toward
    /// the auto-stop threshold.
    SilenceCountdown,
}

/// Side effect the caller must perform after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadCommand {
    /// Open a new recording session and start the encoder.
    StartCapture,
    /// Close the active session and instruct the encoder to stop.
    StopCapture,
}

pub struct VadMachine {
    state: VadState,
    silence: Duration,
    max_pause: Duration,
}

impl VadMachine {
    pub fn new(max_pause: Duration) -> Self {
        Self {
            state: VadState::Idle,
            silence: Duration::ZERO,
            max_pause,
        }
    }

    pub fn state(&self) -> VadState {
        self.state
    }

    /// Elapsed silence inside the current countdown. Zero in every other
    /// state: the accumulator only advances while in SilenceCountdown.
    pub fn silence_elapsed(&self) -> Duration {
        self.silence
    }

    pub fn is_armed(&self) -> bool {
        self.state != VadState::Idle
    }

    /// User-level arm toggle. Stays listening until voice is seen.
    pub fn arm(&mut self) {
        if self.state == VadState::Idle {
            debug!("VAD: Idle -> Armed");
            self.state = VadState::Armed;
            self.silence = Duration::ZERO;
        }
    }

    /// Explicit stop action. Wins over any signal on the same scheduling
    /// slice: callers apply disarm before the tick queued behind it. Forces
    /// an immediate stop of an in-progress capture regardless of countdown.
    pub fn disarm(&mut self) -> Option<VadCommand> {
        let was = self.state;
        self.state = VadState::Idle;
        self.silence = Duration::ZERO;

        match was {
            VadState::Recording | VadState::SilenceCountdown => {
                debug!("VAD: {:?} -> Idle (disarm, stopping capture)", was);
                Some(VadCommand::StopCapture)
            }
            VadState::Armed => {
                debug!("VAD: Armed -> Idle (disarm)");
                None
            }
            VadState::Idle => None,
        }
    }

    /// Advance one scheduling tick.
    ///
    /// `elapsed` is the wall time since the previous tick; it only matters
    /// inside the silence countdown.
    pub fn tick(&mut self, voice_present: bool, elapsed: Duration) -> Option<VadCommand> {
        match (self.state, voice_present) {
            (VadState::Idle, _) => None,

            (VadState::Armed, true) => {
                debug!("VAD: Armed -> Recording");
                self.state = VadState::Recording;
                self.silence = Duration::ZERO;
                Some(VadCommand::StartCapture)
            }
            (VadState::Armed, false) => None,

            (VadState::Recording, true) => None,
            (VadState::Recording, false) => {
                debug!("VAD: Recording -> SilenceCountdown");
                self.state = VadState::SilenceCountdown;
                // The tick that detects silence contributes its own elapsed
                // time, so N consecutive silent ticks of T ms reach N*T.
                self.silence = elapsed;
                self.check_countdown()
            }

            (VadState::SilenceCountdown, true) => {
                debug!(
                    "VAD: SilenceCountdown -> Recording (voice after {:?})",
                    self.silence
                );
                self.state = VadState::Recording;
                self.silence = Duration::ZERO;
                None
            }
            (VadState::SilenceCountdown, false) => {
                self.silence += elapsed;
                self.check_countdown()
            }
        }
    }

    fn check_countdown(&mut self) -> Option<VadCommand> {
        if self.silence >= self.max_pause {
            debug!(
                "VAD: SilenceCountdown -> Armed (pause {:?} >= {:?})",
                self.silence, self.max_pause
            );
            self.state = VadState::Armed;
            self.silence = Duration::ZERO;
            Some(VadCommand::StopCapture)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_millis(100);

    fn machine() -> VadMachine {
        VadMachine::new(Duration::from_millis(1500))
    }

    #[test]
    fn voice_is_ignored_while_idle() {
        let mut vad = machine();
        assert_eq!(vad.tick(true, TICK), None);
        assert_eq!(vad.state(), VadState::Idle);
    }

    #[test]
    fn recording_starts_only_from_armed_on_voice() {
        let mut vad = machine();
        vad.arm();
        assert_eq!(vad.tick(false, TICK), None);
        assert_eq!(vad.state(), VadState::Armed);
        assert_eq!(vad.tick(true, TICK), Some(VadCommand::StartCapture));
        assert_eq!(vad.state(), VadState::Recording);
    }

    #[test]
    fn fifteen_silent_ticks_stop_fourteen_do_not() {
        let mut vad = machine();
        vad.arm();
        vad.tick(true, TICK);

        for i in 0..14 {
            assert_eq!(vad.tick(false, TICK), None, "tick {} must not stop", i + 1);
        }
        assert_eq!(vad.state(), VadState::SilenceCountdown);
        assert_eq!(vad.silence_elapsed(), Duration::from_millis(1400));

        assert_eq!(vad.tick(false, TICK), Some(VadCommand::StopCapture));
        assert_eq!(vad.state(), VadState::Armed);
        assert_eq!(vad.silence_elapsed(), Duration::ZERO);
    }

    #[test]
    fn one_voiced_tick_cancels_the_countdown() {
        let mut vad = machine();
        vad.arm();
        vad.tick(true, TICK);

        for _ in 0..14 {
            vad.tick(false, TICK);
        }
        // A single above-floor tick resets the accumulator entirely
        assert_eq!(vad.tick(true, TICK), None);
        assert_eq!(vad.state(), VadState::Recording);
        assert_eq!(vad.silence_elapsed(), Duration::ZERO);

        // The countdown restarts from zero afterwards
        for _ in 0..14 {
            assert_eq!(vad.tick(false, TICK), None);
        }
        assert_eq!(vad.tick(false, TICK), Some(VadCommand::StopCapture));
    }

    #[test]
    fn disarm_during_recording_stops_immediately() {
        let mut vad = machine();
        vad.arm();
        vad.tick(true, TICK);
        assert_eq!(vad.disarm(), Some(VadCommand::StopCapture));
        assert_eq!(vad.state(), VadState::Idle);

        // Voice on the following tick has no effect: explicit intent won
        assert_eq!(vad.tick(true, TICK), None);
        assert_eq!(vad.state(), VadState::Idle);
    }

    #[test]
    fn disarm_during_countdown_stops_immediately() {
        let mut vad = machine();
        vad.arm();
        vad.tick(true, TICK);
        vad.tick(false, TICK);
        assert_eq!(vad.state(), VadState::SilenceCountdown);
        assert_eq!(vad.disarm(), Some(VadCommand::StopCapture));
        assert_eq!(vad.silence_elapsed(), Duration::ZERO);
    }

    #[test]
    fn disarm_while_armed_emits_nothing() {
        let mut vad = machine();
        vad.arm();
        assert_eq!(vad.disarm(), None);
        assert_eq!(vad.state(), VadState::Idle);
    }

    #[test]
    fn auto_stop_returns_to_armed_not_idle() {
        let mut vad = machine();
        vad.arm();
        vad.tick(true, TICK);
        for _ in 0..15 {
            vad.tick(false, TICK);
        }
        // Still armed: the next utterance starts without user action
        assert_eq!(vad.state(), VadState::Armed);
        assert_eq!(vad.tick(true, TICK), Some(VadCommand::StartCapture));
    }

    #[test]
    fn oversized_tick_stops_in_one_step() {
        let mut vad = machine();
        vad.arm();
        vad.tick(true, TICK);
        assert_eq!(
            vad.tick(false, Duration::from_millis(2000)),
            Some(VadCommand::StopCapture)
        );
    }

    #[test]
    fn accumulator_only_advances_inside_countdown() {
        let mut vad = machine();
        vad.arm();
        assert_eq!(vad.silence_elapsed(), Duration::ZERO);
        vad.tick(false, TICK);
        assert_eq!(vad.silence_elapsed(), Duration::ZERO);
        vad.tick(true, TICK);
        vad.tick(false, TICK);
        assert_eq!(vad.silence_elapsed(), TICK);
    }
}
