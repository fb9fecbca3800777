//! Input sources and the per-frame merged input state
//!
//! Each source (serial telemetry, simulated keys, microphone proxy) keeps its
//! own latest value. `InputSources::current` merges them with a fixed
//! priority: held keys win over serial, serial wins over the microphone.

pub mod keyboard;
pub mod mic;
pub mod serial;
pub mod telemetry;

use keyboard::KeyboardSim;
use telemetry::Telemetry;

/// Sound level above which the player is "blowing"
pub const BLOW_THRESHOLD: f32 = 200.0;
/// Sound level written by the simulated blow key
pub const SIM_BLOW_LEVEL: f32 = 250.0;

/// The three control values read by the simulation each frame
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InputState {
    pub p0: i32,
    pub p1: i32,
    pub s: f32,
}

impl InputState {
    pub fn new(p0: i32, p1: i32, s: f32) -> Self {
        Self { p0, p1, s }
    }

    pub fn p0(&self) -> bool {
        self.p0 == 1
    }

    pub fn p1(&self) -> bool {
        self.p1 == 1
    }

    pub fn blowing(&self) -> bool {
        self.s > BLOW_THRESHOLD
    }
}

impl From<Telemetry> for InputState {
    fn from(t: Telemetry) -> Self {
        Self { p0: t.p0, p1: t.p1, s: t.s }
    }
}

#[derive(Default)]
pub struct InputSources {
    pub serial: Option<Telemetry>,
    pub keyboard: KeyboardSim,
    /// Sound level from the microphone, if enabled
    pub proxy_s: Option<f32>,
}

impl InputSources {
    pub fn current(&self) -> InputState {
        let serial = self.serial.unwrap_or_default();
        let keys = self.keyboard.overrides();

        let s = match (keys.s, self.serial) {
            (Some(s), _) => s,
            (None, Some(t)) => t.s,
            (None, None) => self.proxy_s.unwrap_or(0.0),
        };

        InputState {
            p0: keys.p0.unwrap_or(serial.p0),
            p1: keys.p1.unwrap_or(serial.p1),
            s,
        }
    }

    /// Forget the serial reading (link dropped)
    pub fn clear_serial(&mut self) {
        self.serial = None;
    }
}

#[cfg(test)]
mod tests {
    use super::keyboard::SimKey;
    use super::*;

    #[test]
    fn defaults_to_zero() {
        let sources = InputSources::default();
        assert_eq!(sources.current(), InputState::default());
    }

    #[test]
    fn held_key_overrides_serial() {
        let mut sources = InputSources::default();
        sources.serial = Some(Telemetry { p0: 0, p1: 1, s: 30.0 });
        sources.keyboard.press(SimKey::P0, 0);
        let input = sources.current();
        assert_eq!(input.p0, 1);
        assert_eq!(input.p1, 1);
        assert_eq!(input.s, 30.0);

        sources.keyboard.release(SimKey::P0);
        assert_eq!(sources.current().p0, 0);
    }

    #[test]
    fn serial_overrides_mic_for_sound() {
        let mut sources = InputSources { proxy_s: Some(220.0), ..Default::default() };
        assert!(sources.current().blowing());

        sources.serial = Some(Telemetry { p0: 0, p1: 0, s: 12.0 });
        assert_eq!(sources.current().s, 12.0);

        sources.keyboard.press(SimKey::Blow, 0);
        assert_eq!(sources.current().s, SIM_BLOW_LEVEL);
    }

    #[test]
    fn blow_threshold_is_exclusive() {
        assert!(!InputState::new(0, 0, 200.0).blowing());
        assert!(InputState::new(0, 0, 200.5).blowing());
    }

    #[test]
    fn pins_only_count_when_exactly_one() {
        let input = InputState::new(2, -1, 0.0);
        assert!(!input.p0());
        assert!(!input.p1());
    }
}
