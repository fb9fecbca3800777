//! Keyboard stand-ins for the micro:bit controls
//!
//! `z` holds P0, `x` holds P1, `s` holds a loud sound level. Most terminals
//! only report presses and auto-repeat, so when release events are not
//! available a key counts as released once no repeat has arrived within the
//! hold window.

use super::SIM_BLOW_LEVEL;
use crossterm::event::KeyCode;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimKey {
    P0,
    P1,
    Blow,
}

impl SimKey {
    pub fn from_code(code: KeyCode) -> Option<Self> {
        match code {
            KeyCode::Char('z') | KeyCode::Char('Z') => Some(SimKey::P0),
            KeyCode::Char('x') | KeyCode::Char('X') => Some(SimKey::P1),
            KeyCode::Char('s') | KeyCode::Char('S') => Some(SimKey::Blow),
            _ => None,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Fields set while the matching key is held
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct KeyOverrides {
    pub p0: Option<i32>,
    pub p1: Option<i32>,
    pub s: Option<f32>,
}

#[derive(Default)]
pub struct KeyboardSim {
    /// Time (ms) of the last press or repeat per key
    held: [Option<u64>; 3],
}

impl KeyboardSim {
    pub fn press(&mut self, key: SimKey, now_ms: u64) {
        self.held[key.index()] = Some(now_ms);
    }

    pub fn release(&mut self, key: SimKey) {
        self.held[key.index()] = None;
    }

    pub fn release_all(&mut self) {
        self.held = [None; 3];
    }

    /// Release keys whose last press is older than `hold_ms`
    pub fn expire(&mut self, now_ms: u64, hold_ms: u64) {
        for slot in &mut self.held {
            if let Some(t) = *slot {
                if now_ms.saturating_sub(t) > hold_ms {
                    *slot = None;
                }
            }
        }
    }

    pub fn is_held(&self, key: SimKey) -> bool {
        self.held[key.index()].is_some()
    }

    pub fn overrides(&self) -> KeyOverrides {
        KeyOverrides {
            p0: self.is_held(SimKey::P0).then_some(1),
            p1: self.is_held(SimKey::P1).then_some(1),
            s: self.is_held(SimKey::Blow).then_some(SIM_BLOW_LEVEL),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_both_cases() {
        assert_eq!(SimKey::from_code(KeyCode::Char('z')), Some(SimKey::P0));
        assert_eq!(SimKey::from_code(KeyCode::Char('X')), Some(SimKey::P1));
        assert_eq!(SimKey::from_code(KeyCode::Char('s')), Some(SimKey::Blow));
        assert_eq!(SimKey::from_code(KeyCode::Char('q')), None);
    }

    #[test]
    fn press_and_release() {
        let mut kb = KeyboardSim::default();
        kb.press(SimKey::Blow, 10);
        assert_eq!(kb.overrides().s, Some(SIM_BLOW_LEVEL));
        assert_eq!(kb.overrides().p0, None);
        kb.release(SimKey::Blow);
        assert_eq!(kb.overrides(), KeyOverrides::default());
    }

    #[test]
    fn repeats_keep_key_held() {
        let mut kb = KeyboardSim::default();
        kb.press(SimKey::P1, 0);
        kb.expire(150, 180);
        kb.press(SimKey::P1, 150);
        kb.expire(300, 180);
        assert!(kb.is_held(SimKey::P1));
        kb.expire(331, 180);
        assert!(!kb.is_held(SimKey::P1));
    }
}
