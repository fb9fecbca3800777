//! What the player's input does to a fire they are standing on

use super::fire::{Fire, FireKind};
use crate::input::InputState;

/// Draw at or under which a blow scatters a large fire
pub const LARGE_SCATTER_CHANCE: f32 = 50.0;
/// Draw at or under which a blow scatters a medium fire
pub const MEDIUM_SCATTER_CHANCE: f32 = 25.0;
/// Damaged fires below this size go out
pub const REMOVE_BELOW: f32 = 20.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    None,
    /// Shrink the fire by one
    Damage,
    /// Blowing spreads embers: a new small fire appears nearby
    Scatter,
}

/// Decide the outcome for one fire this frame.
///
/// `draw` is a uniform sample in `[0, 100)` supplied by the caller; it only
/// matters for the scatter rules.
pub fn resolve(kind: FireKind, input: &InputState, draw: f32) -> Outcome {
    let blow = input.blowing();
    let (p0, p1) = (input.p0(), input.p1());

    match kind {
        FireKind::Large if blow && draw <= LARGE_SCATTER_CHANCE => Outcome::Scatter,
        FireKind::Medium if blow && draw <= MEDIUM_SCATTER_CHANCE => Outcome::Scatter,
        FireKind::Small if p0 || blow => Outcome::Damage,
        FireKind::Medium if p1 || (p0 && p1) => Outcome::Damage,
        FireKind::Large if p0 && p1 => Outcome::Damage,
        _ => Outcome::None,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DamageResult {
    /// The fire is out and must leave the store
    Removed,
    Remaining,
}

/// Apply one point of damage.
///
/// Damage uses its own bands (<40 small, <60 medium), so kind and size can
/// disagree with `FireKind::from_size` until the next reclassification.
pub fn apply_damage(fire: &mut Fire) -> DamageResult {
    fire.size -= 1.0;
    if fire.size < REMOVE_BELOW {
        return DamageResult::Removed;
    }
    if fire.size < 40.0 {
        fire.kind = FireKind::Small;
    } else if fire.size < 60.0 {
        fire.kind = FireKind::Medium;
    }
    DamageResult::Remaining
}

/// Water effect requested by the input, independent of the outcome
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Water {
    Light,
    Heavy,
}

pub fn water_effect(input: &InputState) -> Option<Water> {
    match (input.p0(), input.p1()) {
        (true, true) => Some(Water::Heavy),
        (true, false) => Some(Water::Light),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Vec2;

    const PRESS_P0: InputState = InputState { p0: 1, p1: 0, s: 0.0 };
    const PRESS_P1: InputState = InputState { p0: 0, p1: 1, s: 0.0 };
    const PRESS_BOTH: InputState = InputState { p0: 1, p1: 1, s: 0.0 };
    const BLOW: InputState = InputState { p0: 0, p1: 0, s: 250.0 };
    const BLOW_BOTH: InputState = InputState { p0: 1, p1: 1, s: 250.0 };
    const IDLE: InputState = InputState { p0: 0, p1: 0, s: 0.0 };

    fn fire(size: f32, kind: FireKind) -> Fire {
        Fire { pos: Vec2::new(0.0, 0.0), size, kind, ttl: 100, fire_life: 0, smoke: false }
    }

    #[test]
    fn small_fire_with_p0_always_damaged() {
        for draw in [0.0, 25.0, 50.0, 99.9] {
            assert_eq!(resolve(FireKind::Small, &PRESS_P0, draw), Outcome::Damage);
        }
    }

    #[test]
    fn small_fire_blown_out() {
        assert_eq!(resolve(FireKind::Small, &BLOW, 10.0), Outcome::Damage);
        assert_eq!(resolve(FireKind::Small, &PRESS_P1, 10.0), Outcome::None);
    }

    #[test]
    fn large_fire_blow_scatters_on_low_draw() {
        assert_eq!(resolve(FireKind::Large, &BLOW, 50.0), Outcome::Scatter);
        assert_eq!(resolve(FireKind::Large, &BLOW, 0.0), Outcome::Scatter);
    }

    #[test]
    fn large_fire_blow_high_draw_falls_through() {
        assert_eq!(resolve(FireKind::Large, &BLOW, 50.1), Outcome::None);
        assert_eq!(resolve(FireKind::Large, &BLOW_BOTH, 75.0), Outcome::Damage);
        assert_eq!(resolve(FireKind::Large, &BLOW_BOTH, 30.0), Outcome::Scatter);
    }

    #[test]
    fn medium_fire_rules() {
        assert_eq!(resolve(FireKind::Medium, &BLOW, 25.0), Outcome::Scatter);
        assert_eq!(resolve(FireKind::Medium, &BLOW, 26.0), Outcome::None);
        assert_eq!(resolve(FireKind::Medium, &PRESS_P1, 0.0), Outcome::Damage);
        assert_eq!(resolve(FireKind::Medium, &PRESS_P0, 0.0), Outcome::None);
        assert_eq!(resolve(FireKind::Medium, &PRESS_BOTH, 0.0), Outcome::Damage);
    }

    #[test]
    fn large_fire_needs_both_pins() {
        assert_eq!(resolve(FireKind::Large, &PRESS_P0, 0.0), Outcome::None);
        assert_eq!(resolve(FireKind::Large, &PRESS_P1, 0.0), Outcome::None);
        assert_eq!(resolve(FireKind::Large, &PRESS_BOTH, 0.0), Outcome::Damage);
    }

    #[test]
    fn scorched_never_affected() {
        for input in [PRESS_P0, PRESS_BOTH, BLOW, BLOW_BOTH, IDLE] {
            assert_eq!(resolve(FireKind::Scorched, &input, 0.0), Outcome::None);
        }
    }

    #[test]
    fn damage_removes_below_twenty() {
        let mut f = fire(20.0, FireKind::Small);
        assert_eq!(apply_damage(&mut f), DamageResult::Removed);

        let mut f = fire(21.0, FireKind::Small);
        assert_eq!(apply_damage(&mut f), DamageResult::Remaining);
        assert_eq!(f.size, 20.0);
    }

    #[test]
    fn damage_uses_its_own_bands() {
        let mut f = fire(40.0, FireKind::Medium);
        apply_damage(&mut f);
        assert_eq!(f.kind, FireKind::Small);
        assert_ne!(f.kind, FireKind::from_size(f.size));

        let mut f = fire(55.0, FireKind::Large);
        apply_damage(&mut f);
        assert_eq!(f.kind, FireKind::Medium);

        let mut f = fire(70.0, FireKind::Large);
        apply_damage(&mut f);
        assert_eq!(f.kind, FireKind::Large);
    }

    #[test]
    fn water_levels() {
        assert_eq!(water_effect(&PRESS_BOTH), Some(Water::Heavy));
        assert_eq!(water_effect(&PRESS_P0), Some(Water::Light));
        assert_eq!(water_effect(&PRESS_P1), None);
        assert_eq!(water_effect(&BLOW), None);
    }
}
