//! Cosmetic particles: water drops, breeze puffs, smoke and weather rain.
//! None of them affect fires.

use super::fire::Fire;
use super::Vec2;
use crate::input::InputState;
use rand::Rng;

const WATER_TTL: u32 = 40;
const BREEZE_TTL: u32 = 30;
const RAIN_TTL: u32 = 150;
const GRAVITY: f32 = 0.06;
/// Particles this far outside the canvas are culled
const CULL_MARGIN: f32 = 50.0;
const SMOKE_SIZE: f32 = 40.0;
const BREEZE_SIZE: f32 = 18.0;
/// Rain streaks per frame at full water level
const RAIN_RATE: f32 = 8.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParticleKind {
    WaterLight,
    WaterHeavy,
    Breeze,
    Smoke,
    Rain,
}

impl ParticleKind {
    fn falls(self) -> bool {
        matches!(self, ParticleKind::WaterLight | ParticleKind::WaterHeavy)
    }
}

#[derive(Clone, Debug)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub ttl: u32,
    pub size: f32,
    pub kind: ParticleKind,
}

impl Particle {
    /// Advance one frame. Returns false once expired.
    fn step(&mut self) -> bool {
        if self.kind.falls() {
            self.vel.y += GRAVITY;
        }
        self.pos = self.pos + self.vel;
        self.ttl = self.ttl.saturating_sub(1);
        self.ttl > 0
    }
}

/// Moving particles plus the static smoke puffs
#[derive(Default)]
pub struct Effects {
    pub particles: Vec<Particle>,
    pub smoke: Vec<Particle>,
}

impl Effects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.particles.clear();
        self.smoke.clear();
    }

    /// Drops falling onto a fire: 3 per frame when heavy, 1 when light
    pub fn emit_water<R: Rng>(&mut self, fire: &Fire, heavy: bool, rng: &mut R) {
        let count = if heavy { 3 } else { 1 };
        let spread = fire.size * 0.4;
        for _ in 0..count {
            let pos = Vec2::new(
                fire.pos.x + rng.gen_range(-spread..=spread),
                fire.pos.y - fire.size * 0.6 + rng.gen_range(-4.0..=4.0),
            );
            let vel = Vec2::new(rng.gen_range(-0.4..=0.4), rng.gen_range(1.5..=3.0));
            let (size, kind) = if heavy {
                ((fire.size * 0.35).max(16.0), ParticleKind::WaterHeavy)
            } else {
                ((fire.size * 0.25).max(14.0), ParticleKind::WaterLight)
            };
            self.particles.push(Particle { pos, vel, ttl: WATER_TTL, size, kind });
        }
    }

    /// Two puffs per frame from the player toward the fire
    pub fn emit_breeze<R: Rng>(&mut self, player: Vec2, fire: &Fire, rng: &mut R) {
        for _ in 0..2 {
            let start = Vec2::new(
                player.x + rng.gen_range(-6.0..=6.0),
                player.y + rng.gen_range(-6.0..=6.0),
            );
            let vel = (fire.pos - start).normalized() * rng.gen_range(1.5..=2.2);
            self.particles.push(Particle {
                pos: start,
                vel,
                ttl: BREEZE_TTL,
                size: BREEZE_SIZE,
                kind: ParticleKind::Breeze,
            });
        }
    }

    /// A static puff hovering just above a large fire
    pub fn emit_smoke<R: Rng>(&mut self, fire: &Fire, rng: &mut R) {
        self.smoke.push(Particle {
            pos: Vec2::new(fire.pos.x, fire.pos.y - rng.gen_range(15.0..=30.0)),
            vel: Vec2::ZERO,
            ttl: 0,
            size: SMOKE_SIZE,
            kind: ParticleKind::Smoke,
        });
    }

    /// Weather rain across the whole canvas, denser with more water
    pub fn emit_rain<R: Rng>(&mut self, width: f32, water_level: f32, rng: &mut R) {
        if water_level <= 0.0 {
            return;
        }
        let expected = water_level * RAIN_RATE;
        let mut count = expected.floor() as u32;
        if rng.gen::<f32>() < expected.fract() {
            count += 1;
        }
        for _ in 0..count {
            self.particles.push(Particle {
                pos: Vec2::new(rng.gen_range(0.0..width), -10.0),
                vel: Vec2::new(-0.6, rng.gen_range(6.0..9.0)),
                ttl: RAIN_TTL,
                size: 12.0,
                kind: ParticleKind::Rain,
            });
        }
    }

    /// Move every particle and drop the expired or off-canvas ones
    pub fn update(&mut self, width: f32, height: f32) {
        self.particles.retain_mut(|p| {
            let alive = p.step();
            alive
                && p.pos.x >= -CULL_MARGIN
                && p.pos.x <= width + CULL_MARGIN
                && p.pos.y >= -CULL_MARGIN
                && p.pos.y <= height + CULL_MARGIN
        });
    }

    /// Blowing clears smoke the player is standing in
    pub fn clear_smoke(&mut self, player: Vec2, input: &InputState) {
        if !input.blowing() {
            return;
        }
        self.smoke
            .retain(|puff| player.distance(puff.pos) > puff.size * 0.6);
    }
}
