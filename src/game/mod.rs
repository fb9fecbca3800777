//! Fire-fighting simulation
//!
//! `Simulation` owns every piece of game state and advances it one frame at a
//! time. Rendering reads it; nothing else mutates it.

pub mod extinguish;
pub mod fire;
pub mod particles;
pub mod render;
pub mod weather;

use crate::config::SimConfig;
use crate::input::InputState;
use extinguish::{apply_damage, resolve, water_effect, DamageResult, Outcome, Water};
use fire::{Fire, FireKind};
use particles::Effects;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::{Add, Mul, Sub};
use weather::Weather;

/// Spawn margin from the canvas edges
const EDGE_MARGIN: f32 = 50.0;
/// Offset range for fires spread by a large fire
const SPREAD_RADIUS: f32 = 75.0;
/// Offset range for fires scattered by blowing
const SCATTER_RADIUS: f32 = 150.0;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (self - other).length()
    }

    /// Unit vector, or zero for a zero-length input
    pub fn normalized(self) -> Vec2 {
        let len = self.length();
        if len > 0.0 {
            Vec2::new(self.x / len, self.y / len)
        } else {
            Vec2::ZERO
        }
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, o: Vec2) -> Vec2 {
        Vec2::new(self.x + o.x, self.y + o.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, o: Vec2) -> Vec2 {
        Vec2::new(self.x - o.x, self.y - o.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, k: f32) -> Vec2 {
        Vec2::new(self.x * k, self.y * k)
    }
}

pub struct Simulation<R: Rng = StdRng> {
    pub cfg: SimConfig,
    pub fires: Vec<Fire>,
    pub effects: Effects,
    pub weather: Weather,
    pub player: Vec2,
    /// Spread-cycle counter, wraps to 0 at `fire_tick_speed`
    pub tick: u32,
    /// Frames simulated since the last reset
    pub frames: u64,
    pub extinguished: u32,
    rng: R,
}

impl Simulation<StdRng> {
    pub fn new(cfg: SimConfig, seed: u64) -> Self {
        let mut sim = Self::with_rng(cfg, StdRng::seed_from_u64(seed));
        sim.populate();
        sim
    }
}

impl<R: Rng> Simulation<R> {
    /// An empty field with the player in the centre
    pub fn with_rng(cfg: SimConfig, rng: R) -> Self {
        let player = Vec2::new(cfg.width / 2.0, cfg.height / 2.0);
        Self {
            cfg,
            fires: Vec::new(),
            effects: Effects::new(),
            weather: Weather::default(),
            player,
            tick: 0,
            frames: 0,
            extinguished: 0,
            rng,
        }
    }

    /// Scatter 2-9 fires of each burning kind across the canvas
    pub fn populate(&mut self) {
        for kind in [FireKind::Small, FireKind::Medium, FireKind::Large] {
            let count = self.rng.gen_range(2..10);
            for _ in 0..count {
                let pos = Vec2::new(
                    self.rng.gen_range(EDGE_MARGIN..self.cfg.width - EDGE_MARGIN),
                    self.rng.gen_range(EDGE_MARGIN..self.cfg.height - EDGE_MARGIN),
                );
                self.fires.push(Fire::spawn(pos, kind, &self.cfg));
            }
        }
        tracing::info!(fires = self.fires.len(), "field populated");
    }

    /// Start over with a fresh field, keeping the weather
    pub fn reset(&mut self) {
        self.fires.clear();
        self.effects.clear();
        self.player = Vec2::new(self.cfg.width / 2.0, self.cfg.height / 2.0);
        self.tick = 0;
        self.frames = 0;
        self.extinguished = 0;
        self.populate();
    }

    pub fn active_fires(&self) -> usize {
        self.fires.iter().filter(|f| f.is_burning()).count()
    }

    pub fn scorched(&self) -> usize {
        self.fires.len() - self.active_fires()
    }

    pub fn is_won(&self) -> bool {
        self.active_fires() == 0
    }

    /// Move the player by a step in each axis, clamped to the canvas
    pub fn move_player(&mut self, dx: f32, dy: f32) {
        self.player.x = (self.player.x + dx).clamp(0.0, self.cfg.width);
        self.player.y = (self.player.y + dy).clamp(0.0, self.cfg.height);
    }

    /// Arrow-key movement: one fixed step in a direction
    pub fn step_player(&mut self, dir_x: i8, dir_y: i8) {
        let step = self.cfg.player_step;
        self.move_player(dir_x as f32 * step, dir_y as f32 * step);
    }

    /// Tracker steering: a small step per frame
    pub fn steer(&mut self, dir_x: i8, dir_y: i8) {
        let step = self.cfg.blob_step;
        self.move_player(dir_x as f32 * step, dir_y as f32 * step);
    }

    /// Advance the whole game by one frame
    pub fn step(&mut self, input: &InputState) {
        self.frames += 1;
        self.tick += 1;
        if self.tick >= self.cfg.fire_tick_speed {
            self.tick = 0;
        }
        let grow_tick = self.tick == self.cfg.fire_tick_speed / 2;
        let spread_tick = self.tick == 0;

        let mut spawned = Vec::new();

        // Reverse so removal by index is safe
        for i in (0..self.fires.len()).rev() {
            let fire = &mut self.fires[i];

            if fire.age() {
                tracing::debug!(x = fire.pos.x, y = fire.pos.y, "fire burned out");
            }

            if fire.is_near(self.player) {
                let draw = self.rng.gen_range(0.0..100.0);
                match resolve(fire.kind, input, draw) {
                    Outcome::Scatter => {
                        let pos = offset(&mut self.rng, fire.pos, SCATTER_RADIUS, &self.cfg);
                        spawned.push(Fire::spawn(pos, FireKind::Small, &self.cfg));
                    }
                    Outcome::Damage => {
                        if apply_damage(fire) == DamageResult::Removed {
                            self.fires.remove(i);
                            self.extinguished += 1;
                            tracing::debug!(total = self.extinguished, "fire extinguished");
                            continue;
                        }
                    }
                    Outcome::None => {}
                }

                if fire.is_burning() {
                    match water_effect(input) {
                        Some(Water::Heavy) => self.effects.emit_water(fire, true, &mut self.rng),
                        Some(Water::Light) => self.effects.emit_water(fire, false, &mut self.rng),
                        None => {}
                    }
                    if input.blowing() {
                        self.effects.emit_breeze(self.player, fire, &mut self.rng);
                    }
                }
            }

            if grow_tick {
                fire.grow();
            }
            fire.reclassify();

            if fire.is_smoking() {
                self.effects.emit_smoke(fire, &mut self.rng);
                fire.smoke = true;
            }
            if fire.kind == FireKind::Large && fire.fire_life == self.cfg.large_burnout_life {
                fire.kind = FireKind::Scorched;
            }

            if spread_tick && fire.kind == FireKind::Large {
                let count = spread_count(&mut self.rng, self.weather.fire_spread_multiplier);
                for _ in 0..count {
                    let pos = offset(&mut self.rng, fire.pos, SPREAD_RADIUS, &self.cfg);
                    spawned.push(Fire::spawn(pos, FireKind::Small, &self.cfg));
                }
            }
        }

        self.fires.extend(spawned);

        self.effects.clear_smoke(self.player, input);
        self.effects
            .emit_rain(self.cfg.width, self.weather.water_level, &mut self.rng);
        self.effects.update(self.cfg.width, self.cfg.height);
    }
}

/// Random point within `radius` on each axis, kept on the canvas
fn offset<R: Rng>(rng: &mut R, center: Vec2, radius: f32, cfg: &SimConfig) -> Vec2 {
    Vec2::new(
        (center.x + rng.gen_range(-radius..=radius)).clamp(0.0, cfg.width),
        (center.y + rng.gen_range(-radius..=radius)).clamp(0.0, cfg.height),
    )
}

/// Whole part of the multiplier, plus one more with the fractional chance
fn spread_count<R: Rng>(rng: &mut R, multiplier: f32) -> u32 {
    let m = multiplier.max(0.0);
    let mut n = m.floor() as u32;
    if rng.gen::<f32>() < m.fract() {
        n += 1;
    }
    n
}
