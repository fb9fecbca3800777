use crate::error::{Error, Result};
use crate::game::fire::FireKind;
use std::path::PathBuf;

pub const DEFAULT_WIDTH: f32 = 960.0;
pub const DEFAULT_HEIGHT: f32 = 540.0;
/// Ticks per spread cycle. Smaller is harder. Growth happens at half, so it
/// has to be even.
pub const DEFAULT_TICK_SPEED: u32 = 200;
pub const DEFAULT_BURNOUT_LIFE: u32 = 5;
pub const DEFAULT_FPS: u32 = 60;
pub const DEFAULT_BAUD: u32 = 115_200;
pub const DEFAULT_KEY_HOLD_MS: u64 = 180;
pub const DEFAULT_MIC_GAIN: f32 = 900.0;

/// Simulation parameters, fixed for the lifetime of a `Simulation`
#[derive(Clone, Debug)]
pub struct SimConfig {
    pub width: f32,
    pub height: f32,
    pub fire_tick_speed: u32,
    /// `fire_life` at which a large fire is forced to scorched
    pub large_burnout_life: u32,
    pub player_step: f32,
    pub blob_step: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            fire_tick_speed: DEFAULT_TICK_SPEED,
            large_burnout_life: DEFAULT_BURNOUT_LIFE,
            player_step: 15.0,
            blob_step: 3.0,
        }
    }
}

impl SimConfig {
    /// Burn time in ticks for a freshly spawned fire of this kind
    pub fn life_ticks(&self, kind: FireKind) -> i64 {
        let base: i64 = match kind {
            FireKind::Small => 6400,
            FireKind::Medium => 3200,
            FireKind::Large => 1600,
            FireKind::Scorched => 0,
        };
        base * self.fire_tick_speed as i64 / 50
    }

    pub fn validate(&self) -> Result<()> {
        if self.fire_tick_speed < 2 || self.fire_tick_speed % 2 != 0 {
            return Err(Error::InvalidConfig(format!(
                "tick speed must be even and at least 2, got {}",
                self.fire_tick_speed
            )));
        }
        // Fires spawn with a 50px margin on every side
        let usable = |v: f32| v.is_finite() && v > 100.0;
        if !usable(self.width) || !usable(self.height) {
            return Err(Error::InvalidConfig(format!(
                "canvas {}x{} is too small",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

/// Full configuration for a play session
#[derive(Clone, Debug)]
pub struct GameConfig {
    pub sim: SimConfig,
    pub fps: u32,
    pub seed: Option<u64>,
    pub serial: bool,
    pub port: Option<String>,
    pub baud: u32,
    pub key_hold_ms: u64,
    pub predictions: Option<PathBuf>,
    pub mic: bool,
    pub mic_gain: f32,
    pub summary: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            sim: SimConfig::default(),
            fps: DEFAULT_FPS,
            seed: None,
            serial: true,
            port: None,
            baud: DEFAULT_BAUD,
            key_hold_ms: DEFAULT_KEY_HOLD_MS,
            predictions: None,
            mic: false,
            mic_gain: DEFAULT_MIC_GAIN,
            summary: false,
        }
    }
}

impl GameConfig {
    pub fn frame_time(&self) -> f32 {
        1.0 / self.fps.max(1) as f32
    }

    pub fn validate(&self) -> Result<()> {
        self.sim.validate()?;
        if self.fps == 0 || self.fps > 240 {
            return Err(Error::InvalidConfig(format!("fps {} out of range 1-240", self.fps)));
        }
        Ok(())
    }
}
