//! Fire entities and their per-tick aging rules

use super::Vec2;
use crate::config::SimConfig;

/// Spawn sizes per kind
pub const SMALL_SIZE: f32 = 20.0;
pub const MEDIUM_SIZE: f32 = 40.0;
pub const LARGE_SIZE: f32 = 60.0;

pub const MEDIUM_MIN: f32 = 35.0;
pub const LARGE_MIN: f32 = 50.0;
/// Scorched patches never shrink below this
pub const SCORCHED_MIN: f32 = 16.0;
/// Collision radius as a fraction of size
pub const NEAR_FACTOR: f32 = 0.6;
/// Large fires smoke while `fire_life` is at or under this
pub const SMOKE_TICKS: u32 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FireKind {
    Small,
    Medium,
    Large,
    Scorched,
}

impl FireKind {
    /// Size band of a burning fire
    pub fn from_size(size: f32) -> Self {
        if size >= LARGE_MIN {
            FireKind::Large
        } else if size >= MEDIUM_MIN {
            FireKind::Medium
        } else {
            FireKind::Small
        }
    }

    pub fn is_burning(self) -> bool {
        self != FireKind::Scorched
    }

    pub fn spawn_size(self) -> f32 {
        match self {
            FireKind::Small => SMALL_SIZE,
            FireKind::Medium => MEDIUM_SIZE,
            FireKind::Large => LARGE_SIZE,
            FireKind::Scorched => SCORCHED_MIN,
        }
    }

}

#[derive(Clone, Debug)]
pub struct Fire {
    pub pos: Vec2,
    pub size: f32,
    pub kind: FireKind,
    /// Ticks left before burn-out
    pub ttl: i64,
    /// Ticks spent burning as a large fire
    pub fire_life: u32,
    pub smoke: bool,
}

impl Fire {
    pub fn spawn(pos: Vec2, kind: FireKind, cfg: &SimConfig) -> Self {
        Self {
            pos,
            size: kind.spawn_size(),
            kind,
            ttl: cfg.life_ticks(kind),
            fire_life: 0,
            smoke: false,
        }
    }

    pub fn is_burning(&self) -> bool {
        self.kind.is_burning()
    }

    pub fn is_near(&self, player: Vec2) -> bool {
        player.distance(self.pos) <= self.size * NEAR_FACTOR
    }

    /// Count down the burn timer. Returns true on the tick the fire burns out.
    pub fn age(&mut self) -> bool {
        if self.kind == FireKind::Large {
            self.fire_life += 1;
        }
        if !self.is_burning() {
            return false;
        }
        self.ttl -= 1;
        if self.ttl <= 0 {
            self.scorch();
            return true;
        }
        false
    }

    /// Permanent conversion to a scorched patch
    pub fn scorch(&mut self) {
        self.kind = FireKind::Scorched;
        self.size = (self.size * 0.9).floor().max(SCORCHED_MIN);
    }

    /// Periodic growth for fires that are not yet large
    pub fn grow(&mut self) {
        if self.is_burning() && self.kind != FireKind::Large {
            self.size += 1.0;
        }
    }

    pub fn reclassify(&mut self) {
        if self.is_burning() {
            self.kind = FireKind::from_size(self.size);
        }
    }

    /// Large fires in the first ticks of their large life emit smoke
    pub fn is_smoking(&self) -> bool {
        self.kind == FireKind::Large && self.fire_life <= SMOKE_TICKS
    }
}
