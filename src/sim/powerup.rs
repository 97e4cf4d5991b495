//! Power-ups: the closed set of types, absolute-expiry timers and the falling
//! pickup entity

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::collision::Aabb;
use crate::consts::*;
use crate::vector::Vector2D;

/// Every power-up the game knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PowerUpType {
    /// Splits the lead ball into up to two more
    MultiBall,
    /// Widens the paddle to 1.5x its base width
    WidePaddle,
    /// Pulls nearby balls toward the paddle
    Magnetic,
    /// Speeds balls up
    Fast,
    /// Slows balls down
    Slow,
    /// Spike: balls cut through up to three aligned bricks without bouncing
    Pierce,
}

/// What an effect attaches to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerUpTarget {
    Balls,
    Paddle,
    /// One-shot, no timer
    Instant,
}

impl PowerUpType {
    pub const ALL: [PowerUpType; 6] = [
        PowerUpType::MultiBall,
        PowerUpType::WidePaddle,
        PowerUpType::Magnetic,
        PowerUpType::Fast,
        PowerUpType::Slow,
        PowerUpType::Pierce,
    ];

    /// Effect duration in milliseconds (zero for instant effects)
    pub fn duration_ms(self) -> f64 {
        match self {
            PowerUpType::MultiBall => 0.0,
            PowerUpType::WidePaddle => WIDE_PADDLE_DURATION_MS,
            PowerUpType::Magnetic => MAGNETIC_DURATION_MS,
            PowerUpType::Fast => FAST_DURATION_MS,
            PowerUpType::Slow => SLOW_DURATION_MS,
            PowerUpType::Pierce => PIERCE_DURATION_MS,
        }
    }

    pub fn target(self) -> PowerUpTarget {
        match self {
            PowerUpType::MultiBall => PowerUpTarget::Instant,
            PowerUpType::WidePaddle | PowerUpType::Magnetic => PowerUpTarget::Paddle,
            PowerUpType::Fast | PowerUpType::Slow | PowerUpType::Pierce => PowerUpTarget::Balls,
        }
    }

    /// Stable key used for theme lookups (icons, colors)
    pub fn key(self) -> &'static str {
        match self {
            PowerUpType::MultiBall => "multi_ball",
            PowerUpType::WidePaddle => "wide_paddle",
            PowerUpType::Magnetic => "magnetic",
            PowerUpType::Fast => "fast",
            PowerUpType::Slow => "slow",
            PowerUpType::Pierce => "pierce",
        }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }
}

/// Active timed effects, each with an absolute expiry instant (ms)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimedEffects {
    expiries: BTreeMap<PowerUpType, f64>,
}

impl TimedEffects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start or refresh an effect. Returns true if it was not active before.
    pub fn apply(&mut self, kind: PowerUpType, now: f64, duration_ms: f64) -> bool {
        self.expiries.insert(kind, now + duration_ms).is_none()
    }

    /// Present and not yet expired
    pub fn is_active(&self, kind: PowerUpType, now: f64) -> bool {
        self.expiries.get(&kind).is_some_and(|&expiry| now < expiry)
    }

    /// Present in the table, regardless of expiry
    pub fn contains(&self, kind: PowerUpType) -> bool {
        self.expiries.contains_key(&kind)
    }

    pub fn expiry(&self, kind: PowerUpType) -> Option<f64> {
        self.expiries.get(&kind).copied()
    }

    pub fn remove(&mut self, kind: PowerUpType) -> bool {
        self.expiries.remove(&kind).is_some()
    }

    /// Evict every effect whose expiry has passed and report which ones
    pub fn sweep(&mut self, now: f64) -> Vec<PowerUpType> {
        let expired: Vec<PowerUpType> = self
            .expiries
            .iter()
            .filter(|&(_, &expiry)| now >= expiry)
            .map(|(&kind, _)| kind)
            .collect();
        for kind in &expired {
            self.expiries.remove(kind);
        }
        expired
    }

    pub fn clear(&mut self) {
        self.expiries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.expiries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PowerUpType, f64)> + '_ {
        self.expiries.iter().map(|(&kind, &expiry)| (kind, expiry))
    }
}

/// A power-up falling toward the paddle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pickup {
    pub id: u32,
    pub kind: PowerUpType,
    pub pos: Vector2D,
    pub vel: Vector2D,
    pub width: f32,
    pub height: f32,
}

impl Pickup {
    /// Spawn centered on `center` (usually the destroyed brick)
    pub fn new(id: u32, kind: PowerUpType, center: Vector2D) -> Self {
        Self {
            id,
            kind,
            pos: Vector2D::new(center.x - PICKUP_WIDTH / 2.0, center.y - PICKUP_HEIGHT / 2.0),
            vel: Vector2D::new(0.0, PICKUP_FALL_SPEED),
            width: PICKUP_WIDTH,
            height: PICKUP_HEIGHT,
        }
    }

    pub fn update(&mut self, dt: f32) {
        self.pos.add(self.vel * dt);
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.pos.x, self.pos.y, self.width, self.height)
    }
}
