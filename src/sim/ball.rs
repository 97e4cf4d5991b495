//! Ball entity

use serde::{Deserialize, Serialize};

use super::cavity::CavityState;
use super::collision::{Bounds, CircleBounds, WallHits, resolve_walls};
use super::powerup::{PowerUpType, TimedEffects};
use crate::consts::*;
use crate::vector::Vector2D;

/// Which velocity component(s) [`Ball::reverse`] flips
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Both,
}

/// Trail point for ball rendering (oldest first)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailPoint {
    pub x: f32,
    pub y: f32,
    /// When the point was recorded (ms)
    pub spawn_time: f64,
    /// 1.0 when fresh, fades to 0.0 over `TRAIL_FADE_MS`
    pub life: f32,
}

/// A ball entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ball {
    pub id: u32,
    pub pos: Vector2D,
    pub vel: Vector2D,
    radius: f32,
    /// Speed that maps to energy level 1.0
    pub base_speed: f32,
    pub power_ups: TimedEffects,
    /// Speed relative to base speed, capped at 2.0 (drives glow/trail intensity)
    pub energy_level: f32,
    /// Pierce glow
    #[serde(default)]
    pub glowing: bool,
    #[serde(default)]
    pub cavity: CavityState,
    #[serde(skip)]
    pub trail: Vec<TrailPoint>,
    #[serde(skip)]
    last_trail_time: Option<f64>,
}

impl Ball {
    pub fn new(id: u32, x: f32, y: f32) -> Self {
        Self::with_radius(id, x, y, BALL_RADIUS)
    }

    pub fn with_radius(id: u32, x: f32, y: f32, radius: f32) -> Self {
        Self {
            id,
            pos: Vector2D::new(x, y),
            vel: Vector2D::zero(),
            radius,
            base_speed: BALL_BASE_SPEED,
            power_ups: TimedEffects::new(),
            energy_level: 1.0,
            glowing: false,
            cavity: CavityState::Normal,
            trail: Vec::with_capacity(MAX_TRAIL_LENGTH),
            last_trail_time: None,
        }
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Advance one frame
    ///
    /// Moves the ball, bounces it off the side and top walls, evicts expired
    /// power-ups, ages the trail and recomputes the energy level. Falling out
    /// of the bottom is not handled here.
    pub fn update(&mut self, dt: f32, bounds: &Bounds, now: f64) -> WallHits {
        let step = self.vel * dt;
        self.pos.add(step);

        let hits = resolve_walls(&mut self.pos, &mut self.vel, self.radius, bounds);

        for kind in self.power_ups.sweep(now) {
            self.undo_power_up(kind);
        }

        self.update_trail(now);

        self.energy_level = if self.base_speed > 0.0 {
            (self.speed() / self.base_speed).min(MAX_ENERGY)
        } else {
            1.0
        };

        hits
    }

    fn update_trail(&mut self, now: f64) {
        for point in &mut self.trail {
            point.life = (1.0 - (now - point.spawn_time) / TRAIL_FADE_MS) as f32;
        }
        self.trail.retain(|p| p.life > 0.0);

        let due = self
            .last_trail_time
            .is_none_or(|last| now - last >= TRAIL_INTERVAL_MS);
        if due {
            self.trail.push(TrailPoint {
                x: self.pos.x,
                y: self.pos.y,
                spawn_time: now,
                life: 1.0,
            });
            self.last_trail_time = Some(now);
        }

        if self.trail.len() > MAX_TRAIL_LENGTH {
            let excess = self.trail.len() - MAX_TRAIL_LENGTH;
            self.trail.drain(..excess);
        }
    }

    pub fn set_velocity(&mut self, x: f32, y: f32) {
        self.vel.set(x, y);
    }

    pub fn add_velocity(&mut self, delta: Vector2D) {
        self.vel.add(delta);
    }

    pub fn speed(&self) -> f32 {
        self.vel.magnitude()
    }

    /// Rescale velocity to `speed`, keeping its direction (zero stays zero)
    pub fn set_speed(&mut self, speed: f32) {
        if self.vel.magnitude() > 0.0 {
            self.vel.normalize().multiply(speed);
        }
    }

    /// Speed effects scale the live velocity and the cavity base alike
    fn scale_speed(&mut self, factor: f32) {
        self.set_speed(self.speed() * factor);
        self.cavity.scale_base(factor);
    }

    pub fn reverse(&mut self, axis: Axis) {
        match axis {
            Axis::X => self.vel.x = -self.vel.x,
            Axis::Y => self.vel.y = -self.vel.y,
            Axis::Both => {
                self.vel.multiply(-1.0);
            }
        }
    }

    /// Start (or refresh) a timed power-up and apply its immediate effect
    pub fn apply_power_up(&mut self, kind: PowerUpType, duration_ms: f64, now: f64) {
        let fresh = !self.power_ups.contains(kind);
        match kind {
            PowerUpType::Fast if fresh => self.scale_speed(FAST_FACTOR),
            PowerUpType::Slow if fresh => self.scale_speed(SLOW_FACTOR),
            PowerUpType::Pierce => self.glowing = true,
            PowerUpType::Fast
            | PowerUpType::Slow
            | PowerUpType::MultiBall
            | PowerUpType::WidePaddle
            | PowerUpType::Magnetic => {}
        }
        self.power_ups.apply(kind, now, duration_ms);
    }

    pub fn has_power_up(&self, kind: PowerUpType, now: f64) -> bool {
        self.power_ups.is_active(kind, now)
    }

    pub fn remove_power_up(&mut self, kind: PowerUpType) {
        if self.power_ups.remove(kind) {
            self.undo_power_up(kind);
        }
    }

    fn undo_power_up(&mut self, kind: PowerUpType) {
        match kind {
            PowerUpType::Fast => self.scale_speed(1.0 / FAST_FACTOR),
            PowerUpType::Slow => self.scale_speed(1.0 / SLOW_FACTOR),
            PowerUpType::Pierce => self.glowing = false,
            PowerUpType::MultiBall | PowerUpType::WidePaddle | PowerUpType::Magnetic => {}
        }
    }

    /// Recenter and clear all transient state
    pub fn reset(&mut self, x: f32, y: f32) {
        self.pos.set(x, y);
        self.vel = Vector2D::zero();
        self.power_ups.clear();
        self.glowing = false;
        self.cavity = CavityState::Normal;
        self.trail.clear();
        self.last_trail_time = None;
        self.energy_level = 1.0;
    }

    pub fn bounds(&self) -> CircleBounds {
        CircleBounds::new(self.pos, self.radius)
    }

    pub fn serialize(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn deserialize(json: &str) -> serde_json::Result<Ball> {
        serde_json::from_str(json)
    }
}
