//! Visual particle bursts (no gameplay effect)

use std::f32::consts::TAU;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::vector::Vector2D;

/// A particle for visual effects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub pos: Vector2D,
    pub vel: Vector2D,
    /// 0xRRGGBB
    pub color: u32,
    pub size: f32,
    /// 1.0 at spawn, removed at 0.0
    pub life: f32,
    /// Life lost per second
    pub decay: f32,
}

/// Shape of a burst
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Burst {
    pub count: usize,
    pub color: u32,
    pub min_speed: f32,
    pub max_speed: f32,
    pub size: f32,
    pub decay: f32,
}

impl Burst {
    pub const fn brick(color: u32) -> Self {
        Self {
            count: 8,
            color,
            min_speed: 40.0,
            max_speed: 160.0,
            size: 3.0,
            decay: 1.8,
        }
    }

    /// Bigger, golden burst for cavity hits
    pub const fn cavity(color: u32) -> Self {
        Self {
            count: 16,
            color,
            min_speed: 60.0,
            max_speed: 220.0,
            size: 4.0,
            decay: 1.2,
        }
    }

    pub const fn ball_lost() -> Self {
        Self {
            count: 20,
            color: 0xFF3B30,
            min_speed: 80.0,
            max_speed: 240.0,
            size: 4.0,
            decay: 1.0,
        }
    }

    pub const fn pickup(color: u32) -> Self {
        Self {
            count: 12,
            color,
            min_speed: 30.0,
            max_speed: 120.0,
            size: 3.0,
            decay: 1.5,
        }
    }
}

/// Spray `burst.count` particles from `origin` in random directions
///
/// Nothing is spawned past `max_particles`.
pub fn spawn_burst<R: Rng + ?Sized>(
    particles: &mut Vec<Particle>,
    rng: &mut R,
    origin: Vector2D,
    burst: Burst,
    max_particles: usize,
) {
    let room = max_particles.saturating_sub(particles.len());
    for _ in 0..burst.count.min(room) {
        let angle = rng.random_range(0.0..TAU);
        let speed = if burst.max_speed > burst.min_speed {
            rng.random_range(burst.min_speed..burst.max_speed)
        } else {
            burst.min_speed
        };
        particles.push(Particle {
            pos: origin,
            vel: Vector2D::from_angle(angle, speed),
            color: burst.color,
            size: burst.size * rng.random_range(0.6..1.2),
            life: 1.0,
            decay: burst.decay,
        });
    }
}

/// Integrate, fade and cull particles
pub fn update_particles(particles: &mut Vec<Particle>, dt: f32) {
    for particle in particles.iter_mut() {
        particle.pos.add(particle.vel * dt);
        particle.life -= particle.decay * dt;
    }
    particles.retain(|p| p.life > 0.0);
}
