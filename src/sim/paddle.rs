//! The player's paddle

use serde::{Deserialize, Serialize};

use super::ball::Ball;
use super::collision::{Aabb, Bounds};
use super::powerup::{PowerUpType, TimedEffects};
use crate::consts::*;
use crate::vector::Vector2D;

/// A short-lived highlight on the paddle (e.g. after a ball hit)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlowEffect {
    pub started_at: f64,
    pub duration_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paddle {
    /// Top-left corner
    pub pos: Vector2D,
    pub vel: Vector2D,
    pub width: f32,
    /// Width restored when WIDE_PADDLE ends
    pub base_width: f32,
    height: f32,
    speed: f32,
    pub power_ups: TimedEffects,
    /// AI assist steers toward the predicted landing point of the nearest ball
    pub ai_enabled: bool,
    /// Fraction of full speed the AI may use (0-1)
    pub ai_strength: f32,
    pub ai_target_x: f32,
    /// Non-zero only while MAGNETIC is held
    pub magnetic_range: f32,
    pub magnetic_strength: f32,
    #[serde(skip)]
    pub glow_effects: Vec<GlowEffect>,
}

impl Paddle {
    /// Paddle centered horizontally near the bottom of `bounds`
    pub fn new(bounds: &Bounds) -> Self {
        let x = (bounds.width - PADDLE_WIDTH) / 2.0;
        Self {
            pos: Vector2D::new(x, bounds.height - PADDLE_BOTTOM_OFFSET),
            vel: Vector2D::zero(),
            width: PADDLE_WIDTH,
            base_width: PADDLE_WIDTH,
            height: PADDLE_HEIGHT,
            speed: PADDLE_SPEED,
            power_ups: TimedEffects::new(),
            ai_enabled: false,
            ai_strength: AI_DEFAULT_STRENGTH,
            ai_target_x: x,
            magnetic_range: 0.0,
            magnetic_strength: 0.0,
            glow_effects: Vec::new(),
        }
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.height
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn center_x(&self) -> f32 {
        self.pos.x + self.width / 2.0
    }

    pub fn center(&self) -> Vector2D {
        Vector2D::new(self.center_x(), self.pos.y + self.height / 2.0)
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.pos.x, self.pos.y, self.width, self.height)
    }

    pub fn move_left(&mut self) {
        self.vel.x = -self.speed;
    }

    pub fn move_right(&mut self) {
        self.vel.x = self.speed;
    }

    pub fn stop(&mut self) {
        self.vel.x = 0.0;
    }

    /// Advance one frame
    pub fn update(&mut self, dt: f32, bounds: &Bounds, balls: &[Ball], now: f64) {
        if self.ai_enabled {
            self.track_balls(balls);
        }

        self.pos.x += self.vel.x * dt;

        // The paddle can't be pushed into a wall
        let max_x = (bounds.width - self.width).max(0.0);
        if self.pos.x <= 0.0 {
            self.pos.x = 0.0;
            self.vel.x = 0.0;
        } else if self.pos.x >= max_x {
            self.pos.x = max_x;
            self.vel.x = 0.0;
        }

        for kind in self.power_ups.sweep(now) {
            self.undo_power_up(kind);
        }

        self.glow_effects
            .retain(|glow| now < glow.started_at + glow.duration_ms);
    }

    /// Steer toward where the soonest-arriving downward ball will cross the
    /// paddle line. With no downward ball the previous velocity is kept.
    fn track_balls(&mut self, balls: &[Ball]) {
        let soonest = balls
            .iter()
            .filter(|ball| ball.vel.y > 0.0)
            .filter_map(|ball| {
                let time_to_reach = (self.pos.y - ball.pos.y) / ball.vel.y;
                (time_to_reach > 0.0).then_some((time_to_reach, ball))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0));

        let Some((time_to_reach, ball)) = soonest else {
            return;
        };

        let predicted_x = ball.pos.x + ball.vel.x * time_to_reach;
        self.ai_target_x = predicted_x - self.width / 2.0;

        let error = self.ai_target_x - self.pos.x;
        if error.abs() > AI_DEADBAND {
            self.vel.x = error.signum() * self.speed * self.ai_strength;
        } else {
            self.vel.x = 0.0;
        }
    }

    pub fn apply_power_up(&mut self, kind: PowerUpType, duration_ms: f64, now: f64) {
        match kind {
            PowerUpType::WidePaddle => self.resize_centered(self.base_width * WIDE_PADDLE_FACTOR),
            PowerUpType::Magnetic => {
                self.magnetic_range = MAGNETIC_RANGE;
                self.magnetic_strength = MAGNETIC_STRENGTH;
            }
            PowerUpType::MultiBall
            | PowerUpType::Fast
            | PowerUpType::Slow
            | PowerUpType::Pierce => {}
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
            PowerUpType::WidePaddle => self.resize_centered(self.base_width),
            PowerUpType::Magnetic => {
                self.magnetic_range = 0.0;
                self.magnetic_strength = 0.0;
            }
            PowerUpType::MultiBall
            | PowerUpType::Fast
            | PowerUpType::Slow
            | PowerUpType::Pierce => {}
        }
    }

    fn resize_centered(&mut self, width: f32) {
        let center_x = self.center_x();
        self.width = width;
        self.pos.x = center_x - width / 2.0;
    }

    /// Pull balls within range toward the paddle center (linear falloff)
    pub fn apply_magnetic_force(&self, balls: &mut [Ball], now: f64) {
        if !self.has_power_up(PowerUpType::Magnetic, now) || self.magnetic_range <= 0.0 {
            return;
        }

        let center = self.center();
        for ball in balls.iter_mut() {
            let distance = ball.pos.distance(center);
            if distance > 0.0 && distance < self.magnetic_range {
                let falloff = 1.0 - distance / self.magnetic_range;
                let pull = (center - ball.pos).normalized() * (self.magnetic_strength * falloff);
                ball.add_velocity(pull);
            }
        }
    }

    /// Ball offset from the paddle center, normalized to [-1, 1]
    pub fn hit_position(&self, ball_x: f32) -> f32 {
        let half = self.width / 2.0;
        if half <= 0.0 {
            return 0.0;
        }
        ((ball_x - self.center_x()) / half).clamp(-1.0, 1.0)
    }

    pub fn add_glow(&mut self, now: f64) {
        self.glow_effects.push(GlowEffect {
            started_at: now,
            duration_ms: PADDLE_GLOW_MS,
        });
    }

    /// Strongest live glow, 0.0 when none
    pub fn glow_intensity(&self, now: f64) -> f32 {
        self.glow_effects
            .iter()
            .map(|glow| (1.0 - (now - glow.started_at) / glow.duration_ms).clamp(0.0, 1.0) as f32)
            .fold(0.0, f32::max)
    }

    /// Recenter and drop all power-ups (new game / new level)
    pub fn reset(&mut self, bounds: &Bounds) {
        self.power_ups.clear();
        self.width = self.base_width;
        self.magnetic_range = 0.0;
        self.magnetic_strength = 0.0;
        self.pos.set(
            (bounds.width - self.width) / 2.0,
            bounds.height - PADDLE_BOTTOM_OFFSET,
        );
        self.vel = Vector2D::zero();
        self.ai_target_x = self.pos.x;
        self.glow_effects.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> Bounds {
        Bounds::new(800.0, 600.0)
    }

    #[test]
    fn test_clamped_at_walls() {
        let mut paddle = Paddle::new(&bounds());
        paddle.move_left();
        paddle.update(10.0, &bounds(), &[], 0.0);
        assert_eq!(paddle.pos.x, 0.0);
        assert_eq!(paddle.vel.x, 0.0);

        paddle.move_right();
        paddle.update(10.0, &bounds(), &[], 0.0);
        assert_eq!(paddle.pos.x, 800.0 - paddle.width);
        assert_eq!(paddle.vel.x, 0.0);
    }

    #[test]
    fn test_hit_position_range() {
        let paddle = Paddle::new(&bounds());
        let center = paddle.center_x();
        assert_eq!(paddle.hit_position(center), 0.0);
        assert_eq!(paddle.hit_position(center + paddle.width / 2.0), 1.0);
        assert_eq!(paddle.hit_position(center - paddle.width / 4.0), -0.5);
        assert_eq!(paddle.hit_position(-1000.0), -1.0);
    }

    #[test]
    fn test_wide_paddle_does_not_compound() {
        let mut paddle = Paddle::new(&bounds());
        let center = paddle.center_x();
        paddle.apply_power_up(PowerUpType::WidePaddle, 1000.0, 0.0);
        paddle.apply_power_up(PowerUpType::WidePaddle, 1000.0, 10.0);
        assert_eq!(paddle.width, PADDLE_WIDTH * WIDE_PADDLE_FACTOR);
        assert_eq!(paddle.center_x(), center);

        paddle.update(0.0, &bounds(), &[], 1010.0);
        assert_eq!(paddle.width, PADDLE_WIDTH);
        assert!(!paddle.has_power_up(PowerUpType::WidePaddle, 1010.0));
    }

    #[test]
    fn test_ai_tracks_soonest_ball() {
        let mut paddle = Paddle::new(&bounds());
        paddle.ai_enabled = true;
        paddle.ai_strength = 1.0;

        // Far ball heading to the right, near ball heading to the left
        let mut far = Ball::new(1, 700.0, 100.0);
        far.set_velocity(0.0, 100.0);
        let mut near = Ball::new(2, 200.0, 400.0);
        near.set_velocity(-50.0, 100.0);

        paddle.update(0.0, &bounds(), &[far, near], 0.0);
        // near: t = (560 - 400) / 100 = 1.6, x = 200 - 80 = 120
        assert!((paddle.ai_target_x - (120.0 - PADDLE_WIDTH / 2.0)).abs() < 1e-3);
        assert_eq!(paddle.vel.x, -PADDLE_SPEED);
    }

    #[test]
    fn test_ai_deadband_stops() {
        let mut paddle = Paddle::new(&bounds());
        paddle.ai_enabled = true;
        let mut ball = Ball::new(1, paddle.center_x() + 1.0, 100.0);
        ball.set_velocity(0.0, 100.0);
        paddle.vel.x = 123.0;
        paddle.update(0.0, &bounds(), &[ball], 0.0);
        assert_eq!(paddle.vel.x, 0.0);
    }

    #[test]
    fn test_ai_keeps_velocity_without_downward_ball() {
        let mut paddle = Paddle::new(&bounds());
        paddle.ai_enabled = true;
        let mut ball = Ball::new(1, 100.0, 300.0);
        ball.set_velocity(0.0, -100.0);
        paddle.vel.x = 50.0;
        paddle.update(0.0, &bounds(), &[ball], 0.0);
        assert_eq!(paddle.vel.x, 50.0);
    }

    #[test]
    fn test_magnetic_pull_with_falloff() {
        let mut paddle = Paddle::new(&bounds());
        let center = paddle.center();

        let mut balls = vec![Ball::new(1, center.x, center.y - 75.0)];
        paddle.apply_magnetic_force(&mut balls, 0.0);
        assert_eq!(balls[0].vel, Vector2D::zero());

        paddle.apply_power_up(PowerUpType::Magnetic, 1000.0, 0.0);
        paddle.apply_magnetic_force(&mut balls, 0.0);
        // Half the range away: half strength, pointing down toward the paddle
        assert!(balls[0].vel.equals(Vector2D::new(0.0, MAGNETIC_STRENGTH * 0.5)));

        let mut far = vec![Ball::new(2, center.x, center.y - 400.0)];
        paddle.apply_magnetic_force(&mut far, 0.0);
        assert_eq!(far[0].vel, Vector2D::zero());
    }

    #[test]
    fn test_glow_records_are_pruned() {
        let mut paddle = Paddle::new(&bounds());
        paddle.add_glow(0.0);
        assert_eq!(paddle.glow_intensity(0.0), 1.0);
        paddle.update(0.0, &bounds(), &[], PADDLE_GLOW_MS + 1.0);
        assert!(paddle.glow_effects.is_empty());
        assert_eq!(paddle.glow_intensity(PADDLE_GLOW_MS + 1.0), 0.0);
    }
}
