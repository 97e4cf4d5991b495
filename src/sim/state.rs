//! Game state and core simulation types

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::ball::{Ball, TrailPoint};
use super::bricks::BrickGrid;
use super::collision::Bounds;
use super::paddle::Paddle;
use super::particles::Particle;
use super::powerup::{Pickup, PowerUpType};
use crate::consts::*;
use crate::theme::Theme;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Ball parked above the paddle, waiting for the start input
    Ready,
    /// Active gameplay
    Playing,
    /// Game is paused
    Paused,
    /// Run ended
    GameOver,
}

/// Something that happened during a tick (drives sound and HUD effects)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    GameStarted,
    Paused,
    Resumed,
    WallHit,
    PaddleHit,
    BrickDestroyed { cavity: bool, chained: bool },
    PowerUpSpawned(PowerUpType),
    PowerUpCollected(PowerUpType),
    MultiBall { spawned: usize },
    CavityEntered,
    CavityLeft,
    BallLost,
    LifeLost { lives: u32 },
    GameOver { score: u64, level: u32 },
    LevelComplete { level: u32, bonus: u64 },
}

/// Complete game state
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    pub bounds: Bounds,
    pub theme: Theme,
    pub phase: GamePhase,
    pub score: u64,
    pub lives: u32,
    /// 1-based level number
    pub level: u32,
    /// Bricks destroyed this level
    pub combo: u32,
    pub multiplier: u32,
    pub paddle: Paddle,
    pub balls: Vec<Ball>,
    pub bricks: BrickGrid,
    pub pickups: Vec<Pickup>,
    /// Visual particles (not gameplay-affecting)
    pub particles: Vec<Particle>,
    pub max_particles: usize,
    /// Timestamp of the latest tick (ms)
    pub now: f64,
    next_id: u32,
}

impl GameState {
    /// Create a new game state with the given seed
    pub fn new(seed: u64, theme: Theme) -> Self {
        let bounds = Bounds::default();
        let bricks = BrickGrid::generate(1, &theme.brick_colors);
        let mut state = Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            bounds,
            theme,
            phase: GamePhase::Ready,
            score: 0,
            lives: INITIAL_LIVES,
            level: 1,
            combo: 0,
            multiplier: 1,
            paddle: Paddle::new(&bounds),
            balls: Vec::new(),
            bricks,
            pickups: Vec::new(),
            particles: Vec::new(),
            max_particles: MAX_PARTICLES,
            now: 0.0,
            next_id: 1,
        };

        state.spawn_ball_parked();

        state
    }

    /// Throw everything away and start over with the same theme
    pub fn restart(&mut self, seed: u64) {
        let theme = std::mem::take(&mut self.theme);
        let max_particles = self.max_particles;
        let ai = (self.paddle.ai_enabled, self.paddle.ai_strength);
        *self = Self::new(seed, theme);
        self.max_particles = max_particles;
        self.paddle.ai_enabled = ai.0;
        self.paddle.ai_strength = ai.1;
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Where fresh balls appear: centered above the paddle
    pub fn reset_position(&self) -> (f32, f32) {
        (
            self.paddle.center_x(),
            self.paddle.pos.y - BALL_RADIUS * 4.0,
        )
    }

    /// Spawn a stationary ball above the paddle (Ready phase)
    pub fn spawn_ball_parked(&mut self) {
        let id = self.next_entity_id();
        let (x, y) = self.reset_position();
        self.balls.push(Ball::new(id, x, y));
    }

    /// Spawn a ball at the reset position already heading up
    ///
    /// The horizontal direction is a coin flip; the vertical launch speed is
    /// fixed.
    pub fn spawn_ball_launched(&mut self) {
        let id = self.next_entity_id();
        let (x, y) = self.reset_position();
        let mut ball = Ball::new(id, x, y);
        let sign = if self.rng.random_bool(0.5) { 1.0 } else { -1.0 };
        ball.set_velocity(BALL_LAUNCH_SPEED_X * sign, BALL_LAUNCH_SPEED_Y);
        self.balls.push(ball);
    }

    /// Launch every parked ball
    pub fn launch_parked_balls(&mut self) {
        for i in 0..self.balls.len() {
            if self.balls[i].vel.magnitude() == 0.0 {
                let sign = if self.rng.random_bool(0.5) { 1.0 } else { -1.0 };
                self.balls[i].set_velocity(BALL_LAUNCH_SPEED_X * sign, BALL_LAUNCH_SPEED_Y);
            }
        }
    }

    /// Split the lead ball, never exceeding `MAX_BALLS`. Returns balls added.
    pub fn spawn_multi_ball(&mut self) -> usize {
        let Some(template) = self.balls.first().cloned() else {
            return 0;
        };

        let mut spawned = 0;
        for spread in [MULTI_BALL_SPREAD, -MULTI_BALL_SPREAD] {
            if self.balls.len() >= MAX_BALLS {
                break;
            }
            let mut ball = template.clone();
            ball.id = self.next_entity_id();
            ball.vel.rotate(spread);
            ball.trail.clear();
            self.balls.push(ball);
            spawned += 1;
        }
        spawned
    }

    /// Build the read-only view handed to the renderer
    pub fn snapshot(&self) -> Snapshot {
        let now = self.now;
        Snapshot {
            phase: self.phase,
            score: self.score,
            lives: self.lives,
            level: self.level,
            combo: self.combo,
            multiplier: self.multiplier,
            background_color: self.theme.background_color,
            bricks: self
                .bricks
                .visible()
                .map(|b| RectView {
                    x: b.pos.x,
                    y: b.pos.y,
                    width: b.width,
                    height: b.height,
                    color: b.color,
                })
                .collect(),
            paddle: PaddleView {
                x: self.paddle.pos.x,
                y: self.paddle.pos.y,
                width: self.paddle.width,
                height: self.paddle.height(),
                glow: self.paddle.glow_intensity(now),
                magnetic: self.paddle.has_power_up(PowerUpType::Magnetic, now),
                magnetic_range: self.paddle.magnetic_range,
            },
            balls: self
                .balls
                .iter()
                .map(|b| BallView {
                    x: b.pos.x,
                    y: b.pos.y,
                    radius: b.radius(),
                    energy: b.energy_level,
                    glowing: b.glowing,
                    golden: b.cavity.is_bonus(),
                    trail: b.trail.clone(),
                })
                .collect(),
            pickups: self
                .pickups
                .iter()
                .map(|p| PickupView {
                    x: p.pos.x,
                    y: p.pos.y,
                    width: p.width,
                    height: p.height,
                    color: self.theme.power_up_color(p.kind),
                    icon: self.theme.power_up_icon(p.kind).map(str::to_owned),
                })
                .collect(),
            particles: self
                .particles
                .iter()
                .map(|p| ParticleView {
                    x: p.pos.x,
                    y: p.pos.y,
                    size: p.size,
                    color: p.color,
                    alpha: p.life.clamp(0.0, 1.0),
                })
                .collect(),
        }
    }
}

/// Everything the renderer needs for one frame, drawn back to front:
/// bricks, paddle, balls, pickups, particles
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub phase: GamePhase,
    pub score: u64,
    pub lives: u32,
    pub level: u32,
    pub combo: u32,
    pub multiplier: u32,
    pub background_color: u32,
    pub bricks: Vec<RectView>,
    pub paddle: PaddleView,
    pub balls: Vec<BallView>,
    pub pickups: Vec<PickupView>,
    pub particles: Vec<ParticleView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RectView {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub color: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaddleView {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub glow: f32,
    pub magnetic: bool,
    pub magnetic_range: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct BallView {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub energy: f32,
    pub glowing: bool,
    /// In the cavity or its grace period
    pub golden: bool,
    pub trail: Vec<TrailPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PickupView {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub color: u32,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParticleView {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub color: u32,
    pub alpha: f32,
}
