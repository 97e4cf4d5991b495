//! Knockoff Arcade - a Wild-West Breakout
//!
//! Core modules:
//! - `vector`: 2D vector primitive used by every entity
//! - `sim`: Per-frame simulation (balls, paddle, bricks, power-ups, cavity, scoring)
//! - `audio`: Procedural sound synthesis, music playlist and voice channel
//! - `theme`: Palette, icons, playlist and sound flavour for a game variant
//! - `settings`: Player preferences
//! - `highscores` / `leaderboard`: Score persistence collaborators
//! - `platform`: Game session (composition root) and the browser binding

pub mod audio;
pub mod highscores;
pub mod leaderboard;
pub mod platform;
pub mod settings;
pub mod sim;
pub mod theme;
pub mod vector;

pub use audio::AudioManager;
pub use highscores::HighScores;
pub use settings::{QualityPreset, Settings};
pub use theme::Theme;
pub use vector::Vector2D;

/// Game configuration constants
pub mod consts {
    /// Playfield dimensions (logical pixels)
    pub const CANVAS_WIDTH: f32 = 800.0;
    pub const CANVAS_HEIGHT: f32 = 600.0;
    /// Largest frame delta accepted by the simulation (seconds)
    pub const MAX_FRAME_DT: f32 = 0.05;
    /// Delta used by callers that tick at a fixed 60 Hz
    pub const LEGACY_FRAME_DT: f32 = 1.0 / 60.0;

    /// Paddle defaults
    pub const PADDLE_WIDTH: f32 = 100.0;
    pub const PADDLE_HEIGHT: f32 = 15.0;
    /// Horizontal speed in pixels/s
    pub const PADDLE_SPEED: f32 = 480.0;
    /// Distance from the paddle top to the bottom of the canvas
    pub const PADDLE_BOTTOM_OFFSET: f32 = 40.0;
    /// AI assist stops correcting inside this error (pixels)
    pub const AI_DEADBAND: f32 = 2.0;
    pub const AI_DEFAULT_STRENGTH: f32 = 0.8;
    /// Horizontal speed given by a paddle hit at the very edge
    pub const PADDLE_BOUNCE_SPEED: f32 = 300.0;
    /// How long a paddle hit glow lasts (ms)
    pub const PADDLE_GLOW_MS: f64 = 250.0;

    /// Ball defaults
    pub const BALL_RADIUS: f32 = 8.0;
    pub const BALL_BASE_SPEED: f32 = 300.0;
    /// Launch velocity for a fresh ball (pixels/s)
    pub const BALL_LAUNCH_SPEED_X: f32 = 150.0;
    pub const BALL_LAUNCH_SPEED_Y: f32 = -300.0;
    pub const MAX_BALLS: usize = 5;
    pub const MAX_ENERGY: f32 = 2.0;

    /// Ball trail
    pub const MAX_TRAIL_LENGTH: usize = 12;
    pub const TRAIL_INTERVAL_MS: f64 = 30.0;
    pub const TRAIL_FADE_MS: f64 = 300.0;

    /// Brick grid
    pub const BRICK_COLUMNS: usize = 10;
    pub const BRICK_BASE_ROWS: usize = 5;
    pub const BRICK_MAX_ROWS: usize = 8;
    pub const BRICK_WIDTH: f32 = 70.0;
    pub const BRICK_HEIGHT: f32 = 20.0;
    pub const BRICK_PADDING: f32 = 6.0;
    /// Top of the brick field; everything above it is the cavity
    pub const BRICK_OFFSET_TOP: f32 = 80.0;
    pub const BRICK_OFFSET_LEFT: f32 = 23.0;

    /// Scoring
    pub const BRICK_POINTS: u64 = 100;
    pub const COMBO_STEP: u32 = 5;
    pub const MAX_MULTIPLIER: u32 = 5;
    pub const LEVEL_BONUS: u64 = 1000;
    pub const PICKUP_BONUS: u64 = 25;
    pub const INITIAL_LIVES: u32 = 3;

    /// Cavity bonus zone
    pub const CAVITY_BONUS: u64 = 50;
    pub const CAVITY_SPEED_BOOST: f32 = 1.8;
    pub const CAVITY_GRACE_MS: f64 = 5000.0;

    /// Falling power-up pickups
    pub const PICKUP_WIDTH: f32 = 30.0;
    pub const PICKUP_HEIGHT: f32 = 16.0;
    pub const PICKUP_FALL_SPEED: f32 = 120.0;
    pub const PICKUP_DROP_CHANCE: f64 = 0.15;
    pub const MAX_PICKUPS: usize = 3;

    /// Power-up timings (ms) and magnitudes
    pub const FAST_DURATION_MS: f64 = 8000.0;
    pub const SLOW_DURATION_MS: f64 = 8000.0;
    pub const PIERCE_DURATION_MS: f64 = 6000.0;
    pub const WIDE_PADDLE_DURATION_MS: f64 = 10000.0;
    pub const MAGNETIC_DURATION_MS: f64 = 10000.0;
    pub const FAST_FACTOR: f32 = 1.5;
    pub const SLOW_FACTOR: f32 = 0.6;
    pub const WIDE_PADDLE_FACTOR: f32 = 1.5;
    pub const MAGNETIC_RANGE: f32 = 150.0;
    pub const MAGNETIC_STRENGTH: f32 = 12.0;
    /// Bricks a piercing ball destroys in one swing (impacted brick included)
    pub const PIERCE_CHAIN_LENGTH: usize = 3;
    pub const MULTI_BALL_SPREAD: f32 = 0.5;

    /// Particles
    pub const MAX_PARTICLES: usize = 400;
}

/// Score multiplier for a combo count
///
/// Stays at 1 until the combo passes five hits, then steps up every five hits.
#[inline]
pub fn multiplier_for_combo(combo: u32) -> u32 {
    use consts::{COMBO_STEP, MAX_MULTIPLIER};
    if combo > COMBO_STEP {
        (combo / COMBO_STEP + 1).min(MAX_MULTIPLIER)
    } else {
        1
    }
}
