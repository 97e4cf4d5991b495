//! Simulation module
//!
//! All gameplay logic lives here. Nothing in this module renders, plays
//! sound, or touches the platform:
//! - Time comes in from the caller (`dt` seconds, `now` milliseconds)
//! - Seeded RNG only
//! - Stable iteration order (spawn order)
//! - Side effects surface as `GameEvent`s

pub mod ball;
pub mod bricks;
pub mod cavity;
pub mod collision;
pub mod paddle;
pub mod particles;
pub mod powerup;
pub mod state;
pub mod tick;

pub use ball::{Axis, Ball, TrailPoint};
pub use bricks::{Brick, BrickGrid};
pub use cavity::{CavityState, CavityTransition};
pub use collision::{Aabb, Bounds, CircleBounds, WallHits};
pub use paddle::Paddle;
pub use particles::{Burst, Particle};
pub use powerup::{Pickup, PowerUpTarget, PowerUpType, TimedEffects};
pub use state::{GameEvent, GamePhase, GameState, Snapshot};
pub use tick::{TickInput, apply_power_up, brick_points, tick};
