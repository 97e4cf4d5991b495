//! Cavity bonus zone
//!
//! The cavity is the strip between the ceiling and the top row of bricks.
//! Each ball carries its own state machine:
//!
//! ```text
//! Normal --rise above brick field--> InCavity --drop below--> Grace --timer--> Normal
//!                                        ^                      |
//!                                        +------rise again------+
//! ```
//!
//! Velocity is always derived from the base velocity recorded on entry, so
//! re-firing a transition can never compound the boost.

use serde::{Deserialize, Serialize};

use crate::consts::{CAVITY_GRACE_MS, CAVITY_SPEED_BOOST};
use crate::vector::Vector2D;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum CavityState {
    #[default]
    Normal,
    /// Above the brick field: boosted speed, double score
    InCavity { base_velocity: Vector2D },
    /// Just left the cavity: still boosted and golden until `expires_at` (ms)
    Grace {
        base_velocity: Vector2D,
        expires_at: f64,
    },
}

/// A state change reported to the simulation core
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CavityTransition {
    /// Normal -> InCavity (bonus awarded, speed boosted)
    Entered,
    /// Grace -> InCavity (no extra bonus, boost already applied)
    Reentered,
    /// InCavity -> Grace
    Left,
    /// Grace -> Normal (base velocity restored)
    Restored,
}

impl CavityState {
    /// Bricks hit in this state score double
    pub fn is_bonus(&self) -> bool {
        !matches!(self, CavityState::Normal)
    }

    pub fn in_cavity(&self) -> bool {
        matches!(self, CavityState::InCavity { .. })
    }

    pub fn in_grace(&self) -> bool {
        matches!(self, CavityState::Grace { .. })
    }

    /// Rescale the recorded base velocity, so a speed effect that starts or
    /// ends while boosted is still in force after the restore
    pub fn scale_base(&mut self, factor: f32) {
        match self {
            CavityState::InCavity { base_velocity } | CavityState::Grace { base_velocity, .. } => {
                base_velocity.multiply(factor);
            }
            CavityState::Normal => {}
        }
    }

    /// Advance the state machine for one ball
    ///
    /// `cavity_floor` is the y coordinate of the top of the brick field; the
    /// ball counts as inside while its center is above it.
    pub fn update(
        &mut self,
        vel: &mut Vector2D,
        ball_y: f32,
        cavity_floor: f32,
        now: f64,
    ) -> Option<CavityTransition> {
        let above = ball_y < cavity_floor;

        match *self {
            CavityState::Normal if above => {
                let base_velocity = *vel;
                *vel = base_velocity * CAVITY_SPEED_BOOST;
                *self = CavityState::InCavity { base_velocity };
                Some(CavityTransition::Entered)
            }
            CavityState::InCavity { base_velocity } if !above => {
                *self = CavityState::Grace {
                    base_velocity,
                    expires_at: now + CAVITY_GRACE_MS,
                };
                Some(CavityTransition::Left)
            }
            CavityState::Grace { base_velocity, .. } if above => {
                *self = CavityState::InCavity { base_velocity };
                Some(CavityTransition::Reentered)
            }
            CavityState::Grace {
                base_velocity,
                expires_at,
            } if now >= expires_at => {
                *vel = base_velocity;
                *self = CavityState::Normal;
                Some(CavityTransition::Restored)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLOOR: f32 = 80.0;

    #[test]
    fn test_full_cycle() {
        let mut state = CavityState::Normal;
        let mut vel = Vector2D::new(100.0, -200.0);

        assert_eq!(state.update(&mut vel, 120.0, FLOOR, 0.0), None);

        assert_eq!(
            state.update(&mut vel, 70.0, FLOOR, 10.0),
            Some(CavityTransition::Entered)
        );
        assert!(vel.equals(Vector2D::new(180.0, -360.0)));
        assert!(state.in_cavity() && state.is_bonus());

        // Bounces off the ceiling, then drops back out
        vel.y = -vel.y;
        assert_eq!(
            state.update(&mut vel, 90.0, FLOOR, 1000.0),
            Some(CavityTransition::Left)
        );
        assert!(state.in_grace() && state.is_bonus());
        assert!(vel.equals(Vector2D::new(180.0, 360.0)));

        assert_eq!(state.update(&mut vel, 200.0, FLOOR, 5999.0), None);
        assert_eq!(
            state.update(&mut vel, 300.0, FLOOR, 6000.0),
            Some(CavityTransition::Restored)
        );
        assert_eq!(state, CavityState::Normal);
        assert_eq!(vel, Vector2D::new(100.0, -200.0));
    }

    #[test]
    fn test_reentry_does_not_compound_boost() {
        let mut state = CavityState::Normal;
        let mut vel = Vector2D::new(0.0, -100.0);

        state.update(&mut vel, 50.0, FLOOR, 0.0);
        state.update(&mut vel, 100.0, FLOOR, 100.0);
        assert_eq!(
            state.update(&mut vel, 50.0, FLOOR, 200.0),
            Some(CavityTransition::Reentered)
        );
        assert!(vel.equals(Vector2D::new(0.0, -180.0)));
        assert_eq!(
            state,
            CavityState::InCavity {
                base_velocity: Vector2D::new(0.0, -100.0)
            }
        );
    }

    #[test]
    fn test_scaled_base_is_restored() {
        let mut state = CavityState::Normal;
        let mut vel = Vector2D::new(0.0, -100.0);
        state.update(&mut vel, 50.0, FLOOR, 0.0);
        state.update(&mut vel, 100.0, FLOOR, 100.0);

        state.scale_base(2.0);
        state.update(&mut vel, 200.0, FLOOR, 100.0 + CAVITY_GRACE_MS);
        assert!(vel.equals(Vector2D::new(0.0, -200.0)));

        // Nothing recorded outside the cavity
        let mut normal = CavityState::Normal;
        normal.scale_base(2.0);
        assert_eq!(normal, CavityState::Normal);
    }
}
