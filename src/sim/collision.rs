//! Collision geometry for the rectangular playfield
//!
//! Balls are circles, everything else (paddle, bricks, pickups) is an
//! axis-aligned box.

use serde::{Deserialize, Serialize};

use crate::vector::Vector2D;

/// Playfield extent; the origin is the top-left corner, y grows downward
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl Default for Bounds {
    fn default() -> Self {
        use crate::consts::{CANVAS_HEIGHT, CANVAS_WIDTH};
        Self::new(CANVAS_WIDTH, CANVAS_HEIGHT)
    }
}

/// Axis-aligned box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Aabb {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn left(&self) -> f32 {
        self.x
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.y
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Vector2D {
        Vector2D::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Strict overlap (touching edges do not count)
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.left() < other.right()
            && self.right() > other.left()
            && self.top() < other.bottom()
            && self.bottom() > other.top()
    }
}

/// Ball bounds: the enclosing box plus the exact circle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleBounds {
    pub aabb: Aabb,
    pub center: Vector2D,
    pub radius: f32,
}

impl CircleBounds {
    pub fn new(center: Vector2D, radius: f32) -> Self {
        Self {
            aabb: Aabb::new(
                center.x - radius,
                center.y - radius,
                radius * 2.0,
                radius * 2.0,
            ),
            center,
            radius,
        }
    }
}

/// Which walls a ball bounced off during one update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WallHits {
    pub left: bool,
    pub right: bool,
    pub top: bool,
}

impl WallHits {
    pub fn any(&self) -> bool {
        self.left || self.right || self.top
    }
}

/// Resolve left/right/top wall contact in place
///
/// Mirrors the matching velocity component (forcing it away from the wall)
/// and clamps the position so the circle stays inside. The bottom edge is
/// left alone; falling out is ball loss, not a bounce.
pub fn resolve_walls(
    pos: &mut Vector2D,
    vel: &mut Vector2D,
    radius: f32,
    bounds: &Bounds,
) -> WallHits {
    let mut hits = WallHits::default();

    if pos.x - radius < 0.0 {
        pos.x = radius;
        vel.x = vel.x.abs();
        hits.left = true;
    } else if pos.x + radius > bounds.width {
        pos.x = bounds.width - radius;
        vel.x = -vel.x.abs();
        hits.right = true;
    }

    if pos.y - radius < 0.0 {
        pos.y = radius;
        vel.y = vel.y.abs();
        hits.top = true;
    }

    hits
}

/// True once the whole ball has left through the bottom edge
pub fn ball_below_bottom(pos: Vector2D, radius: f32, bounds: &Bounds) -> bool {
    pos.y - radius > bounds.height
}

/// Paddle bounce trigger
///
/// Fires only while the ball moves downward, its bottom edge has reached the
/// paddle top without passing the paddle bottom, and its center lies within
/// the paddle's horizontal extent.
pub fn ball_hits_paddle(pos: Vector2D, vel: Vector2D, radius: f32, paddle: &Aabb) -> bool {
    vel.y > 0.0
        && pos.y + radius >= paddle.top()
        && pos.y - radius <= paddle.bottom()
        && pos.x >= paddle.left()
        && pos.x <= paddle.right()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_left_wall_reflection() {
        let bounds = Bounds::new(800.0, 600.0);
        let mut pos = Vector2D::new(-5.0, 300.0);
        let mut vel = Vector2D::new(-2.0, 1.0);

        let hits = resolve_walls(&mut pos, &mut vel, 8.0, &bounds);
        assert!(hits.left);
        assert_eq!(pos.x, 8.0);
        assert!(vel.x > 0.0);
    }

    #[test]
    fn test_right_and_top_wall_reflection() {
        let bounds = Bounds::new(800.0, 600.0);
        let mut pos = Vector2D::new(799.0, 2.0);
        let mut vel = Vector2D::new(3.0, -3.0);

        let hits = resolve_walls(&mut pos, &mut vel, 8.0, &bounds);
        assert!(hits.right && hits.top);
        assert_eq!(pos, Vector2D::new(792.0, 8.0));
        assert!(vel.x < 0.0 && vel.y > 0.0);
    }

    #[test]
    fn test_bottom_is_not_a_wall() {
        let bounds = Bounds::new(800.0, 600.0);
        let mut pos = Vector2D::new(400.0, 650.0);
        let mut vel = Vector2D::new(0.0, 5.0);

        let hits = resolve_walls(&mut pos, &mut vel, 8.0, &bounds);
        assert!(!hits.any());
        assert_eq!(vel.y, 5.0);
        assert!(ball_below_bottom(pos, 8.0, &bounds));
    }

    #[test]
    fn test_ball_box_encloses_circle() {
        let ball = CircleBounds::new(Vector2D::new(135.0, 95.0), 8.0);
        let brick = Aabb::new(100.0, 100.0, 70.0, 20.0);
        assert!(ball.aabb.overlaps(&brick));
        assert_eq!(ball.aabb.width, 16.0);
        let above = CircleBounds::new(Vector2D::new(135.0, 80.0), 8.0);
        assert!(!above.aabb.overlaps(&brick));
    }

    #[test]
    fn test_paddle_trigger_requires_downward_motion() {
        let paddle = Aabb::new(350.0, 545.0, 100.0, 15.0);
        let pos = Vector2D::new(400.0, 540.0);
        assert!(ball_hits_paddle(pos, Vector2D::new(0.0, 200.0), 8.0, &paddle));
        assert!(!ball_hits_paddle(pos, Vector2D::new(0.0, -200.0), 8.0, &paddle));
        assert!(!ball_hits_paddle(
            Vector2D::new(200.0, 540.0),
            Vector2D::new(0.0, 200.0),
            8.0,
            &paddle
        ));
    }
}
