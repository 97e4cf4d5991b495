//! 2D vector primitive
//!
//! `Vector2D` is a plain `Copy` value. The in-place operations return
//! `&mut Self` so they chain; the arithmetic itself is done by `glam`.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Default tolerance for [`Vector2D::equals`]
pub const DEFAULT_EPSILON: f32 = 1e-4;

/// A 2D vector with chainable in-place operations
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector2D {
    pub x: f32,
    pub y: f32,
}

impl Vector2D {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    /// Vector pointing at `angle` (radians) with the given length
    pub fn from_angle(angle: f32, magnitude: f32) -> Self {
        (Vec2::from_angle(angle) * magnitude).into()
    }

    /// Unit vector with a uniformly random direction
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::from_angle(rng.random_range(0.0..TAU), 1.0)
    }

    #[inline]
    pub fn as_vec2(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    fn assign(&mut self, v: Vec2) -> &mut Self {
        self.x = v.x;
        self.y = v.y;
        self
    }

    pub fn set(&mut self, x: f32, y: f32) -> &mut Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn add(&mut self, other: Vector2D) -> &mut Self {
        self.assign(self.as_vec2() + other.as_vec2())
    }

    pub fn subtract(&mut self, other: Vector2D) -> &mut Self {
        self.assign(self.as_vec2() - other.as_vec2())
    }

    pub fn multiply(&mut self, scalar: f32) -> &mut Self {
        self.assign(self.as_vec2() * scalar)
    }

    /// Divide both components; dividing by zero leaves the vector untouched
    pub fn divide(&mut self, scalar: f32) -> &mut Self {
        if scalar != 0.0 {
            self.assign(self.as_vec2() / scalar);
        }
        self
    }

    pub fn magnitude(&self) -> f32 {
        self.as_vec2().length()
    }

    pub fn magnitude_squared(&self) -> f32 {
        self.as_vec2().length_squared()
    }

    /// Scale to unit length (no-op on the zero vector)
    pub fn normalize(&mut self) -> &mut Self {
        let magnitude = self.magnitude();
        if magnitude > 0.0 {
            self.divide(magnitude);
        }
        self
    }

    /// Unit-length copy (zero stays zero)
    pub fn normalized(self) -> Self {
        let mut v = self;
        v.normalize();
        v
    }

    pub fn dot(&self, other: Vector2D) -> f32 {
        self.as_vec2().dot(other.as_vec2())
    }

    pub fn distance(&self, other: Vector2D) -> f32 {
        self.as_vec2().distance(other.as_vec2())
    }

    /// Direction in radians, measured from +x
    pub fn angle(&self) -> f32 {
        self.y.atan2(self.x)
    }

    /// Mirror off a surface with unit normal `normal`: v - 2(v·n)n
    pub fn reflect(&mut self, normal: Vector2D) -> &mut Self {
        let n = normal.as_vec2();
        let v = self.as_vec2();
        self.assign(v - 2.0 * v.dot(n) * n)
    }

    pub fn rotate(&mut self, angle: f32) -> &mut Self {
        let (sin, cos) = angle.sin_cos();
        let (x, y) = (self.x, self.y);
        self.set(x * cos - y * sin, x * sin + y * cos)
    }

    /// Clamp each component to `[min, max]`
    pub fn clamp(&mut self, min: f32, max: f32) -> &mut Self {
        self.set(self.x.clamp(min, max), self.y.clamp(min, max))
    }

    /// Rescale down to `max` length if longer
    pub fn limit(&mut self, max: f32) -> &mut Self {
        if self.magnitude() > max {
            self.normalize().multiply(max);
        }
        self
    }

    /// Move `t` of the way toward `target`
    pub fn lerp(&mut self, target: Vector2D, t: f32) -> &mut Self {
        self.assign(self.as_vec2().lerp(target.as_vec2(), t))
    }

    pub fn equals(&self, other: Vector2D) -> bool {
        self.equals_within(other, DEFAULT_EPSILON)
    }

    pub fn equals_within(&self, other: Vector2D, epsilon: f32) -> bool {
        self.as_vec2().abs_diff_eq(other.as_vec2(), epsilon)
    }
}

impl From<Vec2> for Vector2D {
    fn from(v: Vec2) -> Self {
        Self::new(v.x, v.y)
    }
}

impl From<Vector2D> for Vec2 {
    fn from(v: Vector2D) -> Self {
        v.as_vec2()
    }
}

impl std::ops::Add for Vector2D {
    type Output = Vector2D;

    fn add(self, rhs: Vector2D) -> Vector2D {
        (self.as_vec2() + rhs.as_vec2()).into()
    }
}

impl std::ops::Sub for Vector2D {
    type Output = Vector2D;

    fn sub(self, rhs: Vector2D) -> Vector2D {
        (self.as_vec2() - rhs.as_vec2()).into()
    }
}

impl std::ops::Mul<f32> for Vector2D {
    type Output = Vector2D;

    fn mul(self, rhs: f32) -> Vector2D {
        (self.as_vec2() * rhs).into()
    }
}

impl std::ops::Neg for Vector2D {
    type Output = Vector2D;

    fn neg(self) -> Vector2D {
        Vector2D::new(-self.x, -self.y)
    }
}
