//! Putt Sim - physics and shot-planning core for an obstacle golf game
//!
//! Core modules:
//! - `sim`: Deterministic ball simulation (integration, collisions, substepping, monitoring)
//! - `ai`: Autonomous shot planner built on a headless copy of the same physics
//! - `settings`: Data-driven tuning for physics, planner and monitor
//! - `ring`: Fixed-capacity history buffers

pub mod ai;
pub mod ring;
pub mod settings;
pub mod sim;

pub use settings::{Settings, SettingsError};

use glam::Vec3;

/// Simulation configuration constants
pub mod consts {
    /// Nominal frame time the per-frame damping factors are expressed against
    pub const REFERENCE_DT: f32 = 1.0 / 60.0;
    /// Longest frame slice the scheduler will integrate (larger slices are clamped)
    pub const MAX_FRAME_DT: f32 = 0.1;
    /// Maximum substeps per frame to bound worst-case work
    pub const MAX_SUBSTEPS: u32 = 64;
    /// Largest per-substep displacement as a fraction of the ball radius
    pub const SUBSTEP_FRACTION: f32 = 0.25;

    /// Ball defaults
    pub const BALL_RADIUS: f32 = 0.5;
    /// Hard speed cap, keeps the substep budget sufficient for the invariant
    pub const BALL_MAX_SPEED: f32 = 60.0;
    /// Below this speed (and grounded) the ball counts as at rest
    pub const REST_SPEED: f32 = 0.15;

    /// Shot model: launch speed = power * MAX_PULL_DISTANCE * POWER_SCALE
    pub const MAX_PULL_DISTANCE: f32 = 10.0;
    pub const POWER_SCALE: f32 = 3.0;
    /// Powers below this are degenerate and never launched or simulated
    pub const MIN_SHOT_POWER: f32 = 0.02;

    /// Standard gravity (units/s²)
    pub const GRAVITY: f32 = 20.0;
    /// Downward pull over the hole when the ball is slow enough to drop
    pub const HOLE_PULL: f32 = 60.0;
    /// Fraction of max launch speed under which the hole pull engages
    pub const HOLE_CAPTURE_SPEED_RATIO: f32 = 0.75;
    /// Velocity damping per reference frame while inside the cup
    pub const HOLE_DAMPING: f32 = 0.95;
    /// Depth of the cup floor below ground
    pub const HOLE_CUP_DEPTH: f32 = 1.5;

    /// Friction decay rates (1/s) and the speed band they blend across
    pub const FRICTION_FAST: f32 = 0.35;
    pub const FRICTION_SLOW: f32 = 1.6;
    pub const FRICTION_HIGH_SPEED: f32 = 10.0;
    pub const FRICTION_LOW_SPEED: f32 = 3.0;
    /// Horizontal speed under which the ball is stopped outright
    pub const MIN_ROLL_SPEED: f32 = 0.1;
    /// Height above terrain treated as resting contact
    pub const GROUND_TOLERANCE: f32 = 0.01;

    /// Restitution for walls, perimeter and hazard barriers
    pub const BOUNCE_DAMPING: f32 = 0.7;
    /// Bumpers inject energy rather than absorb it
    pub const BUMPER_GAIN: f32 = 2.0;
    /// Restitution for rotating fan blades
    pub const BLADE_DAMPING: f32 = 0.6;
    /// Separation applied after a swept wall hit
    pub const SWEEP_EPSILON: f32 = 0.01;

    /// Hazard depths below ground at which the barrier sets engage
    pub const HAZARD_EDGE_DEPTH: f32 = 0.3;
    pub const HAZARD_CONTAIN_DEPTH: f32 = 1.5;
    /// Inset of the shallow edge barriers from the hazard footprint
    pub const HAZARD_EDGE_INSET: f32 = 0.05;

    /// Out-of-bounds envelope
    pub const BOUNDS_MARGIN: f32 = 2.0;
    pub const BOUNDS_GRACE: f32 = 0.5;
    /// Falling this far below ground is an immediate bounds violation
    pub const KILL_DEPTH: f32 = 10.0;
    pub const PENALTY_STROKES: u32 = 1;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Drop the vertical component
#[inline]
pub fn horizontal(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Distance between two points measured in the ground plane
#[inline]
pub fn horizontal_distance(a: Vec3, b: Vec3) -> f32 {
    horizontal(a - b).length()
}

/// Unit vector in the ground plane for a bearing (radians, 0 = +x, counter-clockwise toward +z)
#[inline]
pub fn bearing_to_direction(bearing: f32) -> Vec3 {
    Vec3::new(bearing.cos(), 0.0, bearing.sin())
}

/// Bearing of a ground-plane vector
#[inline]
pub fn direction_to_bearing(dir: Vec3) -> f32 {
    dir.z.atan2(dir.x)
}

/// Maximum launch speed of a full-power shot
#[inline]
pub fn max_launch_speed() -> f32 {
    consts::MAX_PULL_DISTANCE * consts::POWER_SCALE
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_normalize_angle_wraps() {
        assert!((normalize_angle(3.0 * PI) - (-PI)).abs() < 1e-5);
        assert!((normalize_angle(-PI / 2.0) + PI / 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_bearing_round_trip() {
        let dir = bearing_to_direction(0.7);
        assert!((direction_to_bearing(dir) - 0.7).abs() < 1e-5);
        assert!(dir.y.abs() < f32::EPSILON);
    }

    #[test]
    fn test_horizontal_distance_ignores_height() {
        let a = Vec3::new(0.0, 5.0, 0.0);
        let b = Vec3::new(3.0, -2.0, 4.0);
        assert!((horizontal_distance(a, b) - 5.0).abs() < 1e-5);
    }
}
