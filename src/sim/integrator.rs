//! Motion integrator
//!
//! Advances one ball by one time slice: hole pull or gravity, rolling
//! friction, cup behaviour and terrain contact. The same function drives
//! the live simulation and the planner's predictive one; the differences
//! between the two live entirely in `MotionProfile`.

use glam::Vec3;

use super::course::CourseGeometry;
use super::state::BallState;
use crate::consts::{GROUND_TOLERANCE, HAZARD_EDGE_DEPTH, REFERENCE_DT};
use crate::horizontal;
use crate::settings::{PhysicsTuning, PlannerTuning};

/// How horizontal speed decays while rolling
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Friction {
    /// Decay rate blends from `slow` (below `low_speed`) to `fast` (above `high_speed`)
    SpeedDependent {
        fast: f32,
        slow: f32,
        high_speed: f32,
        low_speed: f32,
    },
    /// Fraction of horizontal velocity kept per step, independent of speed
    FixedRatio(f32),
}

/// Physical parameters for one flavour of the simulation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionProfile {
    pub gravity: f32,
    pub hole_pull: f32,
    /// Horizontal speed under which the hole pull replaces gravity
    pub hole_capture_speed: f32,
    /// Velocity damping per reference frame inside the cup
    pub hole_damping: f32,
    pub friction: Friction,
    pub min_roll_speed: f32,
    pub wall_bounce: f32,
    pub bumper_gain: f32,
    pub blade_damping: f32,
    pub max_speed: f32,
}

impl MotionProfile {
    /// Full-fidelity physics for the live ball
    pub fn live(t: &PhysicsTuning) -> Self {
        Self {
            gravity: t.gravity,
            hole_pull: t.hole_pull,
            hole_capture_speed: t.hole_capture_speed_ratio * t.max_launch_speed,
            hole_damping: t.hole_damping,
            friction: Friction::SpeedDependent {
                fast: t.friction_fast,
                slow: t.friction_slow,
                high_speed: t.friction_high_speed,
                low_speed: t.friction_low_speed,
            },
            min_roll_speed: t.min_roll_speed,
            wall_bounce: t.bounce_damping,
            bumper_gain: t.bumper_gain,
            blade_damping: t.blade_damping,
            max_speed: t.max_speed,
        }
    }

    /// Coarse physics for forward simulation: fixed-ratio friction,
    /// softer wall bounces, no substepping
    pub fn predictive(t: &PhysicsTuning, p: &PlannerTuning) -> Self {
        Self {
            friction: Friction::FixedRatio(p.predictive_friction),
            wall_bounce: p.predictive_bounce,
            ..Self::live(t)
        }
    }
}

/// Friction decay rate for a horizontal speed
pub fn friction_coefficient(
    speed: f32,
    fast: f32,
    slow: f32,
    high_speed: f32,
    low_speed: f32,
) -> f32 {
    if speed >= high_speed {
        fast
    } else if speed <= low_speed {
        slow
    } else {
        let t = (speed - low_speed) / (high_speed - low_speed);
        slow + (fast - slow) * t
    }
}

fn apply_friction(velocity: &mut Vec3, dt: f32, profile: &MotionProfile) {
    let speed = horizontal(*velocity).length();
    if speed < profile.min_roll_speed {
        // Stop outright rather than creep asymptotically
        velocity.x = 0.0;
        velocity.z = 0.0;
        return;
    }
    let retained = match profile.friction {
        Friction::SpeedDependent {
            fast,
            slow,
            high_speed,
            low_speed,
        } => {
            let k = friction_coefficient(speed, fast, slow, high_speed, low_speed);
            (1.0 - k * dt).max(0.0)
        }
        Friction::FixedRatio(ratio) => ratio,
    };
    velocity.x *= retained;
    velocity.z *= retained;
}

/// What a single integration step did
#[derive(Debug, Clone, Copy)]
pub struct IntegrationResult {
    pub displacement: Vec3,
}

/// Advance `ball` by `dt` seconds
pub fn step(
    ball: &mut BallState,
    dt: f32,
    course: &CourseGeometry,
    profile: &MotionProfile,
) -> IntegrationResult {
    ball.prev_position = ball.position;
    let ground = course.ground_y;
    let over_hole = course.over_hole(ball.position);
    let in_cup = over_hole && ball.position.y < ground;

    // --- Vertical acceleration ---
    let capture = over_hole && ball.horizontal_speed() < profile.hole_capture_speed;
    let down = if capture {
        profile.hole_pull
    } else {
        profile.gravity
    };
    ball.velocity.y -= down * dt;

    if ball.grounded {
        apply_friction(&mut ball.velocity, dt, profile);
    }

    if in_cup {
        ball.velocity *= profile.hole_damping.powf(dt / REFERENCE_DT);
    }

    ball.velocity = ball.velocity.clamp_length_max(profile.max_speed);

    // --- Move ---
    ball.position += ball.velocity * dt;

    // --- Cup wall: once below ground over the hole, stay inside it ---
    if in_cup {
        let hole = course.hole.position;
        let limit = (course.hole.capture_radius - ball.radius).max(0.0);
        let offset = horizontal(ball.position - hole);
        let dist = offset.length();
        if dist > limit && dist > 1e-6 {
            let outward = offset / dist;
            ball.position.x = hole.x + outward.x * limit;
            ball.position.z = hole.z + outward.z * limit;
            let v_out = horizontal(ball.velocity).dot(outward);
            if v_out > 0.0 {
                ball.velocity -= outward * v_out;
            }
        }
    }

    // --- Terrain contact ---
    // A ball already deep in a pit is held by the pit walls, not lifted by the lip
    ball.grounded = match course.terrain_height(ball.position) {
        Some(h)
            if ball.position.y - ball.radius <= h + GROUND_TOLERANCE
                && ball.position.y > h - HAZARD_EDGE_DEPTH =>
        {
            ball.position.y = h + ball.radius;
            if ball.velocity.y < 0.0 {
                ball.velocity.y = 0.0;
            }
            true
        }
        _ => false,
    };

    IntegrationResult {
        displacement: ball.position - ball.prev_position,
    }
}
