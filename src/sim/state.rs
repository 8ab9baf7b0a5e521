//! Ball and hole state
//!
//! Everything the live simulation mutates lives here. Course geometry is
//! kept separately and only ever borrowed.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::collision::ColliderKind;
use super::course::CourseGeometry;
use super::monitor::BoundsMonitor;
use crate::consts::*;
use crate::{direction_to_bearing, horizontal};

/// The simulated ball
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallState {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Position at the start of the last integration step (for swept tests)
    pub prev_position: Vec3,
    pub radius: f32,
    /// Resting on terrain after the last step
    pub grounded: bool,
    /// Set on launch, cleared when the rest event fires
    pub moving: bool,
}

impl BallState {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            prev_position: position,
            radius: BALL_RADIUS,
            grounded: true,
            moving: false,
        }
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    #[inline]
    pub fn horizontal_speed(&self) -> f32 {
        horizontal(self.velocity).length()
    }

    /// Grounded and slower than `rest_speed`
    pub fn at_rest(&self, rest_speed: f32) -> bool {
        self.grounded && self.velocity.length_squared() < rest_speed * rest_speed
    }

    /// Teleport and stop (hole start, penalties)
    pub fn reset_to(&mut self, position: Vec3) {
        self.position = position;
        self.prev_position = position;
        self.velocity = Vec3::ZERO;
        self.grounded = true;
        self.moving = false;
    }

    /// Launch along a shot. `launch_speed` is the full-power speed.
    pub fn apply_shot(&mut self, shot: &ShotCandidate, launch_speed: f32) {
        self.velocity = shot.direction * shot.power * launch_speed;
        self.moving = true;
    }
}

/// A shot request: horizontal unit direction and normalized power
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShotCandidate {
    pub direction: Vec3,
    pub power: f32,
}

impl ShotCandidate {
    /// Build a shot, rejecting degenerate direction or power
    pub fn new(direction: Vec3, power: f32) -> Option<Self> {
        let flat = horizontal(direction);
        if !power.is_finite() || power < MIN_SHOT_POWER || flat.length_squared() < 1e-8 {
            return None;
        }
        Some(Self {
            direction: flat.normalize(),
            power: power.min(1.0),
        })
    }

    pub fn bearing(&self) -> f32 {
        direction_to_bearing(self.direction)
    }

    /// Same shot within a direction cosine and power tolerance
    pub fn similar_to(&self, other: &ShotCandidate, min_cos: f32, power_tolerance: f32) -> bool {
        self.direction.dot(other.direction) > min_cos
            && (self.power - other.power).abs() < power_tolerance
    }
}

/// Collision report for presentation layers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Impact {
    pub position: Vec3,
    pub normal: Vec3,
    /// Proportional to pre-collision speed, never fed back into physics
    pub intensity: f32,
    pub kind: ColliderKind,
}

/// Receiver for impact descriptors
pub trait ImpactSink {
    fn impact(&mut self, impact: Impact);
}

impl ImpactSink for Vec<Impact> {
    fn impact(&mut self, impact: Impact) {
        self.push(impact);
    }
}

/// Discards impacts
impl ImpactSink for () {
    fn impact(&mut self, _impact: Impact) {}
}

/// Terminal events for the external stroke ledger
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    /// Ball stopped moving on solid ground
    Rested { position: Vec3 },
    /// Ball dropped into the cup
    Sank { position: Vec3 },
    /// Ball left the playable envelope and was reset
    LeftBounds { penalty_strokes: u32, reset_to: Vec3 },
    /// Ball fell into a hazard and was reset
    EnteredHazard { penalty_strokes: u32, reset_to: Vec3 },
}

/// Continuous power-up effects
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActiveEffects {
    /// Multiplies launch speed
    pub speed_multiplier: f32,
    /// Pull toward the hole while active
    pub magnet: Option<MagnetPull>,
}

impl Default for ActiveEffects {
    fn default() -> Self {
        Self {
            speed_multiplier: 1.0,
            magnet: None,
        }
    }
}

/// Power-up that drags the ball toward the hole
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MagnetPull {
    pub target: Vec3,
    pub range: f32,
    pub strength: f32,
}

/// Where the hole currently is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HolePhase {
    /// Ball at rest, waiting for a shot
    Aiming,
    /// Ball in motion
    Rolling,
    /// Ball in the cup
    Sunk,
}

/// Complete mutable state of one hole in play
#[derive(Debug, Clone)]
pub struct HoleState {
    pub ball: BallState,
    pub effects: ActiveEffects,
    pub monitor: BoundsMonitor,
    pub phase: HolePhase,
    /// Simulated seconds since the hole started
    pub time: f32,
}

impl HoleState {
    /// Start a hole with the ball on the tee
    pub fn new(course: &CourseGeometry) -> Self {
        let ball = BallState::new(course.tee);
        log::info!(
            "Hole start: tee {:?}, hole {:?}",
            course.tee,
            course.hole.position
        );
        Self {
            ball,
            effects: ActiveEffects::default(),
            monitor: BoundsMonitor::new(course.tee),
            phase: HolePhase::Aiming,
            time: 0.0,
        }
    }

    /// Put the ball back on the tee and forget all transient state
    pub fn restart(&mut self, course: &CourseGeometry) {
        *self = Self::new(course);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_shots_rejected() {
        assert!(ShotCandidate::new(Vec3::ZERO, 0.5).is_none());
        assert!(ShotCandidate::new(Vec3::Y, 0.5).is_none());
        assert!(ShotCandidate::new(Vec3::X, 0.0).is_none());
        assert!(ShotCandidate::new(Vec3::X, f32::NAN).is_none());
    }

    #[test]
    fn test_shot_is_flattened_and_clamped() {
        let shot = ShotCandidate::new(Vec3::new(3.0, 2.0, 4.0), 1.5).unwrap();
        assert!((shot.direction.length() - 1.0).abs() < 1e-6);
        assert_eq!(shot.direction.y, 0.0);
        assert_eq!(shot.power, 1.0);
    }

    #[test]
    fn test_apply_shot_sets_velocity() {
        let mut ball = BallState::new(Vec3::new(0.0, BALL_RADIUS, 0.0));
        let shot = ShotCandidate::new(Vec3::X, 0.5).unwrap();
        ball.apply_shot(&shot, 30.0);
        assert!((ball.velocity - Vec3::new(15.0, 0.0, 0.0)).length() < 1e-5);
        assert!(ball.moving);
        assert!(!ball.at_rest(REST_SPEED));
    }

    #[test]
    fn test_similar_shots() {
        let a = ShotCandidate::new(Vec3::X, 0.5).unwrap();
        let b = ShotCandidate::new(Vec3::new(1.0, 0.0, 0.05), 0.55).unwrap();
        let c = ShotCandidate::new(Vec3::Z, 0.5).unwrap();
        assert!(a.similar_to(&b, 0.95, 0.1));
        assert!(!a.similar_to(&c, 0.95, 0.1));
    }

    #[test]
    fn test_restart_discards_hole_state() {
        use crate::sim::course::{HoleTarget, PlayBounds};

        let course = CourseGeometry::open(
            PlayBounds::new(-5.0, 5.0, -5.0, 5.0),
            Vec3::new(0.0, BALL_RADIUS, 4.0),
            HoleTarget {
                position: Vec3::new(0.0, 0.0, -4.0),
                capture_radius: 1.0,
            },
        );
        let mut hole = HoleState::new(&course);
        hole.ball.apply_shot(&ShotCandidate::new(Vec3::Z, 0.4).unwrap(), 30.0);
        hole.phase = HolePhase::Rolling;
        hole.time = 3.0;

        hole.restart(&course);
        assert_eq!(hole.phase, HolePhase::Aiming);
        assert_eq!(hole.ball.position, course.tee);
        assert_eq!(hole.ball.velocity, Vec3::ZERO);
        assert_eq!(hole.time, 0.0);
    }
}
