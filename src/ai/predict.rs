//! Predictive simulator
//!
//! Forward-simulates a candidate shot with the coarse `MotionProfile`
//! (fixed-ratio friction, soft wall bounces, one step per tick) until the
//! ball stops, reaches a terminal classification or the horizon runs out.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::consts::HAZARD_EDGE_DEPTH;
use crate::horizontal_distance;
use crate::settings::Settings;
use crate::sim::collision::ColliderKind;
use crate::sim::course::CourseGeometry;
use crate::sim::integrator::MotionProfile;
use crate::sim::state::{ActiveEffects, BallState, ShotCandidate};
use crate::sim::tick::physics_step;

// Scoring weights
const SINK_BONUS: f32 = 1000.0;
/// Score of a shot that draws a penalty or hits a wall straight away
pub const FAILURE_PENALTY: f32 = -500.0;
const PROGRESS_WEIGHT: f32 = 10.0;
const PROXIMITY_BONUS: f32 = 50.0;
const WALL_HIT_PENALTY: f32 = 5.0;
const BUMPER_HIT_PENALTY: f32 = 10.0;
const DISPLACEMENT_BONUS: f32 = 0.5;
const TRUNCATED_PENALTY: f32 = 25.0;

/// How a predicted shot ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Terminal {
    Sank,
    OutOfBounds,
    InHazard,
    /// Came to rest, or the horizon ran out
    None,
}

/// Outcome of one forward simulation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub final_position: Vec3,
    pub terminal: Terminal,
    pub wall_hits: u32,
    pub bumper_hits: u32,
    /// Closest approach to the target
    pub min_distance: f32,
    pub path_length: f32,
    pub elapsed: f32,
    /// Horizon reached before the ball stopped
    pub truncated: bool,
    pub first_wall_hit: Option<f32>,
}

impl SimulationResult {
    pub fn bumper_hit(&self) -> bool {
        self.bumper_hits > 0
    }

    /// Hit a wall before the shot got going
    pub fn immediate_wall_hit(&self, within: f32) -> bool {
        self.first_wall_hit.is_some_and(|t| t <= within)
    }
}

/// Simulate `shot` from `start`, launched at simulation time `start_time`,
/// and classify the outcome relative to `target`
pub fn simulate_shot(
    start: Vec3,
    start_time: f32,
    shot: &ShotCandidate,
    target: Vec3,
    course: &CourseGeometry,
    effects: &ActiveEffects,
    settings: &Settings,
) -> SimulationResult {
    let planner = &settings.planner;
    let profile = MotionProfile::predictive(&settings.physics, planner);
    let dt = planner.tick_dt.max(1e-3);
    let max_ticks = (planner.horizon / dt).ceil() as u32;

    let mut ball = BallState::new(start);
    ball.apply_shot(shot, settings.physics.max_launch_speed * effects.speed_multiplier);

    let mut result = SimulationResult {
        final_position: start,
        terminal: Terminal::None,
        wall_hits: 0,
        bumper_hits: 0,
        min_distance: horizontal_distance(start, target),
        path_length: 0.0,
        elapsed: 0.0,
        truncated: true,
        first_wall_hit: None,
    };

    for _ in 0..max_ticks {
        let now = start_time + result.elapsed;
        let step = physics_step(&mut ball, course, effects, &profile, now, dt, &mut ());
        result.elapsed += dt;
        result.path_length += step.displacement.length();

        for kind in [step.blade.kind, step.collision.kind].into_iter().flatten() {
            if kind == ColliderKind::Annulus {
                result.bumper_hits += 1;
            } else {
                result.wall_hits += 1;
                result.first_wall_hit.get_or_insert(result.elapsed);
            }
        }

        let p = ball.position;
        result.min_distance = result.min_distance.min(horizontal_distance(p, target));
        if let Some(terminal) = classify(&ball, course, settings) {
            result.terminal = terminal;
            result.truncated = false;
            break;
        }
        if ball.at_rest(settings.physics.rest_speed) {
            result.truncated = false;
            break;
        }
    }

    result.final_position = ball.position;
    result
}

/// Terminal conditions, checked without the live monitor's grace period
fn classify(ball: &BallState, course: &CourseGeometry, settings: &Settings) -> Option<Terminal> {
    let p = ball.position;
    let ground = course.ground_y;
    if course.over_hole(p) && p.y < ground - ball.radius {
        Some(Terminal::Sank)
    } else if p.y < ground - HAZARD_EDGE_DEPTH && course.hazard_at(p, 0.0).is_some() {
        Some(Terminal::InHazard)
    } else if p.y < ground - settings.monitor.kill_depth
        || !course.bounds.contains(p, settings.monitor.margin)
    {
        Some(Terminal::OutOfBounds)
    } else {
        None
    }
}

/// Scalar desirability of a predicted shot
pub fn score(result: &SimulationResult, start: Vec3, target: Vec3, immediate_hit_time: f32) -> f32 {
    match result.terminal {
        Terminal::Sank => return SINK_BONUS,
        Terminal::OutOfBounds | Terminal::InHazard => return FAILURE_PENALTY,
        Terminal::None => {}
    }
    if result.immediate_wall_hit(immediate_hit_time) {
        return FAILURE_PENALTY;
    }

    let final_distance = horizontal_distance(result.final_position, target);
    let progress = horizontal_distance(start, target) - final_distance;
    let mut s = progress * PROGRESS_WEIGHT + PROXIMITY_BONUS / (1.0 + final_distance)
        - WALL_HIT_PENALTY * result.wall_hits as f32
        - BUMPER_HIT_PENALTY * result.bumper_hits as f32
        + DISPLACEMENT_BONUS * horizontal_distance(result.final_position, start);
    if result.truncated {
        s -= TRUNCATED_PENALTY;
    }
    s.max(FAILURE_PENALTY + 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use crate::sim::course::{Fan, Hazard, HoleTarget, OrientedWall, PlayBounds};
    use proptest::prelude::*;

    fn course() -> CourseGeometry {
        CourseGeometry::open(
            PlayBounds::new(-20.0, 20.0, -20.0, 20.0),
            Vec3::new(0.0, BALL_RADIUS, 10.0),
            HoleTarget {
                position: Vec3::new(0.0, 0.0, 0.0),
                capture_radius: 1.0,
            },
        )
    }

    fn shot(dir: Vec3, power: f32) -> ShotCandidate {
        ShotCandidate::new(dir, power).unwrap()
    }

    /// Predict `s` from the tee toward the hole, launched at t = 0
    fn predict(c: &CourseGeometry, s: ShotCandidate, settings: &Settings) -> SimulationResult {
        let effects = ActiveEffects::default();
        let hole = c.hole.position;
        simulate_shot(c.tee, 0.0, &s, hole, c, &effects, settings)
    }

    #[test]
    fn test_prediction_sinks_straight_putt() {
        let c = course();
        let settings = Settings::default();
        let r = predict(&c, shot(Vec3::NEG_Z, 0.4), &settings);
        assert_eq!(r.terminal, Terminal::Sank);
        assert!(r.min_distance < 1.0);
        assert!(score(&r, c.tee, c.hole.position, 0.15) >= SINK_BONUS);
    }

    #[test]
    fn test_prediction_counts_wall_hits() {
        let mut c = course();
        c.walls.push(OrientedWall {
            center: Vec3::new(0.0, 0.0, 8.0),
            yaw: 0.0,
            width: 10.0,
            length: 0.5,
            height: 1.0,
        });
        let settings = Settings::default();
        let r = predict(&c, shot(Vec3::NEG_Z, 0.6), &settings);
        assert!(r.wall_hits >= 1);
        assert!(r.immediate_wall_hit(0.15));
        assert_eq!(score(&r, c.tee, c.hole.position, 0.15), FAILURE_PENALTY);
    }

    #[test]
    fn test_prediction_detects_hazard() {
        let mut c = course();
        c.hazards.push(Hazard {
            center: Vec3::new(8.0, 0.0, 10.0),
            width: 4.0,
            length: 4.0,
        });
        let settings = Settings::default();
        let r = predict(&c, shot(Vec3::X, 0.4), &settings);
        assert_eq!(r.terminal, Terminal::InHazard);
    }

    #[test]
    fn test_prediction_detects_out_of_bounds() {
        let mut c = course();
        // Perimeter modelled by custom walls, but none were placed
        c.custom_perimeter = true;
        let settings = Settings::default();
        let r = predict(&c, shot(Vec3::X, 1.0), &settings);
        assert_eq!(r.terminal, Terminal::OutOfBounds);
    }

    #[test]
    fn test_progress_outscores_regress() {
        let c = course();
        let settings = Settings::default();
        let toward = predict(&c, shot(Vec3::new(0.3, 0.0, -1.0), 0.2), &settings);
        let away = predict(&c, shot(Vec3::Z, 0.2), &settings);
        let hole = c.hole.position;
        assert!(score(&toward, c.tee, hole, 0.15) > score(&away, c.tee, hole, 0.15));
    }

    #[test]
    fn test_prediction_sees_blades_at_launch_time() {
        let mut c = course();
        // One slow blade lying across the tee-to-hole line at t = 0
        let fan = Fan {
            center: Vec3::new(-1.5, 0.0, 5.0),
            facing: 0.0,
            blade_count: 1,
            blade_length: 3.0,
            blade_thickness: 0.2,
            phase: 0.0,
            angular_velocity: 0.01,
            push_strength: 0.0,
            push_range: 0.0,
            push_spread: 0.0,
        };
        c.fans.push(fan);
        let settings = Settings::default();
        let effects = ActiveEffects::default();
        let s = shot(Vec3::NEG_Z, 0.3);
        let hole = c.hole.position;

        let blocked = simulate_shot(c.tee, 0.0, &s, hole, &c, &effects, &settings);
        // Half a turn later the blade points away from the line
        let later = std::f32::consts::PI / fan.angular_velocity;
        let clear = simulate_shot(c.tee, later, &s, hole, &c, &effects, &settings);

        assert!(blocked.wall_hits >= 1);
        assert_eq!(clear.wall_hits, 0);
        assert!(clear.min_distance < blocked.min_distance);
    }

    #[test]
    fn test_truncated_is_not_most_negative() {
        let r = SimulationResult {
            final_position: Vec3::new(0.0, 0.5, 30.0),
            terminal: Terminal::None,
            wall_hits: 40,
            bumper_hits: 40,
            min_distance: 30.0,
            path_length: 200.0,
            elapsed: 8.0,
            truncated: true,
            first_wall_hit: Some(1.0),
        };
        assert!(score(&r, Vec3::new(0.0, 0.5, 10.0), Vec3::ZERO, 0.15) > FAILURE_PENALTY);
    }

    proptest! {
        #[test]
        fn prop_prediction_respects_horizon(
            bearing in 0.0f32..std::f32::consts::TAU,
            power in 0.05f32..1.0,
            horizon in 0.5f32..4.0,
        ) {
            let mut c = course();
            c.walls.push(OrientedWall {
                center: Vec3::new(5.0, 0.0, 5.0),
                yaw: 0.7,
                width: 6.0,
                length: 0.5,
                height: 1.0,
            });
            let mut settings = Settings::default();
            settings.planner.horizon = horizon;
            let s = ShotCandidate::new(crate::bearing_to_direction(bearing), power).unwrap();
            let r = predict(&c, s, &settings);
            prop_assert!(r.elapsed <= horizon + settings.planner.tick_dt + 1e-4);
        }
    }
}
