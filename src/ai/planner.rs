//! Autonomous shot selection
//!
//! The agent waits for the ball to settle, thinks for a moment, then picks
//! a shot: a field shot when sitting inside a magnetic field, a direct shot
//! when the path to the target is clear, otherwise the best forward-simulated
//! candidate from a grid, and as a last resort the first unobstructed
//! direction around the circle.

use glam::Vec3;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::candidates::{
    FALLBACK_POWER, bearing_between, candidate_grid, direct_power, direct_shot, fallback_sweep,
    initial_segment_clear, line_of_sight, recently_failed,
};
use super::predict::{FAILURE_PENALTY, SimulationResult, score, simulate_shot};
use crate::consts::BALL_RADIUS;
use crate::ring::RingBuffer;
use crate::settings::{PlannerTuning, Settings};
use crate::sim::course::CourseGeometry;
use crate::sim::state::{ActiveEffects, HolePhase, HoleState, ShotCandidate, SimEvent};
use crate::{horizontal, horizontal_distance};

/// Failed shots remembered for candidate filtering
pub const FAILED_SHOT_MEMORY: usize = 8;

/// Main agent states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentPhase {
    /// Waiting for the ball to settle and the thinking delay to pass
    Idle,
    Deciding,
    /// Shot chosen, handed to the host on the next update
    Shooting,
    BallInMotion,
    /// Ball is in the cup
    Finished,
}

/// Which rule produced a shot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShotSource {
    Field,
    Direct,
    Search,
    Fallback,
}

/// Per-hole agent memory
#[derive(Debug, Clone, Default)]
pub struct PlannerState {
    pub waypoint_index: usize,
    /// Where the ball was the last time it made meaningful progress
    pub progress_position: Option<Vec3>,
    pub no_progress: u32,
    pub exploration: bool,
    pub failed_shots: RingBuffer<ShotCandidate, FAILED_SHOT_MEMORY>,
    pub field_engaged: bool,
    /// Decisions taken inside the current field
    pub field_attempts: u32,
}

/// A simulated and scored candidate
#[derive(Debug, Clone, Copy)]
pub struct ScoredCandidate {
    pub shot: ShotCandidate,
    pub score: f32,
    pub result: SimulationResult,
}

#[derive(Debug)]
pub struct ShotPlanner {
    phase: AgentPhase,
    pub state: PlannerState,
    timer: f32,
    pending: Option<ShotCandidate>,
    last_shot: Option<ShotCandidate>,
    last_source: Option<ShotSource>,
    last_candidates: Vec<ScoredCandidate>,
    seed: u64,
    rng: Pcg32,
}

impl ShotPlanner {
    pub fn new(tuning: &PlannerTuning) -> Self {
        Self::with_seed(tuning.seed)
    }

    fn with_seed(seed: u64) -> Self {
        Self {
            phase: AgentPhase::Idle,
            state: PlannerState::default(),
            timer: 0.0,
            pending: None,
            last_shot: None,
            last_source: None,
            last_candidates: Vec::new(),
            seed,
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Forget everything (hole transition)
    pub fn reset(&mut self) {
        log::debug!("Planner reset");
        *self = Self::with_seed(self.seed);
    }

    pub fn phase(&self) -> AgentPhase {
        self.phase
    }

    pub fn last_source(&self) -> Option<ShotSource> {
        self.last_source
    }

    /// Candidates simulated during the last decision
    pub fn last_candidates(&self) -> &[ScoredCandidate] {
        &self.last_candidates
    }

    /// Advance the agent by one frame. Returns a shot when one should be launched.
    pub fn update(
        &mut self,
        hole: &HoleState,
        course: &CourseGeometry,
        settings: &Settings,
        dt: f32,
    ) -> Option<ShotCandidate> {
        if self.phase != AgentPhase::Finished && hole.phase == HolePhase::Sunk {
            log::info!("Agent finished the hole");
            self.phase = AgentPhase::Finished;
        }

        match self.phase {
            AgentPhase::Finished => None,
            AgentPhase::Idle => {
                if hole.phase == HolePhase::Aiming {
                    self.timer += dt;
                    if self.timer >= settings.planner.start_delay {
                        self.timer = 0.0;
                        self.phase = AgentPhase::Deciding;
                    }
                } else {
                    self.timer = 0.0;
                }
                None
            }
            AgentPhase::Deciding => {
                let shot = self.decide(
                    hole.ball.position,
                    hole.time,
                    course,
                    &hole.effects,
                    settings,
                );
                self.pending = Some(shot);
                self.phase = AgentPhase::Shooting;
                None
            }
            AgentPhase::Shooting => {
                let shot = self.pending.take();
                self.phase = if shot.is_some() {
                    AgentPhase::BallInMotion
                } else {
                    AgentPhase::Idle
                };
                shot
            }
            AgentPhase::BallInMotion => {
                if hole.phase == HolePhase::Aiming {
                    self.phase = AgentPhase::Idle;
                }
                None
            }
        }
    }

    /// Learn from a terminal event of the shot in flight
    pub fn observe(&mut self, event: &SimEvent) {
        if let SimEvent::LeftBounds { .. } | SimEvent::EnteredHazard { .. } = event {
            if let Some(shot) = self.last_shot {
                log::debug!("Remembering penalized shot at bearing {:.2}", shot.bearing());
                self.state.failed_shots.push(shot);
            }
        }
    }

    /// Current aim point: first unreached waypoint, else the hole
    pub fn current_target(&self, course: &CourseGeometry) -> Vec3 {
        course
            .waypoints
            .get(self.state.waypoint_index)
            .copied()
            .unwrap_or(course.hole.position)
    }

    /// Pick the next shot from `position`, to be launched at simulation time `time`
    pub fn decide(
        &mut self,
        position: Vec3,
        time: f32,
        course: &CourseGeometry,
        effects: &ActiveEffects,
        settings: &Settings,
    ) -> ShotCandidate {
        let tuning = &settings.planner;
        let launch_speed = settings.physics.max_launch_speed * effects.speed_multiplier;

        let advanced = self.advance_waypoints(position, course, tuning);
        let target = self.current_target(course);
        self.track_progress(position, target, course, tuning, advanced);
        self.last_candidates.clear();

        let field = self.field_shot(position, target, course, launch_speed, tuning);
        let (shot, source) = if let Some(shot) = field {
            (shot, ShotSource::Field)
        } else if let Some(shot) = self.direct(position, target, course, launch_speed, tuning) {
            (shot, ShotSource::Direct)
        } else if let Some(shot) = self.search(position, time, target, course, effects, settings) {
            (shot, ShotSource::Search)
        } else {
            let base = bearing_between(position, target);
            let shot = fallback_sweep(course, position, base, BALL_RADIUS, launch_speed, tuning)
                .or_else(|| direct_shot(position, target, tuning))
                .unwrap_or(ShotCandidate {
                    direction: Vec3::X,
                    power: FALLBACK_POWER,
                });
            (shot, ShotSource::Fallback)
        };

        log::debug!(
            "Decision {:?}: bearing {:.2}, power {:.2}, target {:?}, exploration {}",
            source,
            shot.bearing(),
            shot.power,
            target,
            self.state.exploration
        );
        self.last_shot = Some(shot);
        self.last_source = Some(source);
        shot
    }

    fn advance_waypoints(
        &mut self,
        position: Vec3,
        course: &CourseGeometry,
        tuning: &PlannerTuning,
    ) -> bool {
        let mut advanced = false;
        while let Some(&w) = course.waypoints.get(self.state.waypoint_index) {
            if horizontal_distance(position, w) >= tuning.waypoint_reach {
                break;
            }
            self.state.waypoint_index += 1;
            advanced = true;
            log::debug!("Waypoint {} reached", self.state.waypoint_index);
        }
        advanced
    }

    fn track_progress(
        &mut self,
        position: Vec3,
        target: Vec3,
        course: &CourseGeometry,
        tuning: &PlannerTuning,
        advanced: bool,
    ) {
        let state = &mut self.state;
        let Some(anchor) = state.progress_position else {
            state.progress_position = Some(position);
            return;
        };

        let improvement =
            horizontal_distance(anchor, target) - horizontal_distance(position, target);
        if advanced || improvement > tuning.progress_threshold {
            state.no_progress = 0;
            state.exploration = false;
            state.failed_shots.clear();
            state.progress_position = Some(position);
            return;
        }

        state.no_progress += 1;
        if let Some(shot) = self.last_shot {
            state.failed_shots.push(shot);
        }
        let limit = if course.waypoints.len() >= tuning.waypoint_heavy_count {
            tuning.waypoint_heavy_no_progress_limit
        } else {
            tuning.no_progress_limit
        };
        let waypoints_left = state.waypoint_index < course.waypoints.len();
        if !state.exploration && !waypoints_left && state.no_progress >= limit {
            log::debug!("No progress for {} shots, exploring", state.no_progress);
            state.exploration = true;
        }
    }

    /// Inside a magnetic field: ride it toward the target or step around it
    fn field_shot(
        &mut self,
        position: Vec3,
        target: Vec3,
        course: &CourseGeometry,
        launch_speed: f32,
        tuning: &PlannerTuning,
    ) -> Option<ShotCandidate> {
        let Some(field) = course.field_at(position) else {
            self.state.field_engaged = false;
            self.state.field_attempts = 0;
            return None;
        };
        self.state.field_engaged = true;
        self.state.field_attempts += 1;

        let to_field = horizontal(field.center - position).try_normalize()?;
        let to_target = horizontal(target - position).try_normalize()?;
        let direction = if to_field.dot(to_target) > tuning.field_alignment {
            to_field
        } else {
            let side = Vec3::new(-to_field.z, 0.0, to_field.x);
            if side.dot(to_target) >= 0.0 { side } else { -side }
        };
        let escalation = tuning.field_power_step * (self.state.field_attempts - 1) as f32;
        let base_power = direct_power(horizontal_distance(position, target), tuning);
        let shot = ShotCandidate::new(direction, (base_power + escalation).min(1.0))?;
        initial_segment_clear(course, position, &shot, BALL_RADIUS, launch_speed, tuning)
            .then_some(shot)
    }

    fn direct(
        &self,
        position: Vec3,
        target: Vec3,
        course: &CourseGeometry,
        launch_speed: f32,
        tuning: &PlannerTuning,
    ) -> Option<ShotCandidate> {
        if self.state.exploration {
            return None;
        }
        let shot = direct_shot(position, target, tuning)?;
        if recently_failed(&shot, self.state.failed_shots.iter(), tuning) {
            return None;
        }
        let clear = line_of_sight(course, position, target, BALL_RADIUS, tuning)
            && initial_segment_clear(course, position, &shot, BALL_RADIUS, launch_speed, tuning);
        clear.then_some(shot)
    }

    fn search(
        &mut self,
        position: Vec3,
        time: f32,
        target: Vec3,
        course: &CourseGeometry,
        effects: &ActiveEffects,
        settings: &Settings,
    ) -> Option<ShotCandidate> {
        let tuning = &settings.planner;
        let launch_speed = settings.physics.max_launch_speed * effects.speed_multiplier;
        let grid = candidate_grid(
            bearing_between(position, target),
            self.state.exploration,
            &mut self.rng,
        );
        for shot in grid {
            let clear = initial_segment_clear(
                course,
                position,
                &shot,
                BALL_RADIUS,
                launch_speed,
                tuning,
            );
            if !clear || recently_failed(&shot, self.state.failed_shots.iter(), tuning) {
                continue;
            }
            let result = simulate_shot(
                position,
                time,
                &shot,
                target,
                course,
                effects,
                settings,
            );
            self.last_candidates.push(ScoredCandidate {
                shot,
                score: score(&result, position, target, tuning.immediate_hit_time),
                result,
            });
        }
        self.last_candidates
            .iter()
            .filter(|c| c.score > FAILURE_PENALTY)
            .max_by(|a, b| a.score.total_cmp(&b.score))
            .map(|c| c.shot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use crate::normalize_angle;
    use crate::sim::course::{HoleTarget, MagneticField, OrientedWall, PlayBounds};
    use crate::sim::tick::{TickInput, tick};

    fn course() -> CourseGeometry {
        CourseGeometry::open(
            PlayBounds::new(-20.0, 20.0, -20.0, 20.0),
            Vec3::new(0.0, BALL_RADIUS, 10.0),
            HoleTarget {
                position: Vec3::ZERO,
                capture_radius: 1.0,
            },
        )
    }

    fn walled() -> CourseGeometry {
        let mut c = course();
        c.hole.position = Vec3::new(0.0, 0.0, -10.0);
        // Spans the whole course: no way through
        c.walls.push(OrientedWall {
            center: Vec3::ZERO,
            yaw: 0.0,
            width: 40.0,
            length: 0.5,
            height: 1.0,
        });
        c
    }

    fn offset_from(shot: &ShotCandidate, base: f32) -> f32 {
        normalize_angle(shot.bearing() - base).abs()
    }

    #[test]
    fn test_clear_path_takes_direct_shot() {
        let c = course();
        let settings = Settings::default();
        let mut planner = ShotPlanner::new(&settings.planner);
        let shot = planner.decide(c.tee, 0.0, &c, &ActiveEffects::default(), &settings);
        assert_eq!(planner.last_source(), Some(ShotSource::Direct));
        assert!((shot.direction - Vec3::NEG_Z).length() < 1e-4);
        assert!(planner.last_candidates().is_empty());
    }

    #[test]
    fn test_blocked_target_enters_exploration() {
        let c = walled();
        let settings = Settings::default();
        let mut planner = ShotPlanner::new(&settings.planner);
        let start = c.tee;
        let base = bearing_between(start, c.hole.position);

        planner.decide(start, 0.0, &c, &ActiveEffects::default(), &settings);
        assert_eq!(planner.last_source(), Some(ShotSource::Search));
        assert!(!planner.last_candidates().is_empty());
        let quarter = 90f32.to_radians() + 1e-3;
        assert!(planner.last_candidates().iter().all(|c| offset_from(&c.shot, base) <= quarter));

        // The wall sends every shot back: no progress from the same spot
        for _ in 0..settings.planner.no_progress_limit {
            assert!(!planner.state.exploration);
            planner.decide(start, 0.0, &c, &ActiveEffects::default(), &settings);
        }
        assert!(planner.state.exploration);
        assert!(planner
            .last_candidates()
            .iter()
            .any(|c| offset_from(&c.shot, base) > 120f32.to_radians()));
    }

    #[test]
    fn test_progress_clears_exploration() {
        let c = course();
        let settings = Settings::default();
        let mut planner = ShotPlanner::new(&settings.planner);
        planner.state.progress_position = Some(Vec3::new(0.0, 0.5, 15.0));
        planner.state.exploration = true;
        planner.state.no_progress = 5;
        planner
            .state
            .failed_shots
            .push(ShotCandidate::new(Vec3::X, 0.5).unwrap());

        planner.decide(Vec3::new(0.0, 0.5, 5.0), 0.0, &c, &ActiveEffects::default(), &settings);
        assert!(!planner.state.exploration);
        assert_eq!(planner.state.no_progress, 0);
        assert!(planner.state.failed_shots.is_empty());
    }

    #[test]
    fn test_waypoints_guide_and_suppress_exploration() {
        let mut c = walled();
        c.waypoints = vec![Vec3::new(0.0, 0.0, 9.0), Vec3::new(15.0, 0.0, -15.0)];
        let settings = Settings::default();
        let mut planner = ShotPlanner::new(&settings.planner);

        // First waypoint is already within reach of the tee
        planner.decide(c.tee, 0.0, &c, &ActiveEffects::default(), &settings);
        assert_eq!(planner.state.waypoint_index, 1);
        assert_eq!(planner.current_target(&c), c.waypoints[1]);

        for _ in 0..10 {
            planner.decide(c.tee, 0.0, &c, &ActiveEffects::default(), &settings);
        }
        assert!(planner.state.no_progress >= settings.planner.no_progress_limit);
        assert!(!planner.state.exploration);
    }

    #[test]
    fn test_field_exploited_when_on_the_way() {
        let mut c = course();
        c.hole.position = Vec3::new(0.0, 0.0, -10.0);
        c.fields.push(MagneticField {
            center: Vec3::new(0.0, 0.0, 5.0),
            range: 4.0,
            strength: 8.0,
        });
        let settings = Settings::default();
        let mut planner = ShotPlanner::new(&settings.planner);
        let from = Vec3::new(0.0, 0.5, 7.0);

        let first = planner.decide(from, 0.0, &c, &ActiveEffects::default(), &settings);
        assert_eq!(planner.last_source(), Some(ShotSource::Field));
        assert!(planner.state.field_engaged);
        assert!((first.direction - Vec3::NEG_Z).length() < 1e-4);

        let second = planner.decide(from, 0.0, &c, &ActiveEffects::default(), &settings);
        assert!(second.power > first.power);
    }

    #[test]
    fn test_field_avoided_when_off_line() {
        let mut c = course();
        c.hole.position = Vec3::new(0.0, 0.0, -10.0);
        c.fields.push(MagneticField {
            center: Vec3::new(3.0, 0.0, 7.0),
            range: 4.0,
            strength: 8.0,
        });
        let settings = Settings::default();
        let mut planner = ShotPlanner::new(&settings.planner);
        let from = Vec3::new(0.0, 0.5, 7.0);
        let shot = planner.decide(from, 0.0, &c, &ActiveEffects::default(), &settings);
        assert_eq!(planner.last_source(), Some(ShotSource::Field));
        // Perpendicular to the field, on the side facing the hole
        assert!(shot.direction.x.abs() < 1e-4);
        assert!(shot.direction.z < 0.0);
    }

    #[test]
    fn test_state_machine_cycle() {
        let c = course();
        let settings = Settings::default();
        let mut planner = ShotPlanner::new(&settings.planner);
        let mut hole = HoleState::new(&c);

        let mut shot = None;
        let mut frames = 0;
        while shot.is_none() && frames < 120 {
            shot = planner.update(&hole, &c, &settings, REFERENCE_DT);
            frames += 1;
        }
        let shot = shot.expect("agent never shot");
        // Thinking delay, one decision frame, one shooting frame
        assert!(frames as f32 * REFERENCE_DT >= settings.planner.start_delay);
        assert_eq!(planner.phase(), AgentPhase::BallInMotion);

        tick(&mut hole, &c, &TickInput { shot: Some(shot) }, &settings, REFERENCE_DT, &mut ());
        assert!(planner.update(&hole, &c, &settings, REFERENCE_DT).is_none());
        assert_eq!(planner.phase(), AgentPhase::BallInMotion);

        hole.phase = HolePhase::Sunk;
        planner.update(&hole, &c, &settings, REFERENCE_DT);
        assert_eq!(planner.phase(), AgentPhase::Finished);

        planner.reset();
        assert_eq!(planner.phase(), AgentPhase::Idle);
        assert!(planner.state.progress_position.is_none());
    }

    #[test]
    fn test_penalized_shot_is_remembered() {
        let c = course();
        let settings = Settings::default();
        let mut planner = ShotPlanner::new(&settings.planner);
        planner.decide(c.tee, 0.0, &c, &ActiveEffects::default(), &settings);
        planner.observe(&SimEvent::Rested { position: c.tee });
        assert!(planner.state.failed_shots.is_empty());
        planner.observe(&SimEvent::LeftBounds {
            penalty_strokes: 1,
            reset_to: c.tee,
        });
        assert_eq!(planner.state.failed_shots.len(), 1);
    }

    #[test]
    fn test_agent_sinks_open_putt() {
        let c = course();
        let settings = Settings::default();
        let mut planner = ShotPlanner::new(&settings.planner);
        let mut hole = HoleState::new(&c);
        let mut strokes = 0;

        for _ in 0..60 * 60 {
            let shot = planner.update(&hole, &c, &settings, REFERENCE_DT);
            strokes += shot.is_some() as u32;
            let events = tick(&mut hole, &c, &TickInput { shot }, &settings, REFERENCE_DT, &mut ());
            for event in &events {
                planner.observe(event);
            }
            if planner.phase() == AgentPhase::Finished {
                break;
            }
        }
        assert_eq!(hole.phase, HolePhase::Sunk);
        assert!(strokes <= 4, "took {} strokes", strokes);
    }
}
