//! Frame scheduler
//!
//! Splits each rendered frame into substeps small enough that the ball
//! never moves more than a fraction of its radius per step, then runs
//! forces → integration → blade checks → static collision resolution for
//! each substep. `tick` wraps that with shot application, monitoring and
//! the rest/sink/penalty events the stroke ledger consumes.

use glam::Vec3;

use super::collision::{CollisionOutcome, resolve, resolve_blades};
use super::course::CourseGeometry;
use super::forces::total_acceleration;
use super::integrator::{self, MotionProfile};
use super::state::{
    ActiveEffects, BallState, HolePhase, HoleState, ImpactSink, ShotCandidate, SimEvent,
};
use crate::settings::{PhysicsTuning, Settings};

/// Squared speed under which a grounded ball ends the frame early
const SETTLED_SPEED_SQ: f32 = 1e-6;

/// Input commands for a single frame
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Shot to launch (ignored unless the ball is waiting for one)
    pub shot: Option<ShotCandidate>,
}

/// Number of substeps needed to keep per-step travel under `fraction * radius`
pub fn substep_count(speed: f32, dt: f32, radius: f32, fraction: f32, max_substeps: u32) -> u32 {
    let expected_displacement = speed * dt;
    let step = (fraction * radius).max(f32::EPSILON);
    let needed = (expected_displacement / step).ceil();
    if needed.is_finite() {
        (needed as u32).clamp(1, max_substeps.max(1))
    } else {
        max_substeps.max(1)
    }
}

/// What one shared physics step did
#[derive(Debug, Clone, Copy)]
pub struct StepReport {
    pub displacement: Vec3,
    pub blade: CollisionOutcome,
    pub collision: CollisionOutcome,
}

/// One physics step: continuous forces, integration, moving blades, static
/// colliders. Shared by the live scheduler and the predictive simulator so
/// the two cannot drift apart.
pub fn physics_step(
    ball: &mut BallState,
    course: &CourseGeometry,
    effects: &ActiveEffects,
    profile: &MotionProfile,
    time: f32,
    dt: f32,
    sink: &mut impl ImpactSink,
) -> StepReport {
    let accel = total_acceleration(course, effects, ball.position, ball.radius);
    ball.velocity += accel * dt;
    let integration = integrator::step(ball, dt, course, profile);
    let blade = resolve_blades(ball, course, time, profile, sink);
    let collision = resolve(ball, course, profile, sink);
    StepReport {
        displacement: integration.displacement,
        blade,
        collision,
    }
}

/// Summary of one scheduled frame
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameReport {
    pub substeps: u32,
    /// Largest `speed * sub_dt` any substep was planned with
    pub max_planned_step: f32,
    pub collisions: u32,
    /// Largest single-step displacement of the ball centre
    pub max_displacement: f32,
    /// The substep budget ran out before the frame's time was consumed
    pub truncated: bool,
    /// Simulated time consumed (less than the slice when truncated)
    pub elapsed: f32,
}

/// Advance the ball through one frame slice starting at simulation time `time`.
///
/// Every substep is sized so the ball's current speed carries it at most
/// `substep_fraction * radius`. If `max_substeps` runs out first the frame
/// stops there and is reported as truncated; the ball keeps its velocity.
pub fn step_frame(
    ball: &mut BallState,
    course: &CourseGeometry,
    effects: &ActiveEffects,
    tuning: &PhysicsTuning,
    time: f32,
    dt: f32,
    sink: &mut impl ImpactSink,
) -> FrameReport {
    let dt = dt.clamp(0.0, tuning.max_frame_dt);
    let profile = MotionProfile::live(tuning);
    let mut report = FrameReport::default();

    let mut remaining = dt;
    let mut now = time;
    while remaining > f32::EPSILON {
        if report.substeps >= tuning.max_substeps {
            report.truncated = true;
            log::debug!("Substep budget exhausted with {:.4}s left in frame", remaining);
            break;
        }
        // Re-plan the rest of the frame from the current speed: bumpers
        // and forces can raise it mid-frame
        let speed = ball.speed();
        let n = substep_count(
            speed,
            remaining,
            ball.radius,
            tuning.substep_fraction,
            u32::MAX,
        );
        let sub_dt = remaining / n as f32;
        report.max_planned_step = report.max_planned_step.max(speed * sub_dt);

        let step = physics_step(ball, course, effects, &profile, now, sub_dt, sink);
        report.substeps += 1;
        report.max_displacement = report.max_displacement.max(step.displacement.length());
        report.collisions += step.blade.collided as u32 + step.collision.collided as u32;
        remaining -= sub_dt;
        now += sub_dt;
        report.elapsed += sub_dt;

        if ball.grounded && ball.velocity.length_squared() < SETTLED_SPEED_SQ {
            break;
        }
    }
    report
}

/// Advance a hole by one frame
pub fn tick(
    hole: &mut HoleState,
    course: &CourseGeometry,
    input: &TickInput,
    settings: &Settings,
    dt: f32,
    sink: &mut impl ImpactSink,
) -> Vec<SimEvent> {
    let mut events = Vec::new();
    if hole.phase == HolePhase::Sunk {
        return events;
    }

    if let Some(shot) = &input.shot {
        if hole.phase == HolePhase::Aiming {
            let launch_speed = settings.physics.max_launch_speed * hole.effects.speed_multiplier;
            hole.ball.apply_shot(shot, launch_speed);
            hole.phase = HolePhase::Rolling;
            log::debug!(
                "Shot launched: bearing {:.2}, power {:.2}",
                shot.bearing(),
                shot.power
            );
        } else {
            log::warn!("Shot ignored: ball is still moving");
        }
    }

    // The monitor sees the same simulated slice the ball moved through
    let slice = if hole.phase == HolePhase::Rolling {
        let frame = step_frame(
            &mut hole.ball,
            course,
            &hole.effects,
            &settings.physics,
            hole.time,
            dt,
            sink,
        );
        frame.elapsed
    } else {
        dt.clamp(0.0, settings.physics.max_frame_dt)
    };
    hole.time += slice;

    if let Some(event) = hole.monitor.update(&hole.ball, course, &settings.monitor, slice) {
        match event {
            SimEvent::Sank { .. } => {
                log::info!("Ball sank at t={:.2}s", hole.time);
                hole.phase = HolePhase::Sunk;
            }
            SimEvent::LeftBounds { reset_to, .. } | SimEvent::EnteredHazard { reset_to, .. } => {
                log::info!("Penalty: {:?}", event);
                hole.ball.reset_to(reset_to);
                hole.monitor.rearm();
                hole.phase = HolePhase::Aiming;
            }
            SimEvent::Rested { .. } => {}
        }
        events.push(event);
        return events;
    }

    if hole.phase == HolePhase::Rolling
        && hole.ball.moving
        && hole.ball.at_rest(settings.physics.rest_speed)
    {
        hole.ball.moving = false;
        hole.ball.velocity = Vec3::ZERO;
        hole.phase = HolePhase::Aiming;
        hole.monitor.record_safe(&hole.ball, course);
        events.push(SimEvent::Rested {
            position: hole.ball.position,
        });
    }

    events
}
