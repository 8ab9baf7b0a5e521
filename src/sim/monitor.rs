//! Out-of-bounds, hazard and sink detection
//!
//! Runs once per frame after the physics. Leaving the envelope only counts
//! after a grace period; falling past the kill depth, dropping into a
//! hazard pit or sinking fire at once. Every trigger latches until the host
//! rearms the monitor, so one fall yields one penalty.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::course::CourseGeometry;
use super::state::{BallState, SimEvent};
use crate::consts::HAZARD_CONTAIN_DEPTH;
use crate::settings::MonitorTuning;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundsMonitor {
    /// Continuous time spent outside the envelope
    outside_time: f32,
    latched: bool,
    last_safe_position: Vec3,
}

impl BoundsMonitor {
    pub fn new(safe_position: Vec3) -> Self {
        Self {
            outside_time: 0.0,
            latched: false,
            last_safe_position: safe_position,
        }
    }

    /// Where penalties put the ball back
    pub fn last_safe_position(&self) -> Vec3 {
        self.last_safe_position
    }

    pub fn is_latched(&self) -> bool {
        self.latched
    }

    /// Remember a resting position as the penalty reset point, unless it is
    /// somewhere a reset would be pointless
    pub fn record_safe(&mut self, ball: &BallState, course: &CourseGeometry) {
        if ball.grounded
            && !course.over_hole(ball.position)
            && course.hazard_at(ball.position, ball.radius).is_none()
            && course.bounds.contains(ball.position, 0.0)
        {
            self.last_safe_position = ball.position;
        }
    }

    /// Allow the next trigger (after the host reset the ball)
    pub fn rearm(&mut self) {
        self.latched = false;
        self.outside_time = 0.0;
    }

    /// Check the ball after a frame of `dt` seconds
    pub fn update(
        &mut self,
        ball: &BallState,
        course: &CourseGeometry,
        tuning: &MonitorTuning,
        dt: f32,
    ) -> Option<SimEvent> {
        if self.latched {
            return None;
        }
        let p = ball.position;
        let ground = course.ground_y;

        if course.over_hole(p) && p.y < ground - ball.radius {
            return self.trigger(SimEvent::Sank { position: p });
        }

        if p.y < ground - HAZARD_CONTAIN_DEPTH && course.hazard_at(p, 0.0).is_some() {
            return self.trigger(SimEvent::EnteredHazard {
                penalty_strokes: tuning.penalty_strokes,
                reset_to: self.last_safe_position,
            });
        }

        let left = SimEvent::LeftBounds {
            penalty_strokes: tuning.penalty_strokes,
            reset_to: self.last_safe_position,
        };
        if p.y < ground - tuning.kill_depth {
            return self.trigger(left);
        }

        // On the margin line counts as outside
        if course.bounds.contains(p, tuning.margin) {
            self.outside_time = 0.0;
            return None;
        }
        self.outside_time += dt.max(0.0);
        if self.outside_time > tuning.grace {
            return self.trigger(left);
        }
        None
    }

    fn trigger(&mut self, event: SimEvent) -> Option<SimEvent> {
        self.latched = true;
        self.outside_time = 0.0;
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use crate::sim::course::{Hazard, HoleTarget, PlayBounds};

    fn course() -> CourseGeometry {
        CourseGeometry::open(
            PlayBounds::new(-10.0, 10.0, -10.0, 10.0),
            Vec3::new(0.0, BALL_RADIUS, 8.0),
            HoleTarget {
                position: Vec3::new(0.0, 0.0, -8.0),
                capture_radius: 1.0,
            },
        )
    }

    /// Penalties fired while the ball sits `beyond` the margin line for `frames` frames
    fn held_outside(beyond: f32, frames: usize, tuning: &MonitorTuning) -> usize {
        let c = course();
        let mut monitor = BoundsMonitor::new(c.tee);
        let ball = BallState::new(Vec3::new(10.0 + tuning.margin + beyond, BALL_RADIUS, 0.0));
        (0..frames)
            .filter_map(|_| monitor.update(&ball, &c, tuning, REFERENCE_DT))
            .count()
    }

    #[test]
    fn test_grace_period_is_deterministic() {
        let tuning = MonitorTuning::default();
        let under = (tuning.grace / REFERENCE_DT) as usize - 1;
        assert_eq!(held_outside(0.5, under, &tuning), 0);
        // Held well past the grace period: exactly one penalty
        assert_eq!(held_outside(0.5, under * 4, &tuning), 1);
    }

    #[test]
    fn test_margin_boundary_counts_as_outside() {
        let tuning = MonitorTuning::default();
        let under = (tuning.grace / REFERENCE_DT) as usize - 1;
        // Exactly on the line: nothing inside the grace period, one penalty after it
        assert_eq!(held_outside(0.0, under, &tuning), 0);
        assert_eq!(held_outside(0.0, 60, &tuning), 1);
    }

    #[test]
    fn test_returning_inside_resets_grace() {
        let c = course();
        let tuning = MonitorTuning::default();
        let mut monitor = BoundsMonitor::new(c.tee);
        let outside = BallState::new(Vec3::new(13.0, BALL_RADIUS, 0.0));
        let inside = BallState::new(Vec3::new(9.0, BALL_RADIUS, 0.0));
        for _ in 0..20 {
            for _ in 0..20 {
                assert!(monitor.update(&outside, &c, &tuning, REFERENCE_DT).is_none());
            }
            assert!(monitor.update(&inside, &c, &tuning, REFERENCE_DT).is_none());
        }
    }

    #[test]
    fn test_kill_depth_is_immediate() {
        let c = course();
        let tuning = MonitorTuning::default();
        let mut monitor = BoundsMonitor::new(c.tee);
        let ball = BallState::new(Vec3::new(0.0, -tuning.kill_depth - 1.0, 0.0));
        let event = monitor.update(&ball, &c, &tuning, REFERENCE_DT);
        assert_eq!(
            event,
            Some(SimEvent::LeftBounds {
                penalty_strokes: tuning.penalty_strokes,
                reset_to: c.tee,
            })
        );
        assert!(monitor.is_latched());
        assert!(monitor.update(&ball, &c, &tuning, REFERENCE_DT).is_none());
        monitor.rearm();
        assert!(monitor.update(&ball, &c, &tuning, REFERENCE_DT).is_some());
    }

    #[test]
    fn test_hazard_penalty_uses_last_safe_position() {
        let mut c = course();
        c.hazards.push(Hazard {
            center: Vec3::ZERO,
            width: 4.0,
            length: 4.0,
        });
        let tuning = MonitorTuning::default();
        let mut monitor = BoundsMonitor::new(c.tee);

        let safe = BallState::new(Vec3::new(5.0, BALL_RADIUS, 0.0));
        monitor.record_safe(&safe, &c);
        // Resting spots on the hazard are never recorded
        monitor.record_safe(&BallState::new(Vec3::new(0.0, BALL_RADIUS, 0.0)), &c);
        assert_eq!(monitor.last_safe_position(), safe.position);

        let shallow = BallState::new(Vec3::new(0.0, -0.5, 0.0));
        assert!(monitor.update(&shallow, &c, &tuning, REFERENCE_DT).is_none());
        let deep = BallState::new(Vec3::new(0.0, -2.0, 0.0));
        let event = monitor.update(&deep, &c, &tuning, REFERENCE_DT);
        assert_eq!(
            event,
            Some(SimEvent::EnteredHazard {
                penalty_strokes: tuning.penalty_strokes,
                reset_to: safe.position,
            })
        );
    }

    #[test]
    fn test_sink_detected_below_rim() {
        let c = course();
        let tuning = MonitorTuning::default();
        let mut monitor = BoundsMonitor::new(c.tee);
        let rolling_over = BallState::new(c.hole.position + Vec3::new(0.0, BALL_RADIUS, 0.0));
        assert!(monitor.update(&rolling_over, &c, &tuning, REFERENCE_DT).is_none());
        let dropped = BallState::new(c.hole.position + Vec3::new(0.2, -0.8, 0.0));
        assert!(matches!(
            monitor.update(&dropped, &c, &tuning, REFERENCE_DT),
            Some(SimEvent::Sank { .. })
        ));
    }
}
