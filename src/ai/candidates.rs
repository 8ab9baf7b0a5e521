//! Candidate shots and cheap reachability checks
//!
//! Candidates are generated as angular offsets from the bearing to the
//! current target crossed with a handful of power levels. The direct grid
//! stays within a quarter turn; the exploration grid covers the full circle.

use glam::Vec3;
use rand::Rng;
use rand_pcg::Pcg32;

use crate::settings::PlannerTuning;
use crate::sim::course::CourseGeometry;
use crate::sim::state::ShotCandidate;
use crate::{bearing_to_direction, direction_to_bearing, horizontal, horizontal_distance};

/// Offsets (degrees, each used on both sides) for ordinary searches
pub const DIRECT_OFFSETS_DEG: [f32; 6] = [0.0, 15.0, 30.0, 45.0, 60.0, 90.0];
pub const DIRECT_POWERS: [f32; 4] = [0.3, 0.5, 0.7, 0.9];

/// Exploration sweeps the whole circle at this spacing
pub const EXPLORATION_STEP_DEG: f32 = 15.0;
pub const EXPLORATION_POWERS: [f32; 6] = [0.2, 0.35, 0.5, 0.65, 0.8, 1.0];
/// Largest random power nudge applied in exploration
pub const EXPLORATION_JITTER: f32 = 0.05;

/// Power used for the full-circle fallback sweep
pub const FALLBACK_POWER: f32 = 0.5;

/// Signed angular offsets in radians, 0 first, then alternating sides
pub fn angular_offsets(exploration: bool) -> Vec<f32> {
    let degrees: Vec<f32> = if exploration {
        let steps = (180.0 / EXPLORATION_STEP_DEG) as u32;
        (0..=steps).map(|i| i as f32 * EXPLORATION_STEP_DEG).collect()
    } else {
        DIRECT_OFFSETS_DEG.to_vec()
    };

    let mut offsets = Vec::with_capacity(degrees.len() * 2);
    for d in degrees {
        offsets.push(d.to_radians());
        // 0 and 180 have no distinct mirror
        if d > 0.0 && d < 180.0 {
            offsets.push(-d.to_radians());
        }
    }
    offsets
}

/// Offset × power grid around `base_bearing`. Exploration powers get a
/// small seeded jitter so repeated searches do not replay the same shots.
pub fn candidate_grid(base_bearing: f32, exploration: bool, rng: &mut Pcg32) -> Vec<ShotCandidate> {
    let powers: &[f32] = if exploration {
        &EXPLORATION_POWERS
    } else {
        &DIRECT_POWERS
    };
    let mut grid = Vec::new();
    for offset in angular_offsets(exploration) {
        let direction = bearing_to_direction(base_bearing + offset);
        for &power in powers {
            let power = if exploration {
                power + rng.random_range(-EXPLORATION_JITTER..=EXPLORATION_JITTER)
            } else {
                power
            };
            if let Some(shot) = ShotCandidate::new(direction, power.clamp(0.05, 1.0)) {
                grid.push(shot);
            }
        }
    }
    grid
}

/// Power for a direct shot over `distance`
pub fn direct_power(distance: f32, tuning: &PlannerTuning) -> f32 {
    let mut power = (distance / tuning.full_power_distance).clamp(tuning.min_power, 1.0);
    if distance < tuning.short_distance {
        power *= tuning.short_distance_factor;
    }
    power
}

/// Straight shot at `target`, if the target is not where the ball already is
pub fn direct_shot(from: Vec3, target: Vec3, tuning: &PlannerTuning) -> Option<ShotCandidate> {
    let to_target = horizontal(target - from);
    ShotCandidate::new(to_target, direct_power(to_target.length(), tuning))
}

/// Sampled clearance along the straight path between two points
pub fn line_of_sight(
    course: &CourseGeometry,
    from: Vec3,
    to: Vec3,
    radius: f32,
    tuning: &PlannerTuning,
) -> bool {
    let distance = horizontal_distance(from, to);
    let samples = (distance / tuning.sight_step.max(0.05)).ceil() as u32;
    // Skip the start: the ball may be resting against something
    (1..=samples).all(|i| {
        let p = from.lerp(to, i as f32 / samples as f32);
        !course.is_blocked(Vec3::new(p.x, from.y, p.z), radius, 0.0)
    })
}

/// Whether the first stretch of a shot is free of obstacles.
///
/// The stretch is how far the ball travels at launch speed before a hit
/// would count as immediate.
pub fn initial_segment_clear(
    course: &CourseGeometry,
    from: Vec3,
    shot: &ShotCandidate,
    radius: f32,
    launch_speed: f32,
    tuning: &PlannerTuning,
) -> bool {
    let reach = shot.power * launch_speed * tuning.immediate_hit_time + radius;
    let to = from + shot.direction * reach;
    line_of_sight(course, from, to, radius, tuning)
}

/// Whether a shot repeats one that recently failed
pub fn recently_failed<'a>(
    shot: &ShotCandidate,
    mut failed: impl Iterator<Item = &'a ShotCandidate>,
    tuning: &PlannerTuning,
) -> bool {
    failed.any(|f| shot.similar_to(f, tuning.failed_direction_cos, tuning.failed_power_tolerance))
}

/// First direction around the full circle (starting at `base_bearing`)
/// whose opening stretch is clear
pub fn fallback_sweep(
    course: &CourseGeometry,
    from: Vec3,
    base_bearing: f32,
    radius: f32,
    launch_speed: f32,
    tuning: &PlannerTuning,
) -> Option<ShotCandidate> {
    angular_offsets(true)
        .into_iter()
        .filter_map(|offset| {
            ShotCandidate::new(bearing_to_direction(base_bearing + offset), FALLBACK_POWER)
        })
        .find(|shot| initial_segment_clear(course, from, shot, radius, launch_speed, tuning))
}

/// Bearing of the straight line from `from` to `to`
pub fn bearing_between(from: Vec3, to: Vec3) -> f32 {
    direction_to_bearing(horizontal(to - from))
}
