//! Simulation tuning
//!
//! Every physical and planning constant the core uses can be overridden from
//! a JSON file. Missing fields fall back to the values in `crate::consts`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;

/// Errors raised while loading settings or course files
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Physical constants shared by the live and predictive simulations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsTuning {
    pub gravity: f32,
    pub hole_pull: f32,
    /// Fraction of max launch speed under which the hole pull engages
    pub hole_capture_speed_ratio: f32,
    /// Per-reference-frame damping inside the cup
    pub hole_damping: f32,
    pub friction_fast: f32,
    pub friction_slow: f32,
    pub friction_high_speed: f32,
    pub friction_low_speed: f32,
    pub min_roll_speed: f32,
    pub rest_speed: f32,
    pub bounce_damping: f32,
    pub bumper_gain: f32,
    pub blade_damping: f32,
    pub max_speed: f32,
    pub max_launch_speed: f32,
    pub substep_fraction: f32,
    pub max_substeps: u32,
    pub max_frame_dt: f32,
}

impl Default for PhysicsTuning {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            hole_pull: HOLE_PULL,
            hole_capture_speed_ratio: HOLE_CAPTURE_SPEED_RATIO,
            hole_damping: HOLE_DAMPING,
            friction_fast: FRICTION_FAST,
            friction_slow: FRICTION_SLOW,
            friction_high_speed: FRICTION_HIGH_SPEED,
            friction_low_speed: FRICTION_LOW_SPEED,
            min_roll_speed: MIN_ROLL_SPEED,
            rest_speed: REST_SPEED,
            bounce_damping: BOUNCE_DAMPING,
            bumper_gain: BUMPER_GAIN,
            blade_damping: BLADE_DAMPING,
            max_speed: BALL_MAX_SPEED,
            max_launch_speed: crate::max_launch_speed(),
            substep_fraction: SUBSTEP_FRACTION,
            max_substeps: MAX_SUBSTEPS,
            max_frame_dt: MAX_FRAME_DT,
        }
    }
}

/// Shot planner behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerTuning {
    /// Seconds the agent waits at rest before deciding
    pub start_delay: f32,
    /// Tick length of the predictive simulator
    pub tick_dt: f32,
    /// Maximum simulated seconds per candidate
    pub horizon: f32,
    /// Horizontal velocity retained per predictive tick
    pub predictive_friction: f32,
    /// Restitution for predictive wall bounces
    pub predictive_bounce: f32,
    /// Distance at which a waypoint counts as reached
    pub waypoint_reach: f32,
    /// Minimum improvement in distance-to-target that counts as progress
    pub progress_threshold: f32,
    /// Decisions without progress before exploration mode
    pub no_progress_limit: u32,
    /// Same, on courses with many waypoints
    pub waypoint_heavy_no_progress_limit: u32,
    pub waypoint_heavy_count: usize,
    pub min_power: f32,
    /// Target distance mapped to full power
    pub full_power_distance: f32,
    /// Below this distance the direct-shot power is scaled down further
    pub short_distance: f32,
    pub short_distance_factor: f32,
    /// Bearing alignment above which a magnetic field is exploited
    pub field_alignment: f32,
    /// Extra power per repeated attempt inside the same field
    pub field_power_step: f32,
    /// Cosine similarity above which two directions are the same shot
    pub failed_direction_cos: f32,
    pub failed_power_tolerance: f32,
    /// Wall hits earlier than this (seconds) are "immediate"
    pub immediate_hit_time: f32,
    /// Sampling spacing for line-of-sight checks
    pub sight_step: f32,
    /// Seed for exploration power jitter
    pub seed: u64,
}

impl Default for PlannerTuning {
    fn default() -> Self {
        Self {
            start_delay: 0.6,
            tick_dt: REFERENCE_DT,
            horizon: 8.0,
            predictive_friction: 0.985,
            predictive_bounce: 0.5,
            waypoint_reach: 1.5,
            progress_threshold: 0.5,
            no_progress_limit: 3,
            waypoint_heavy_no_progress_limit: 5,
            waypoint_heavy_count: 3,
            min_power: 0.15,
            full_power_distance: 30.0,
            short_distance: 3.0,
            short_distance_factor: 0.7,
            field_alignment: 0.5,
            field_power_step: 0.1,
            failed_direction_cos: 0.95,
            failed_power_tolerance: 0.1,
            immediate_hit_time: 0.15,
            sight_step: 0.5,
            seed: 0x5eed_601f,
        }
    }
}

/// Out-of-bounds and hazard monitoring
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorTuning {
    pub margin: f32,
    pub grace: f32,
    pub kill_depth: f32,
    pub penalty_strokes: u32,
}

impl Default for MonitorTuning {
    fn default() -> Self {
        Self {
            margin: BOUNDS_MARGIN,
            grace: BOUNDS_GRACE,
            kill_depth: KILL_DEPTH,
            penalty_strokes: PENALTY_STROKES,
        }
    }
}

/// Complete tuning set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub physics: PhysicsTuning,
    pub planner: PlannerTuning,
    pub monitor: MonitorTuning,
}

impl Settings {
    /// Parse settings from JSON, then sanitize
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let mut settings: Settings = serde_json::from_str(json)?;
        settings.validate();
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Clamp values that would break the physical contracts
    pub fn validate(&mut self) {
        let p = &mut self.physics;
        if !(0.0..1.0).contains(&p.bounce_damping) {
            log::warn!("bounce_damping {} must be in [0, 1), using default", p.bounce_damping);
            p.bounce_damping = BOUNCE_DAMPING;
        }
        if !(0.0..1.0).contains(&p.blade_damping) {
            log::warn!("blade_damping {} must be in [0, 1), using default", p.blade_damping);
            p.blade_damping = BLADE_DAMPING;
        }
        if p.bumper_gain < 1.0 {
            log::warn!("bumper_gain {} below 1, using default", p.bumper_gain);
            p.bumper_gain = BUMPER_GAIN;
        }
        if p.substep_fraction <= 0.0 || p.substep_fraction > 1.0 {
            log::warn!("substep_fraction {} out of range, using default", p.substep_fraction);
            p.substep_fraction = SUBSTEP_FRACTION;
        }
        p.max_substeps = p.max_substeps.max(1);
        p.max_frame_dt = p.max_frame_dt.max(REFERENCE_DT);

        let a = &mut self.planner;
        if a.tick_dt <= 0.0 {
            a.tick_dt = REFERENCE_DT;
        }
        if a.horizon <= 0.0 {
            log::warn!("planner horizon must be positive, using default");
            a.horizon = PlannerTuning::default().horizon;
        }
        a.predictive_friction = a.predictive_friction.clamp(0.0, 1.0);
        a.min_power = a.min_power.clamp(MIN_SHOT_POWER, 1.0);

        let m = &mut self.monitor;
        m.grace = m.grace.max(0.0);
        m.margin = m.margin.max(0.0);
    }
}
