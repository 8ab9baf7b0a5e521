//! Deterministic ball simulation
//!
//! All course physics lives here. This module must stay pure and deterministic:
//! - Caller-supplied frame time, internally substepped
//! - No randomness
//! - Fixed collider resolution order
//! - No rendering or platform dependencies

pub mod collision;
pub mod course;
pub mod forces;
pub mod integrator;
pub mod monitor;
pub mod state;
pub mod tick;

pub use collision::{
    Collider, ColliderKind, CollisionOutcome, Contact, colliders, reflect_velocity, resolve,
    resolve_blades,
};
pub use course::{
    Aabb, Bumper, CourseGeometry, CustomWall, Fan, Hazard, HoleTarget, MagneticField,
    OrientedWall, PlaneBarrier, PlayBounds, WindZone,
};
pub use forces::{ForceProvider, total_acceleration};
pub use integrator::{Friction, IntegrationResult, MotionProfile};
pub use monitor::BoundsMonitor;
pub use state::{
    ActiveEffects, BallState, HolePhase, HoleState, Impact, ImpactSink, MagnetPull,
    ShotCandidate, SimEvent,
};
pub use tick::{FrameReport, StepReport, TickInput, physics_step, step_frame, substep_count, tick};
