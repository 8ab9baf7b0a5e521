//! Autonomous player
//!
//! Chooses shots by forward-simulating candidates with the same physics
//! step the live ball uses, configured for coarse prediction.

pub mod candidates;
pub mod planner;
pub mod predict;

pub use planner::{AgentPhase, PlannerState, ScoredCandidate, ShotPlanner, ShotSource};
pub use predict::{SimulationResult, Terminal, score, simulate_shot};
