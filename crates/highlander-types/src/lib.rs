//! Shared type definitions for the Highlander simulator.
//!
//! This crate holds the value types that cross crate boundaries: the
//! engine in `highlander-core` produces them and the operator API in
//! `highlander-observer` serializes them.
//!
//! # Modules
//!
//! - [`ids`] -- Immortal names and simulation run identifiers
//! - [`enums`] -- Fight strategies, pause gate states, invariant status
//! - [`structs`] -- Snapshots, start parameters, and status reports

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{FightStrategy, GateState, InvariantStatus, ParseStrategyError};
pub use ids::{ImmortalName, RunId};
pub use structs::{ImmortalSnapshot, SimulationParams, SimulationStatus};
