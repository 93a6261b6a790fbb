//! Core engine for the Highlander simulator.
//!
//! A population of immortals fight each other concurrently. Each immortal
//! runs on its own worker task; every fight locks both combatants' health
//! and moves `damage` from the defender while returning half of it to the
//! attacker. Because each fight destroys a known amount of health, the
//! total is predictable from the fight count, and any drift exposes a
//! concurrency bug.
//!
//! # Modules
//!
//! - [`immortal`] -- A combatant with lock-guarded health and a stop flag
//! - [`fight`] -- Ordered and naive lock-acquisition strategies
//! - [`gate`] -- Pause/resume barrier shared by all workers
//! - [`scoreboard`] -- Atomic count of landed fights
//! - [`population`] -- Shared membership, opponent sampling, dead removal
//! - [`worker`] -- The per-immortal loop
//! - [`manager`] -- Run lifecycle: start, pause, quiesce, stop, reads
//! - [`audit`] -- Total-health invariant check
//! - [`config`] -- YAML configuration with environment overrides

pub mod audit;
pub mod config;
pub mod fight;
pub mod gate;
pub mod immortal;
pub mod manager;
pub mod population;
pub mod scoreboard;
pub mod worker;

pub use audit::{HealthAudit, Overshoot, TolerancePolicy, audit_population};
pub use config::{ConfigError, HighlanderConfig};
pub use fight::{FightOutcome, SkipReason};
pub use gate::PauseGate;
pub use immortal::Immortal;
pub use manager::{ManagerError, SimulationManager, StopReport};
pub use population::Population;
pub use scoreboard::ScoreBoard;
pub use worker::{Worker, WorkerPacing, WorkerSummary};
