//! Operator API server for the Highlander simulator.
//!
//! This crate provides an Axum HTTP server that replaces the original
//! desktop control panel:
//!
//! - **Operator endpoints** to start, pause, resume, and stop a run and
//!   to remove dead immortals
//! - **Audit endpoints** that pause the run, wait for workers to park,
//!   and check the total-health invariant, as JSON or as a text frame
//! - **Read endpoints** for run status and the immortal roster
//!
//! # Architecture
//!
//! [`AppState`] owns at most one [`SimulationManager`] at a time. Reads
//! that touch health locks are bounded by the configured report timeout,
//! so a naive run stuck in a lock cycle answers 503 instead of hanging
//! the request.
//!
//! [`SimulationManager`]: highlander_core::SimulationManager

pub mod error;
pub mod handlers;
pub mod operator;
pub mod report;
pub mod router;
pub mod server;
pub mod state;

// Re-export primary types for convenience.
pub use error::ObserverError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
