//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during startup and serving.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: highlander_core::ConfigError,
    },

    /// The autostarted simulation was rejected.
    #[error("simulation error: {source}")]
    Simulation {
        /// The underlying manager error.
        #[from]
        source: highlander_core::ManagerError,
    },

    /// Operator API server failed.
    #[error("operator API error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: highlander_observer::ServerError,
    },
}
