//! Configuration loading and typed config structures for the simulator.
//!
//! The canonical configuration lives in `highlander-config.yaml` at the
//! project root. Every field has a default, so an empty file (or no file
//! at all) yields a working setup: 8 immortals, ordered fights, 100 health,
//! 10 damage, operator API on port 8080.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use highlander_types::{FightStrategy, SimulationParams};

use crate::audit::TolerancePolicy;
use crate::worker::WorkerPacing;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration. Mirrors `highlander-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HighlanderConfig {
    /// Default start parameters.
    #[serde(default)]
    pub simulation: SimulationSection,

    /// Worker pacing.
    #[serde(default)]
    pub worker: WorkerSection,

    /// Operator timeouts and report limits.
    #[serde(default)]
    pub operator: OperatorSection,

    /// Invariant tolerance.
    #[serde(default)]
    pub audit: AuditSection,

    /// Operator API bind address.
    #[serde(default)]
    pub server: ServerSection,

    /// Log filter and format.
    #[serde(default)]
    pub logging: LoggingSection,
}

impl HighlanderConfig {
    /// Load configuration from a YAML file, then apply environment overrides.
    ///
    /// Environment variables:
    /// - `HIGHLANDER_COUNT` overrides `simulation.count`
    /// - `HIGHLANDER_FIGHT` overrides `simulation.strategy`
    /// - `HIGHLANDER_PORT` overrides `server.port`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string. No environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply `HIGHLANDER_*` environment overrides from the process env.
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_with(|key| std::env::var(key).ok());
    }

    /// Apply overrides using `lookup` as the environment.
    ///
    /// Values that do not parse are ignored with a warning, like the
    /// original `-Dcount` / `-Dfight` handling.
    pub fn apply_env_overrides_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup("HIGHLANDER_COUNT") {
            match raw.trim().parse::<usize>() {
                Ok(count) => self.simulation.count = count,
                Err(e) => tracing::warn!(value = %raw, error = %e, "Ignoring HIGHLANDER_COUNT"),
            }
        }
        if let Some(raw) = lookup("HIGHLANDER_FIGHT") {
            match raw.parse::<FightStrategy>() {
                Ok(strategy) => self.simulation.strategy = strategy,
                Err(e) => tracing::warn!(error = %e, "Ignoring HIGHLANDER_FIGHT"),
            }
        }
        if let Some(raw) = lookup("HIGHLANDER_PORT") {
            match raw.trim().parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(e) => tracing::warn!(value = %raw, error = %e, "Ignoring HIGHLANDER_PORT"),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Default start parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationSection {
    /// Number of immortals.
    #[serde(default = "default_count")]
    pub count: usize,

    /// `ordered` or `naive`.
    #[serde(default)]
    pub strategy: FightStrategy,

    /// Starting health of every immortal.
    #[serde(default = "default_initial_health")]
    pub initial_health: i64,

    /// Damage per landed hit.
    #[serde(default = "default_damage")]
    pub damage: i64,

    /// Start a run as soon as the engine boots.
    #[serde(default)]
    pub autostart: bool,
}

impl SimulationSection {
    /// Start parameters built from this section.
    pub const fn params(&self) -> SimulationParams {
        SimulationParams {
            count: self.count,
            strategy: self.strategy,
            initial_health: self.initial_health,
            damage: self.damage,
        }
    }
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            count: default_count(),
            strategy: FightStrategy::default(),
            initial_health: default_initial_health(),
            damage: default_damage(),
            autostart: false,
        }
    }
}

/// Worker pacing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorkerSection {
    /// Sleep after every worker iteration, in milliseconds.
    #[serde(default = "default_yield_interval_ms")]
    pub yield_interval_ms: u64,

    /// Sleep between the first and second lock of a fight. `0` disables it.
    #[serde(default)]
    pub lock_handoff_ms: u64,
}

impl WorkerSection {
    /// Pacing built from this section.
    pub const fn pacing(&self) -> WorkerPacing {
        WorkerPacing {
            yield_interval: Duration::from_millis(self.yield_interval_ms),
            lock_handoff: if self.lock_handoff_ms == 0 {
                None
            } else {
                Some(Duration::from_millis(self.lock_handoff_ms))
            },
        }
    }
}

impl Default for WorkerSection {
    fn default() -> Self {
        Self {
            yield_interval_ms: default_yield_interval_ms(),
            lock_handoff_ms: 0,
        }
    }
}

/// Operator timeouts and report limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OperatorSection {
    /// How long check/report/remove-dead wait for workers to park.
    #[serde(default = "default_settle_timeout_ms")]
    pub settle_timeout_ms: u64,

    /// How long stop waits for workers to return.
    #[serde(default = "default_stop_grace_ms")]
    pub stop_grace_ms: u64,

    /// How long a report waits for health locks before giving up.
    #[serde(default = "default_report_timeout_ms")]
    pub report_timeout_ms: u64,

    /// Largest population whose members are listed individually in reports.
    #[serde(default = "default_show_individual_limit")]
    pub show_individual_limit: usize,
}

impl OperatorSection {
    /// Settle timeout as a [`Duration`].
    pub const fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_timeout_ms)
    }

    /// Stop grace period as a [`Duration`].
    pub const fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    /// Report lock timeout as a [`Duration`].
    pub const fn report_timeout(&self) -> Duration {
        Duration::from_millis(self.report_timeout_ms)
    }
}

impl Default for OperatorSection {
    fn default() -> Self {
        Self {
            settle_timeout_ms: default_settle_timeout_ms(),
            stop_grace_ms: default_stop_grace_ms(),
            report_timeout_ms: default_report_timeout_ms(),
            show_individual_limit: default_show_individual_limit(),
        }
    }
}

/// Invariant tolerance.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuditSection {
    /// Multiplier applied to damage.
    #[serde(default = "default_damage_multiplier")]
    pub damage_multiplier: i64,

    /// Divisor applied to the initial population size.
    #[serde(default = "default_population_divisor")]
    pub population_divisor: i64,
}

impl AuditSection {
    /// Tolerance policy built from this section.
    pub const fn policy(&self) -> TolerancePolicy {
        TolerancePolicy {
            damage_multiplier: self.damage_multiplier,
            population_divisor: self.population_divisor,
        }
    }
}

impl Default for AuditSection {
    fn default() -> Self {
        Self {
            damage_multiplier: default_damage_multiplier(),
            population_divisor: default_population_divisor(),
        }
    }
}

/// Operator API bind address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSection {
    /// Host to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Log filter and format.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingSection {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

const fn default_count() -> usize {
    8
}

const fn default_initial_health() -> i64 {
    100
}

const fn default_damage() -> i64 {
    10
}

const fn default_yield_interval_ms() -> u64 {
    2
}

const fn default_settle_timeout_ms() -> u64 {
    250
}

const fn default_stop_grace_ms() -> u64 {
    500
}

const fn default_report_timeout_ms() -> u64 {
    1_000
}

const fn default_show_individual_limit() -> usize {
    50
}

const fn default_damage_multiplier() -> i64 {
    2
}

const fn default_population_divisor() -> i64 {
    10
}

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn default_config_matches_documented_values() {
        let config = HighlanderConfig::default();
        assert_eq!(config.simulation.params(), SimulationParams::default());
        assert!(!config.simulation.autostart);
        assert_eq!(config.worker.pacing(), WorkerPacing::default());
        assert_eq!(config.operator.settle_timeout(), Duration::from_millis(250));
        assert_eq!(config.operator.show_individual_limit, 50);
        assert_eq!(config.audit.policy(), TolerancePolicy::default());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
simulation:
  count: 1000
  strategy: naive
  initial_health: 500
  damage: 25
  autostart: true

worker:
  yield_interval_ms: 0
  lock_handoff_ms: 3

operator:
  settle_timeout_ms: 100
  stop_grace_ms: 200
  report_timeout_ms: 300
  show_individual_limit: 10

audit:
  damage_multiplier: 4
  population_divisor: 5

server:
  host: "127.0.0.1"
  port: 9090

logging:
  level: "debug"
  json: true
"#;

        let config = HighlanderConfig::parse(yaml);
        assert!(config.is_ok(), "{config:?}");
        let config = config.ok().unwrap_or_default();

        assert_eq!(config.simulation.count, 1_000);
        assert_eq!(config.simulation.strategy, FightStrategy::Naive);
        assert!(config.simulation.autostart);
        assert_eq!(
            config.worker.pacing(),
            WorkerPacing {
                yield_interval: Duration::ZERO,
                lock_handoff: Some(Duration::from_millis(3)),
            }
        );
        assert_eq!(config.operator.stop_grace(), Duration::from_millis(200));
        assert_eq!(config.operator.report_timeout(), Duration::from_millis(300));
        assert_eq!(config.audit.damage_multiplier, 4);
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(config.logging.json);
    }

    #[test]
    fn parse_minimal_yaml() {
        let config = HighlanderConfig::parse("simulation:\n  count: 3\n");
        assert!(config.is_ok());
        let config = config.ok().unwrap_or_default();

        assert_eq!(config.simulation.count, 3);
        assert_eq!(config.simulation.damage, 10);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn parse_empty_yaml() {
        let config = HighlanderConfig::parse("");
        assert!(config.is_ok());
        assert_eq!(config.ok(), Some(HighlanderConfig::default()));
    }

    #[test]
    fn mixed_case_strategy_parses() {
        let config = HighlanderConfig::parse("simulation:\n  strategy: NAIVE\n");
        assert!(config.is_ok_and(|c| c.simulation.strategy == FightStrategy::Naive));

        let config = HighlanderConfig::parse("simulation:\n  strategy: Ordered\n");
        assert!(config.is_ok_and(|c| c.simulation.strategy == FightStrategy::Ordered));
    }

    #[test]
    fn unknown_strategy_is_a_yaml_error() {
        let config = HighlanderConfig::parse("simulation:\n  strategy: chaotic\n");
        assert!(matches!(config, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn env_overrides_apply() {
        let env: BTreeMap<&str, &str> = [
            ("HIGHLANDER_COUNT", "42"),
            ("HIGHLANDER_FIGHT", "NAIVE"),
            ("HIGHLANDER_PORT", "7070"),
        ]
        .into_iter()
        .collect();

        let mut config = HighlanderConfig::default();
        config.apply_env_overrides_with(|key| env.get(key).map(|v| (*v).to_owned()));

        assert_eq!(config.simulation.count, 42);
        assert_eq!(config.simulation.strategy, FightStrategy::Naive);
        assert_eq!(config.server.port, 7070);
    }

    #[test]
    fn malformed_env_overrides_are_ignored() {
        let env: BTreeMap<&str, &str> = [
            ("HIGHLANDER_COUNT", "many"),
            ("HIGHLANDER_FIGHT", "chaotic"),
            ("HIGHLANDER_PORT", "99999"),
        ]
        .into_iter()
        .collect();

        let mut config = HighlanderConfig::default();
        config.apply_env_overrides_with(|key| env.get(key).map(|v| (*v).to_owned()));

        assert_eq!(config, HighlanderConfig::default());
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("highlander-config.yaml");
        if path.exists() {
            let config = HighlanderConfig::parse(&std::fs::read_to_string(&path).unwrap_or_default());
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}
