//! Enumeration types for the Highlander simulator.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Fight strategy
// ---------------------------------------------------------------------------

/// Lock-acquisition policy used when executing a fight.
///
/// Both strategies apply the same fight rule; they differ only in the
/// order the two entity locks are taken.
///
/// Serializes as the lowercase name and deserializes through [`str::parse`],
/// so configuration files accept any case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum FightStrategy {
    /// Lock the entity with the smaller name first. Deadlock-free.
    #[default]
    Ordered,
    /// Lock the attacker first, then the defender. Can deadlock when two
    /// immortals target each other at the same time.
    Naive,
}

impl FightStrategy {
    /// The lowercase name accepted by [`str::parse`].
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ordered => "ordered",
            Self::Naive => "naive",
        }
    }
}

impl core::fmt::Display for FightStrategy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a strategy name is neither `ordered` nor `naive`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown fight strategy '{0}' (expected 'ordered' or 'naive')")]
pub struct ParseStrategyError(pub String);

impl core::str::FromStr for FightStrategy {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("ordered") {
            Ok(Self::Ordered)
        } else if trimmed.eq_ignore_ascii_case("naive") {
            Ok(Self::Naive)
        } else {
            Err(ParseStrategyError(s.to_owned()))
        }
    }
}

impl TryFrom<String> for FightStrategy {
    type Error = ParseStrategyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ---------------------------------------------------------------------------
// Pause gate
// ---------------------------------------------------------------------------

/// State of the process-wide pause gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateState {
    /// Workers pass the gate without waiting.
    #[default]
    Running,
    /// Workers suspend at the gate until resumed.
    Paused,
}

// ---------------------------------------------------------------------------
// Invariant
// ---------------------------------------------------------------------------

/// Outcome of comparing observed total health with the expected total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvariantStatus {
    /// The difference is within tolerance.
    Ok,
    /// The difference exceeds tolerance.
    Violated,
}

impl InvariantStatus {
    /// Returns `true` for [`InvariantStatus::Ok`].
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}
