//! Identifier types.
//!
//! [`ImmortalName`] is the totally ordered identity the ordered fight
//! strategy sorts lock acquisitions by, so it must never be mixed up with
//! arbitrary strings. [`RunId`] tags one simulation run (UUID v7, so run
//! ids sort by start time).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique, totally ordered name of an immortal.
///
/// Ordering is plain lexical ordering of the underlying string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImmortalName(String);

impl ImmortalName {
    /// Wrap a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Build the generated name for the immortal at `index`.
    ///
    /// The index is zero-padded to the number of digits needed for
    /// `count - 1`, so lexical order matches creation order.
    pub fn numbered(index: usize, count: usize) -> Self {
        let width = count.saturating_sub(1).to_string().len();
        Self(format!("im-{index:0width$}"))
    }

    /// Borrow the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ImmortalName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for ImmortalName {
    fn from(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl From<String> for ImmortalName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Identifier of one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Create a new identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Return the inner [`Uuid`] value.
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for RunId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}
