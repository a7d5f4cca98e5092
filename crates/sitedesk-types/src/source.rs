//! Dashboard data-source descriptors.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::time::Duration;

/// Identifier of an independently fetchable dashboard source
/// (e.g. "visitor-stats", "active-visitors", "messages").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId(pub String);

impl SourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Refresh cadence of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    /// Fetched by the initial load only.
    Once,
    /// Re-fetched on a fixed period after the initial load.
    Every(PollPeriod),
}

impl Refresh {
    /// Poll every `period`. A zero period means fetch-once.
    pub fn every(period: Duration) -> Self {
        PollPeriod::new(period).map_or(Refresh::Once, Refresh::Every)
    }

    /// Build a cadence from an optional number of seconds. `None` and `0`
    /// both mean fetch-once.
    pub fn from_secs(secs: Option<u64>) -> Self {
        secs.map_or(Refresh::Once, |s| Refresh::every(Duration::from_secs(s)))
    }

    pub fn interval(&self) -> Option<Duration> {
        match self {
            Refresh::Once => None,
            Refresh::Every(period) => Some(period.get()),
        }
    }
}

/// A polling period, never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPeriod(Duration);

impl PollPeriod {
    pub fn new(period: Duration) -> Option<Self> {
        (!period.is_zero()).then_some(Self(period))
    }

    pub fn get(self) -> Duration {
        self.0
    }
}

impl fmt::Display for Refresh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Refresh::Once => write!(f, "once"),
            Refresh::Every(period) => write!(f, "every {}s", period.get().as_secs()),
        }
    }
}

/// Whether an initial-load failure of a source degrades the whole view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criticality {
    Critical,
    Optional,
}

/// Which stage of a view's lifetime produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadPhase {
    /// The aggregate load that runs when the view mounts.
    Initial,
    /// A background poll or manual refresh after mounting.
    Poll,
}

impl fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadPhase::Initial => write!(f, "initial"),
            LoadPhase::Poll => write!(f, "poll"),
        }
    }
}
