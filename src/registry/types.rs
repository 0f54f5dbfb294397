//! Registry configuration and bookkeeping types.

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;

/// Configuration for an [`ObserverManager`](super::ObserverManager).
#[derive(Clone, Debug)]
pub struct ManagerConfig {
    /// Label attached to every diagnostic record.
    /// Default: "observers"
    pub name: String,

    /// Runtime that liveness probes are spawned on.
    /// None = the runtime current at construction, or at sweep time.
    pub runtime: Option<Handle>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            name: "observers".to_string(),
            runtime: None,
        }
    }
}

impl ManagerConfig {
    /// Default configuration with a custom diagnostic label.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Why an observer left the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    /// Explicitly removed by the subject.
    Removed,
    /// Dropped by a bulk clear.
    Cleared,
    /// A liveness probe failed.
    Unreachable,
    /// A delivery action failed.
    DeliveryFailed,
}

impl RemovalReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemovalReason::Removed => "removed",
            RemovalReason::Cleared => "cleared",
            RemovalReason::Unreachable => "unreachable",
            RemovalReason::DeliveryFailed => "delivery_failed",
        }
    }
}

/// Outcome of a completed liveness sweep.
///
/// Carries counts only. A sweep never fails, even when every probe does.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepSummary {
    /// Probes dispatched.
    pub probed: usize,
    /// Probes that succeeded.
    pub reachable: usize,
    /// Probes that failed; their observers were pruned.
    pub pruned: usize,
    /// Probe tasks that never reported back (runtime shut down first).
    pub abandoned: usize,
    /// Observers never probed because no runtime was available.
    pub skipped: usize,
}

/// Result of one probe task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ProbeOutcome {
    Reachable,
    Pruned,
}
