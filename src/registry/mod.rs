//! Observer registry with liveness sweeps and broadcast delivery.
//!
//! The registry holds remote observer references keyed by identity. Two
//! protocols keep it honest:
//! - Liveness sweeps probe every observer in parallel and prune failures
//! - Broadcasts deliver to every observer and prune the ones that fail
//!
//! Both run against the same set and may overlap with each other and with
//! plain add/remove calls.
//!
//! # Example
//!
//! ```ignore
//! let observers = ObserverManager::new();
//! observers.add(peer)?;
//!
//! // Deliver an event; failing peers are dropped after the pass
//! observers.notify(|peer| peer.send(&event));
//!
//! // Periodically: fire and forget
//! let _ = observers.cleanup();
//! ```

mod manager;
mod set;
mod sweep;
mod types;

pub use manager::ObserverManager;
pub use set::{ObserverSet, Snapshot};
pub use sweep::SweepHandle;
pub use types::{ManagerConfig, RemovalReason, SweepSummary};
