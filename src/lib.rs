//! # Observer Registry
//!
//! A concurrent registry of remote observers for a notifying subject.
//!
//! ## Core Concepts
//!
//! - **Observers**: Identity-bearing handles to remote subscribers that can be probed
//! - **Registry**: A concurrent identity set, safe to mutate while being iterated
//! - **Sweeps**: Parallel, fire-and-forget liveness probes that prune unreachable observers
//! - **Broadcasts**: Best-effort delivery where one failing observer never affects the rest
//!
//! ## Example
//!
//! ```ignore
//! use observer_registry::{ObserverManager, ManagerConfig};
//!
//! let observers = ObserverManager::with_config(ManagerConfig::named("chat-room"));
//! observers.add(peer)?;
//!
//! observers.notify(|peer| peer.deliver(&message));
//!
//! let summary = observers.cleanup().await;
//! println!("pruned {} observers", summary.pruned);
//! ```

pub mod error;
pub mod observer;
pub mod registry;

// Re-exports
pub use error::{RegistryError, Result};
pub use observer::{InvalidObserver, Observer, ProbeError, ProbeFuture};
pub use registry::{
    ManagerConfig, ObserverManager, ObserverSet, RemovalReason, Snapshot, SweepHandle,
    SweepSummary,
};
