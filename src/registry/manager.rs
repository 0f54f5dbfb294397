//! Observer manager: registration, liveness sweeps and broadcast delivery.

use crate::error::Result;
use crate::observer::{Observer, ProbeError};
use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::runtime::Handle;

use super::set::{ObserverSet, Snapshot};
use super::sweep::SweepHandle;
use super::types::{ManagerConfig, ProbeOutcome, RemovalReason};

struct Inner<O: Observer> {
    observers: ObserverSet<O>,
    config: ManagerConfig,
    /// Runtime current at construction, last resort for sweeps.
    captured: Option<Handle>,
}

impl<O: Observer> Inner<O> {
    /// Failure-driven removal. Idempotent: losing a race to another remover
    /// is silent.
    fn prune(&self, id: &O::Id, reason: RemovalReason, error: &dyn fmt::Display) {
        if self.observers.remove_id(id).is_some() {
            tracing::debug!(
                registry = %self.config.name,
                observer = ?id,
                reason = reason.as_str(),
                error = %error,
                "removing observer"
            );
        }
    }
}

/// Registry of remote observers owned by a single subject.
///
/// Clones share the same registry. All operations are safe to call from any
/// number of threads without external locking.
pub struct ObserverManager<O: Observer> {
    inner: Arc<Inner<O>>,
}

impl<O: Observer> Clone for ObserverManager<O> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<O: Observer> ObserverManager<O> {
    /// Create a manager with default configuration.
    pub fn new() -> Self {
        Self::with_config(ManagerConfig::default())
    }

    /// Create a manager with custom configuration.
    ///
    /// Without an explicit runtime, sweeps run on the runtime current at
    /// `cleanup` time, falling back to the one current at construction.
    pub fn with_config(config: ManagerConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                observers: ObserverSet::new(),
                config,
                captured: Handle::try_current().ok(),
            }),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.inner.config
    }

    // --- Membership ---

    /// Register an observer.
    ///
    /// Re-adding an identity that is already registered is a no-op.
    pub fn add(&self, observer: O) -> Result<()> {
        observer.validate()?;

        if self.inner.observers.insert(observer) {
            tracing::trace!(
                registry = %self.inner.config.name,
                observers = self.inner.observers.len(),
                "observer added"
            );
        }
        Ok(())
    }

    /// Unregister an observer. Absent observers are ignored.
    pub fn remove(&self, observer: &O) {
        let id = observer.id();
        self.remove_id(&id);
    }

    /// Unregister by identity. Absent identities are ignored.
    pub fn remove_id(&self, id: &O::Id) {
        if self.inner.observers.remove_id(id).is_some() {
            tracing::trace!(
                registry = %self.inner.config.name,
                observer = ?id,
                reason = RemovalReason::Removed.as_str(),
                "removing observer"
            );
        }
    }

    /// Unregister everything.
    pub fn clear(&self) {
        let count = self.inner.observers.clear();
        if count > 0 {
            tracing::trace!(
                registry = %self.inner.config.name,
                count,
                reason = RemovalReason::Cleared.as_str(),
                "removing observers"
            );
        }
    }

    pub fn contains(&self, observer: &O) -> bool {
        self.inner.observers.contains(observer)
    }

    pub fn len(&self) -> usize {
        self.inner.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.observers.is_empty()
    }

    /// Point-in-time view of the registered observers.
    pub fn snapshot(&self) -> Snapshot<O> {
        self.inner.observers.snapshot()
    }

    // --- Liveness ---

    /// Probe every registered observer and remove the ones that fail.
    ///
    /// Probes are dispatched in parallel and this returns immediately. Some
    /// probes may take a long time, e.g. when the host holding the observer
    /// has left the cluster. The registry tolerates concurrent modification,
    /// so awaiting the returned handle is only needed when the caller wants
    /// the sweep to be over.
    ///
    /// With no tokio runtime reachable, nothing is probed: the handle is
    /// already finished and reports every observer as skipped.
    pub fn cleanup(&self) -> SweepHandle {
        let snapshot = self.inner.observers.snapshot();
        if snapshot.is_empty() {
            return SweepHandle::empty();
        }

        let runtime = match self.runtime() {
            Some(runtime) => runtime,
            None => {
                tracing::warn!(
                    registry = %self.inner.config.name,
                    observers = snapshot.len(),
                    "no tokio runtime available, skipping liveness sweep"
                );
                return SweepHandle::unprobed(snapshot.len());
            }
        };

        tracing::trace!(
            registry = %self.inner.config.name,
            observers = snapshot.len(),
            "dispatching liveness probes"
        );

        let tasks = snapshot
            .into_iter()
            .map(|observer| {
                let inner = Arc::clone(&self.inner);
                runtime.spawn(async move {
                    let id = observer.id();
                    // Runs alongside notify and other sweeps; pruning is idempotent.
                    let result = AssertUnwindSafe(async { observer.probe().await })
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|payload| Err(ProbeError::Remote(panic_message(&*payload))));

                    match result {
                        Ok(()) => ProbeOutcome::Reachable,
                        Err(err) => {
                            inner.prune(&id, RemovalReason::Unreachable, &err);
                            ProbeOutcome::Pruned
                        }
                    }
                })
            })
            .collect();

        SweepHandle::new(tasks)
    }

    fn runtime(&self) -> Option<Handle> {
        self.inner
            .config
            .runtime
            .clone()
            .or_else(|| Handle::try_current().ok())
            .or_else(|| self.inner.captured.clone())
    }

    // --- Broadcasting ---

    /// Deliver to every registered observer, dropping the ones that fail.
    ///
    /// An `Err` or a panic from `action` marks that observer as failed and
    /// delivery continues with the next one. Failed observers are removed in
    /// one batch after the pass.
    pub fn notify<F, E>(&self, mut action: F)
    where
        F: FnMut(&O) -> std::result::Result<(), E>,
        E: fmt::Display,
    {
        let snapshot = self.inner.observers.snapshot();
        let mut failed = Vec::new();

        for observer in &snapshot {
            let error = match panic::catch_unwind(AssertUnwindSafe(|| action(observer))) {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => err.to_string(),
                Err(payload) => format!("delivery panicked: {}", panic_message(&*payload)),
            };

            let id = observer.id();
            tracing::debug!(
                registry = %self.inner.config.name,
                observer = ?id,
                error = %error,
                "removing observer due to delivery failure"
            );
            failed.push(id);
        }

        if !failed.is_empty() {
            let removed = self.inner.observers.remove_all(failed);
            tracing::trace!(
                registry = %self.inner.config.name,
                count = removed.len(),
                reason = RemovalReason::DeliveryFailed.as_str(),
                "removing observers"
            );
        }
    }

    /// Like [`notify`](Self::notify) for actions that cannot return an
    /// error. Only a panic counts as a failed delivery.
    pub fn notify_all<F>(&self, mut action: F)
    where
        F: FnMut(&O),
    {
        self.notify(|observer| {
            action(observer);
            Ok::<(), std::convert::Infallible>(())
        });
    }
}

impl<O: Observer> Default for ObserverManager<O> {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
