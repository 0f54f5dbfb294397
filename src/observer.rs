//! The capability contract an observer reference must provide.
//!
//! Observer references come from an identity/transport layer outside this
//! crate. The registry only needs three things from them: a stable identity,
//! a structural validity check, and a reachability probe.

use futures::future::BoxFuture;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;
use thiserror::Error;

/// Future returned by [`Observer::probe`].
pub type ProbeFuture = BoxFuture<'static, Result<(), ProbeError>>;

/// Why an observer was rejected at add time.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InvalidObserver {
    /// The reference is absent or its identity is empty.
    #[error("observer must not be empty")]
    Missing,

    /// The value is not an invocable, identity-bearing reference.
    #[error("was expecting a reference: {0}")]
    NotAReference(String),
}

/// Why a reachability probe failed.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("observer unreachable: {0}")]
    Unreachable(String),

    #[error("remote error: {0}")]
    Remote(String),
}

/// A handle to a remote subscriber.
///
/// Equality and hashing inside the registry are derived from [`Observer::id`],
/// so two handles denoting the same endpoint collapse into one entry no
/// matter how they were obtained.
pub trait Observer: Clone + Send + Sync + 'static {
    /// Stable identity of the remote endpoint.
    type Id: Eq + Hash + Clone + Debug + Send + Sync + 'static;

    /// Returns the identity of this reference.
    fn id(&self) -> Self::Id;

    /// Checks that this is a legitimate, invocable reference.
    fn validate(&self) -> Result<(), InvalidObserver> {
        Ok(())
    }

    /// Issues a reachability check.
    ///
    /// Timeouts and retries are the transport's business; the registry only
    /// reacts to the outcome.
    fn probe(&self) -> ProbeFuture;
}
