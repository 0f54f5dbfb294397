//! Completion handle for a liveness sweep.

use super::types::{ProbeOutcome, SweepSummary};
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use std::future::IntoFuture;
use tokio::task::JoinHandle;

/// Observe-only handle over the probes dispatched by one sweep.
///
/// Probes run on spawned tasks and prune on their own. Dropping the handle
/// detaches them; it never cancels a probe.
#[must_use = "a sweep runs without its handle, but the summary is only available through it"]
#[derive(Debug)]
pub struct SweepHandle {
    tasks: Vec<JoinHandle<ProbeOutcome>>,
    skipped: usize,
}

impl SweepHandle {
    pub(crate) fn new(tasks: Vec<JoinHandle<ProbeOutcome>>) -> Self {
        Self { tasks, skipped: 0 }
    }

    /// A sweep that dispatched nothing.
    pub(crate) fn empty() -> Self {
        Self::unprobed(0)
    }

    /// A sweep that could not dispatch its probes.
    pub(crate) fn unprobed(count: usize) -> Self {
        Self {
            tasks: Vec::new(),
            skipped: count,
        }
    }

    /// Number of probes dispatched.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Observers left unprobed because no runtime was available.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// True once every probe has completed.
    pub fn is_finished(&self) -> bool {
        self.tasks.iter().all(JoinHandle::is_finished)
    }

    /// Wait for every probe to complete.
    pub async fn wait(self) -> SweepSummary {
        let mut summary = SweepSummary {
            probed: self.tasks.len(),
            skipped: self.skipped,
            ..Default::default()
        };

        for result in join_all(self.tasks).await {
            match result {
                Ok(ProbeOutcome::Reachable) => summary.reachable += 1,
                Ok(ProbeOutcome::Pruned) => summary.pruned += 1,
                Err(err) => {
                    tracing::debug!(error = %err, "probe task did not complete");
                    summary.abandoned += 1;
                }
            }
        }

        summary
    }
}

impl IntoFuture for SweepHandle {
    type Output = SweepSummary;
    type IntoFuture = BoxFuture<'static, SweepSummary>;

    fn into_future(self) -> Self::IntoFuture {
        self.wait().boxed()
    }
}
