//! End-to-end tests for registration, sweeps and broadcasts.

use futures::FutureExt;
use observer_registry::{ObserverManager, Observer, ProbeError, ProbeFuture, SweepSummary};
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Remote peer whose probe waits for a gate to open before answering.
#[derive(Clone, Debug)]
struct GatedPeer {
    id: String,
    reachable: bool,
    gate: watch::Receiver<bool>,
    probes: Arc<AtomicUsize>,
}

impl GatedPeer {
    fn new(id: &str, reachable: bool, gate: &watch::Receiver<bool>) -> Self {
        Self {
            id: id.to_string(),
            reachable,
            gate: gate.clone(),
            probes: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Observer for GatedPeer {
    type Id = String;

    fn id(&self) -> String {
        self.id.clone()
    }

    fn probe(&self) -> ProbeFuture {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let mut gate = self.gate.clone();
        let reachable = self.reachable;
        let id = self.id.clone();
        async move {
            gate.wait_for(|open| *open)
                .await
                .map_err(|_| ProbeError::Unreachable(format!("{id}: gate dropped")))?;
            if reachable {
                Ok(())
            } else {
                Err(ProbeError::Timeout(Duration::from_secs(5)))
            }
        }
        .boxed()
    }
}

fn open_gate() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(true)
}

fn ids<O: Observer<Id = String>>(manager: &ObserverManager<O>) -> Vec<String> {
    let mut ids: Vec<_> = manager.snapshot().iter().map(|o| o.id()).collect();
    ids.sort();
    ids
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

// --- Registration ---

#[test]
fn test_readd_leaves_count_unchanged() {
    let (_release, gate) = open_gate();
    let manager = ObserverManager::new();

    manager.add(GatedPeer::new("a", true, &gate)).unwrap();
    manager.add(GatedPeer::new("b", true, &gate)).unwrap();
    manager.add(GatedPeer::new("a", true, &gate)).unwrap();

    assert_eq!(manager.len(), 2);
    assert_eq!(ids(&manager), vec!["a", "b"]);
}

#[test]
fn test_clear_empties_snapshot() {
    let (_release, gate) = open_gate();
    let manager = ObserverManager::new();
    for i in 0..250 {
        manager
            .add(GatedPeer::new(&format!("peer-{i}"), true, &gate))
            .unwrap();
    }

    manager.clear();
    assert!(manager.snapshot().is_empty());
    assert_eq!(manager.snapshot().into_iter().count(), 0);
}

#[test]
fn test_readd_after_removal() {
    let (_release, gate) = open_gate();
    let manager = ObserverManager::new();
    let peer = GatedPeer::new("a", true, &gate);

    manager.add(peer.clone()).unwrap();
    manager.remove(&peer);
    assert!(!manager.contains(&peer));

    manager.add(peer.clone()).unwrap();
    assert!(manager.contains(&peer));
}

proptest! {
    #[test]
    fn prop_registry_matches_set_model(ops in prop::collection::vec((any::<bool>(), 0u8..16), 0..200)) {
        let (_release, gate) = open_gate();
        let manager = ObserverManager::new();
        let mut model = HashSet::new();

        for (add, id) in ops {
            let peer = GatedPeer::new(&id.to_string(), true, &gate);
            if add {
                manager.add(peer).unwrap();
                model.insert(id.to_string());
            } else {
                manager.remove(&peer);
                model.remove(&id.to_string());
            }
        }

        let mut expected: Vec<_> = model.into_iter().collect();
        expected.sort();
        prop_assert_eq!(ids(&manager), expected);
    }
}

// --- Liveness sweeps ---

#[tokio::test]
async fn test_sweep_keeps_only_reachable() {
    let (_release, gate) = open_gate();
    let manager = ObserverManager::new();
    manager.add(GatedPeer::new("a", true, &gate)).unwrap();
    manager.add(GatedPeer::new("b", false, &gate)).unwrap();

    let summary = manager.cleanup().wait().await;

    assert_eq!(
        summary,
        SweepSummary {
            probed: 2,
            reachable: 1,
            pruned: 1,
            abandoned: 0,
            skipped: 0,
        }
    );
    assert_eq!(ids(&manager), vec!["a"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sweep_returns_before_probes_complete() {
    let (release, gate) = watch::channel(false);
    let manager = ObserverManager::new();
    manager.add(GatedPeer::new("a", true, &gate)).unwrap();
    manager.add(GatedPeer::new("b", false, &gate)).unwrap();

    let handle = manager.cleanup();
    assert_eq!(handle.len(), 2);
    assert!(!handle.is_finished());

    // Mutations made while probes are pending must survive the sweep
    manager.add(GatedPeer::new("c", false, &gate)).unwrap();
    assert_eq!(manager.len(), 3);

    release.send(true).unwrap();
    let summary = handle.await;

    assert_eq!(summary.pruned, 1);
    assert_eq!(ids(&manager), vec!["a", "c"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dropped_sweep_handle_still_prunes() {
    let (release, gate) = watch::channel(false);
    let manager = ObserverManager::new();
    manager.add(GatedPeer::new("a", true, &gate)).unwrap();
    manager.add(GatedPeer::new("b", false, &gate)).unwrap();

    drop(manager.cleanup());
    release.send(true).unwrap();

    wait_until(|| manager.len() == 1).await;
    assert_eq!(ids(&manager), vec!["a"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_overlapping_sweeps_are_independent() {
    let (release, gate) = watch::channel(false);
    let manager = ObserverManager::new();
    let flaky = GatedPeer::new("flaky", false, &gate);
    manager.add(flaky.clone()).unwrap();
    manager.add(GatedPeer::new("steady", true, &gate)).unwrap();

    let first = manager.cleanup();
    let second = manager.cleanup();
    release.send(true).unwrap();

    let (first, second) = tokio::join!(first.wait(), second.wait());

    // Both sweeps probed, both saw the failure; removal happened once
    assert_eq!(flaky.probes.load(Ordering::SeqCst), 2);
    assert_eq!(first.pruned + second.pruned, 2);
    assert_eq!(ids(&manager), vec!["steady"]);
}

#[tokio::test]
async fn test_sweep_on_configured_runtime() {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .build()
        .unwrap();

    let (_release, gate) = open_gate();
    let manager = ObserverManager::with_config(observer_registry::ManagerConfig {
        name: "configured".to_string(),
        runtime: Some(runtime.handle().clone()),
    });
    manager.add(GatedPeer::new("a", false, &gate)).unwrap();

    let summary = manager.cleanup().await;
    assert_eq!(summary.pruned, 1);
    assert!(manager.is_empty());

    runtime.shutdown_background();
}

#[test]
fn test_sweep_from_runtime_other_than_construction() {
    let (_release, gate) = open_gate();

    // Built inside a short-lived runtime that is gone before the sweep
    let init = tokio::runtime::Runtime::new().unwrap();
    let manager = init.block_on(async { ObserverManager::new() });
    drop(init);

    manager.add(GatedPeer::new("a", true, &gate)).unwrap();
    manager.add(GatedPeer::new("b", false, &gate)).unwrap();

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let summary = runtime.block_on(async { manager.cleanup().await });

    assert_eq!(summary.probed, 2);
    assert_eq!(summary.pruned, 1);
    assert_eq!(summary.abandoned, 0);
    assert_eq!(ids(&manager), vec!["a"]);
}

// --- Broadcasts ---

#[test]
fn test_broadcast_skips_failing_observer() {
    let (_release, gate) = open_gate();
    let manager = ObserverManager::new();
    for id in ["a", "b", "c"] {
        manager.add(GatedPeer::new(id, true, &gate)).unwrap();
    }

    let mut delivered = Vec::new();
    manager.notify(|peer| {
        if peer.id == "b" {
            return Err(format!("{} went away", peer.id));
        }
        delivered.push(peer.id.clone());
        Ok(())
    });

    delivered.sort();
    assert_eq!(delivered, vec!["a", "c"]);
    assert_eq!(ids(&manager), vec!["a", "c"]);
}

#[test]
fn test_broadcast_delivers_once_each() {
    let (_release, gate) = open_gate();
    let manager = ObserverManager::new();
    for i in 0..50 {
        manager
            .add(GatedPeer::new(&format!("peer-{i}"), true, &gate))
            .unwrap();
    }

    let mut seen = HashSet::new();
    manager.notify_all(|peer| {
        assert!(seen.insert(peer.id.clone()), "delivered twice to {}", peer.id);
    });

    assert_eq!(seen.len(), 50);
    assert_eq!(manager.len(), 50);
}

#[test]
fn test_broadcast_on_empty_registry() {
    let manager: ObserverManager<GatedPeer> = ObserverManager::new();
    let mut calls = 0;
    manager.notify_all(|_| calls += 1);
    assert_eq!(calls, 0);
}
