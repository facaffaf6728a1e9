//! Graceful shutdown/drain primitives.
//! A `DrainTrigger` starts a drain and waits for every outstanding
//! `DrainWatcher` clone to be dropped, bounded by a deadline after which
//! remaining work is forced to stop.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

pub fn new() -> (DrainTrigger, DrainWatcher) {
    let (tx, rx) = watch::channel(false);
    (DrainTrigger { tx }, DrainWatcher { rx })
}

#[derive(Clone)]
pub struct DrainTrigger {
    tx: watch::Sender<bool>,
}

impl DrainTrigger {
    /// Starts a drain and waits up to `deadline` for every watcher to drop.
    pub async fn start_drain_and_wait(&self, deadline: Duration) {
        let _ = self.tx.send(true);
        let waiter = self.tx.closed();
        if tokio::time::timeout(deadline, waiter).await.is_err() {
            warn!("drain deadline exceeded with outstanding connections, forcing shutdown");
        } else {
            info!("drain complete, all connections finished");
        }
    }
}

#[derive(Clone)]
pub struct DrainWatcher {
    rx: watch::Receiver<bool>,
}

impl DrainWatcher {
    /// Resolves once a drain has been triggered.
    pub async fn signaled(&mut self) {
        let _ = self.rx.wait_for(|v| *v).await;
    }
}

/// Runs `make_future` until completion or until `drain` is signaled and the
/// bounded deadline expires, whichever comes first.
pub async fn run_with_drain<F, O>(component: String, mut drain: DrainWatcher, deadline: Duration, make_future: F)
where
    F: std::future::Future<Output = O>,
{
    tokio::select! {
        _ = make_future => {
            info!(component, "component completed");
        }
        _ = drain.signaled() => {
            info!(component, "drain signaled, waiting up to {:?}", deadline);
            tokio::time::sleep(deadline).await;
        }
    }
}
