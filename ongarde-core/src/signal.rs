//! OS shutdown signal handling: a `Shutdown` resolves once on SIGINT/SIGTERM
//! or an explicit trigger, and a second interrupt forces an immediate exit.

use tokio::sync::mpsc;

pub struct Shutdown {
    tx: mpsc::Sender<()>,
    rx: mpsc::Receiver<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(1);
        Shutdown { tx, rx }
    }

    pub fn trigger(&self) -> ShutdownTrigger {
        ShutdownTrigger { tx: self.tx.clone() }
    }

    /// Resolves on SIGINT/SIGTERM (or an explicit trigger).
    pub async fn wait(mut self) {
        imp::wait(&mut self.rx).await
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct ShutdownTrigger {
    tx: mpsc::Sender<()>,
}

impl ShutdownTrigger {
    pub async fn shutdown_now(&self) {
        let _ = self.tx.send(()).await;
    }
}

#[cfg(unix)]
mod imp {
    use std::process;

    use tokio::sync::mpsc::Receiver;
    use tokio::signal::unix::{SignalKind, signal};
    use tracing::info;

    pub(super) async fn wait(receiver: &mut Receiver<()>) {
        tokio::select! {
            _ = watch(SignalKind::interrupt(), "SIGINT") => {
                tokio::spawn(async move {
                    watch(SignalKind::interrupt(), "SIGINT").await;
                    info!("second interrupt received, exiting immediately");
                    process::exit(1);
                });
            }
            _ = watch(SignalKind::terminate(), "SIGTERM") => {}
            _ = receiver.recv() => { info!("explicit shutdown requested"); }
        }
    }

    async fn watch(kind: SignalKind, name: &'static str) {
        signal(kind)
            .expect("failed to register signal handler")
            .recv()
            .await;
        info!("received {}, starting graceful shutdown", name);
    }
}

#[cfg(not(unix))]
mod imp {
    use tokio::sync::mpsc::Receiver;
    use tracing::info;

    pub(super) async fn wait(receiver: &mut Receiver<()>) {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => { info!("received ctrl-c, starting graceful shutdown"); }
            _ = receiver.recv() => { info!("explicit shutdown requested"); }
        }
    }
}
