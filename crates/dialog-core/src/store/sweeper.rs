//! Periodic dialog store maintenance task

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use super::dialog_store::DialogStore;
use super::retransmit::RetransmitCache;

/// Handle to a running sweeper
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown: Arc<Notify>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the task and wait for it to exit
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        if let Err(e) = self.task.await {
            warn!("Dialog sweeper ended abnormally: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Run [`DialogStore::sweep`] (and purge expired 2xx responses) every
/// `period`. Must be called from within a tokio runtime.
pub fn spawn_sweeper(
    store: Arc<DialogStore>,
    retransmit: Option<Arc<RetransmitCache>>,
    period: Duration,
) -> SweeperHandle {
    let shutdown = Arc::new(Notify::new());
    let stop = shutdown.clone();

    let task = tokio::spawn(async move {
        info!("Dialog sweeper started, period {:?}", period);
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick fires immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = stop.notified() => break,
                _ = ticker.tick() => {
                    // persistence is synchronous
                    let pass = store.clone();
                    match tokio::task::spawn_blocking(move || pass.sweep()).await {
                        Ok(Ok(stats)) => debug!("Sweep done: {:?}", stats),
                        Ok(Err(e)) => warn!("Dialog sweep failed: {}", e),
                        Err(e) => warn!("Dialog sweep task aborted: {}", e),
                    }
                    if let Some(cache) = &retransmit {
                        cache.purge_expired();
                    }
                }
            }
        }
        info!("Dialog sweeper stopped");
    });

    SweeperHandle { shutdown, task }
}
