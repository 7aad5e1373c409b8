use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info};

use super::EInvoiceService;

/// Background task polling the gateway for incoming invoices.
///
/// Failures are logged and the next tick tries again.
pub struct IncomingPoller {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl IncomingPoller {
    /// Spawn the poller. The first poll runs immediately.
    pub fn spawn(service: Arc<EInvoiceService>, every: Duration) -> Self {
        let (shutdown, mut stop) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_secs = every.as_secs(), "incoming invoice poller started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match service.receive_incoming_invoices().await {
                            Ok(list) => info!(count = list.len(), "polled incoming invoices"),
                            Err(e) => error!(error = %e, "incoming invoice poll failed"),
                        }
                    }
                    changed = stop.changed() => {
                        if changed.is_err() || *stop.borrow() {
                            info!("incoming invoice poller shutting down");
                            break;
                        }
                    }
                }
            }
        });
        Self { shutdown, handle }
    }

    /// Signal the task to stop and wait for it.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            error!(error = %e, "incoming invoice poller panicked");
        }
    }
}
