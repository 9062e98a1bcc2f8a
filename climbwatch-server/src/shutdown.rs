//! Two-stage shutdown
//!
//! On SIGTERM the HTTP server stops accepting connections at once, while
//! ingestion cycles already running keep going until the grace period ends.
//! Only then is the ingestion token cancelled, so a refresh that can finish
//! in time is not thrown away.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Cancellation handles for the two shutdown stages
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    drain: CancellationToken,
    ingest: CancellationToken,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trips when the server should stop accepting new requests
    pub fn drain_token(&self) -> CancellationToken {
        self.drain.clone()
    }

    /// Trips when in-flight ingestion must give up
    pub fn ingest_token(&self) -> CancellationToken {
        self.ingest.clone()
    }

    /// Start draining now and cancel ingestion once `grace` has elapsed
    pub fn begin(&self, grace: Duration) -> JoinHandle<()> {
        info!("Draining HTTP server; ingestion may run for up to {:?}", grace);
        self.drain.cancel();

        let ingest = self.ingest.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = ingest.cancelled() => {}
                _ = tokio::time::sleep(grace) => {
                    warn!("Grace period elapsed, cancelling in-flight ingestion");
                    ingest.cancel();
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_begin_drains_immediately_and_ingest_later() {
        let shutdown = Shutdown::new();
        let drain = shutdown.drain_token();
        let ingest = shutdown.ingest_token();

        let timer = shutdown.begin(Duration::from_millis(100));
        assert!(drain.is_cancelled());
        assert!(!ingest.is_cancelled());

        timer.await.unwrap();
        assert!(ingest.is_cancelled());
    }
}
