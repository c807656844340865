use crate::config::SyncerConfig;
use crate::handler::{Processed, Processor};
use crate::store::Store;
use crate::types::Output;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};
use tokio::time::{sleep, Duration};
use tracing::{debug, error, trace, warn};

/// Ordered feed of inbound outputs.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Up to `limit` outputs with id greater than `after`, ascending.
    async fn list(&self, after: i64, limit: i64) -> Result<Vec<Output>>;
}

/// Tallies of one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub applied: usize,
    pub rejected: usize,
    pub skipped: usize,
    pub replayed: usize,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.applied + self.rejected + self.skipped + self.replayed
    }

    fn record(&mut self, processed: Processed) {
        match processed {
            Processed::Applied => self.applied += 1,
            Processed::Rejected(_) => self.rejected += 1,
            Processed::Skipped => self.skipped += 1,
            Processed::Replayed => self.replayed += 1,
        }
    }
}

/// Drives the processor over the event source, one output at a time.
///
/// The checkpoint is saved only after an output's changeset has committed.
/// A crash in between replays that output, which the processor treats as
/// a no-op.
pub struct Syncer {
    config: SyncerConfig,
    source: Arc<dyn EventSource>,
    store: Arc<dyn Store>,
    processor: Arc<Processor>,
    last_output_id: Arc<AtomicI64>,
}

impl Syncer {
    pub fn new(
        config: SyncerConfig,
        source: Arc<dyn EventSource>,
        store: Arc<dyn Store>,
        processor: Arc<Processor>,
    ) -> Self {
        Syncer {
            config,
            source,
            store,
            processor,
            last_output_id: Arc::new(AtomicI64::new(0)),
        }
    }

    /// Id of the last output processed by this syncer, shared for telemetry.
    pub fn last_output_id(&self) -> Arc<AtomicI64> {
        Arc::clone(&self.last_output_id)
    }

    pub async fn sync_once(&self) -> Result<BatchSummary> {
        let checkpoint = self.store.checkpoint()?;
        let mut outputs = self.source.list(checkpoint, self.config.batch_size).await?;
        outputs.sort_by_key(|o| o.id);

        let mut summary = BatchSummary::default();
        for output in outputs.iter().filter(|o| o.id > checkpoint) {
            let processed = self.processor.process(output)?;
            self.store.save_checkpoint(output.id)?;
            self.last_output_id.store(output.id, Ordering::Relaxed);

            trace!("Output {} processed: {:?}", output.id, processed);
            summary.record(processed);
        }

        Ok(summary)
    }

    /// Polls forever. Failures are retried with exponential backoff; the
    /// loop never skips past an output it failed to process.
    pub async fn run(&self) {
        warn!("Syncer started from checkpoint {:?}", self.store.checkpoint().ok());

        let min_backoff = self.config.backoff_min_ms.max(1);
        let max_backoff = self.config.backoff_max_ms.max(min_backoff);
        let mut backoff = min_backoff;

        loop {
            match self.sync_once().await {
                Ok(summary) if summary.total() == 0 => {
                    backoff = min_backoff;
                    sleep(Duration::from_millis(self.config.poll_interval_ms)).await;
                }
                Ok(summary) => {
                    backoff = min_backoff;
                    debug!("Synced batch: {:?}", summary);
                }
                Err(e) => {
                    error!("Sync failed, retrying in {}ms: {:?}", backoff, e);
                    sleep(Duration::from_millis(backoff)).await;
                    backoff = (backoff * 2).min(max_backoff);
                }
            }
        }
    }
}
