//! Delivery pipeline
//!
//! Sits between projection and the sink: a bounded queue of per-event point
//! batches drained by a fixed pool of write workers. The worker count bounds
//! concurrent in-flight writes; the queue bound keeps a slow sink from
//! growing memory without limit. A full queue drops the newest batch
//! (telemetry, not a ledger).
//!
//! Failure handling is intentionally at-most-once: a failed write is
//! reported and its batch is lost; it never blocks, contaminates or retries
//! ahead of later batches.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::PipelineConfig;
use crate::sink::MetricSink;
use crate::stats::BridgeStats;
use crate::types::MetricPoint;

/// Bounded, fire-and-forget delivery of point batches to the sink
pub struct DeliveryPipeline {
    tx: Mutex<Option<mpsc::Sender<Vec<MetricPoint>>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    stats: Arc<BridgeStats>,
}

impl DeliveryPipeline {
    /// Spawn the write workers and return the pipeline handle
    pub fn new(
        config: &PipelineConfig,
        sink: Arc<dyn MetricSink>,
        stats: Arc<BridgeStats>,
    ) -> Self {
        let (tx, rx) = mpsc::channel::<Vec<MetricPoint>>(config.queue_capacity.max(1));
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let workers = (0..config.write_workers.max(1))
            .map(|worker| {
                let rx = Arc::clone(&rx);
                let sink = Arc::clone(&sink);
                let stats = Arc::clone(&stats);

                tokio::spawn(async move {
                    loop {
                        // Hold the receiver lock only for the dequeue, not
                        // for the write itself.
                        let batch = { rx.lock().await.recv().await };
                        let points = match batch {
                            Some(points) => points,
                            None => {
                                debug!(worker, "Delivery worker stopping");
                                break;
                            }
                        };

                        match sink.write_batch(&points).await {
                            Ok(()) => stats.record_points_written(points.len() as u64),
                            Err(e) => {
                                stats.record_write_error();
                                warn!(
                                    error = %e,
                                    points = points.len(),
                                    "Metric write failed, batch dropped"
                                );
                            }
                        }
                    }
                })
            })
            .collect();

        Self {
            tx: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
            stats,
        }
    }

    /// Queue one event's points for delivery.
    ///
    /// Never blocks event intake: an empty batch is a no-op, a full queue
    /// drops the batch and counts the drop.
    pub fn dispatch(&self, points: Vec<MetricPoint>) {
        if points.is_empty() {
            return;
        }

        let guard = self.tx.lock();
        let tx = match guard.as_ref() {
            Some(tx) => tx,
            None => {
                warn!("Delivery pipeline already shut down, batch dropped");
                return;
            }
        };

        match tx.try_send(points) {
            Ok(()) => self.stats.record_batch_enqueued(),
            Err(mpsc::error::TrySendError::Full(batch)) => {
                self.stats.record_batch_dropped();
                warn!(points = batch.len(), "Delivery queue full, batch dropped");
            }
            Err(mpsc::error::TrySendError::Closed(batch)) => {
                warn!(points = batch.len(), "Delivery queue closed, batch dropped");
            }
        }
    }

    /// Close the queue and wait for the workers to finish what they hold.
    ///
    /// Queued batches are still written; anything in flight at process exit
    /// beyond this point is abandoned best-effort.
    pub async fn shutdown(&self) {
        self.tx.lock().take();
        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            let _ = worker.await;
        }
    }
}
