use futures_util::future::BoxFuture;
use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::backbone::EventBackbone;
use super::event::{Envelope, Event};
use crate::error::PublishError;
use crate::metrics::Metrics;

// ============================================================================
// Channels
// ============================================================================

/// Outbound channel, one per entity kind, shared by CREATE and DELETE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Products,
    Recommendations,
    Reviews,
}

impl Channel {
    pub fn binding_name(&self) -> &'static str {
        match self {
            Channel::Products => "products-out-0",
            Channel::Recommendations => "recommendations-out-0",
            Channel::Reviews => "reviews-out-0",
        }
    }

    pub fn default_topic(&self) -> &'static str {
        match self {
            Channel::Products => "products",
            Channel::Recommendations => "recommendations",
            Channel::Reviews => "reviews",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binding_name())
    }
}

/// Destination topic of each channel.
#[derive(Debug, Clone)]
pub struct Bindings {
    pub products: String,
    pub recommendations: String,
    pub reviews: String,
}

impl Default for Bindings {
    fn default() -> Self {
        Self {
            products: Channel::Products.default_topic().to_string(),
            recommendations: Channel::Recommendations.default_topic().to_string(),
            reviews: Channel::Reviews.default_topic().to_string(),
        }
    }
}

impl Bindings {
    pub fn destination(&self, channel: Channel) -> &str {
        match channel {
            Channel::Products => &self.products,
            Channel::Recommendations => &self.recommendations,
            Channel::Reviews => &self.reviews,
        }
    }
}

// ============================================================================
// Publish Pool - execution context reserved for publishing
// ============================================================================
//
// A dedicated multi-threaded runtime, so a slow or backpressured backbone
// never competes with the runtime serving reads.
//
// Jobs are spread over lanes by partition key. Each lane is a bounded queue
// drained in order by a single worker, so two events for the same product
// reach the backbone in the order they were submitted. A full lane rejects
// the job instead of blocking the caller.
//
// ============================================================================

type Job = BoxFuture<'static, ()>;

pub struct PublishPool {
    lanes: Vec<mpsc::Sender<Job>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    shutdown: watch::Sender<bool>,
    runtime: Option<Runtime>,
}

impl PublishPool {
    /// `threads` worker threads and lanes, each lane holding up to
    /// `queue_size` pending jobs.
    pub fn new(threads: usize, queue_size: usize) -> std::io::Result<Self> {
        let threads = threads.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(threads)
            .thread_name("publish-pool")
            .enable_all()
            .build()?;

        let (shutdown, shutdown_rx) = watch::channel(false);
        let mut lanes = Vec::with_capacity(threads);
        let mut workers = Vec::with_capacity(threads);

        for lane in 0..threads {
            let (tx, rx) = mpsc::channel(queue_size.max(1));
            lanes.push(tx);
            workers.push(runtime.spawn(drain_lane(lane, rx, shutdown_rx.clone())));
        }

        tracing::info!(threads, queue_size, "Publish pool started");

        Ok(Self {
            lanes,
            workers: Mutex::new(workers),
            shutdown,
            runtime: Some(runtime),
        })
    }

    /// Queue `job` on the lane owning `partition_key`. Never waits.
    pub fn submit(&self, partition_key: &str, job: Job) -> Result<(), PublishError> {
        let lane = self.lane_for(partition_key);
        self.lanes[lane].try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => PublishError::Saturated { lane },
            mpsc::error::TrySendError::Closed(_) => PublishError::Closed,
        })
    }

    fn lane_for(&self, partition_key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        partition_key.hash(&mut hasher);
        (hasher.finish() % self.lanes.len() as u64) as usize
    }

    /// Stop accepting jobs and wait up to `grace` for queued jobs to finish.
    pub async fn shutdown(&self, grace: Duration) {
        let _ = self.shutdown.send(true);

        let workers = match self.workers.lock() {
            Ok(mut workers) => std::mem::take(&mut *workers),
            Err(_) => return,
        };

        let drained = tokio::time::timeout(grace, futures_util::future::join_all(workers)).await;
        if drained.is_err() {
            tracing::warn!(grace_ms = grace.as_millis() as u64, "Publish pool did not drain in time");
        } else {
            tracing::info!("Publish pool drained");
        }
    }
}

impl Drop for PublishPool {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

async fn drain_lane(lane: usize, mut rx: mpsc::Receiver<Job>, mut shutdown: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            job = rx.recv() => match job {
                Some(job) => job.await,
                None => break,
            },
            _ = shutdown.changed() => {
                rx.close();
                while let Some(job) = rx.recv().await {
                    job.await;
                }
                break;
            }
        }
    }
    tracing::debug!(lane, "Publish lane stopped");
}

// ============================================================================
// Event Publisher
// ============================================================================

/// Hands events to the backbone through the publish pool.
///
/// `publish` returns once the event is queued. Delivery failures after that
/// point are logged and counted; they are not reported to the caller and
/// not retried.
#[derive(Clone)]
pub struct EventPublisher {
    backbone: Arc<dyn EventBackbone>,
    pool: Arc<PublishPool>,
    bindings: Arc<Bindings>,
    metrics: Arc<Metrics>,
}

impl EventPublisher {
    pub fn new(
        backbone: Arc<dyn EventBackbone>,
        pool: Arc<PublishPool>,
        bindings: Bindings,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            backbone,
            pool,
            bindings: Arc::new(bindings),
            metrics,
        }
    }

    pub fn publish<T: Serialize>(&self, channel: Channel, event: &Event<T>) -> Result<(), PublishError> {
        let result = self.dispatch(channel, event);
        if let Err(e) = &result {
            self.metrics.record_event_failed(channel.binding_name(), e.reason());
            tracing::error!(
                channel = %channel,
                key = event.key,
                error = %e,
                "Event was not handed to the publish pool"
            );
        }
        result
    }

    fn dispatch<T: Serialize>(&self, channel: Channel, event: &Event<T>) -> Result<(), PublishError> {
        let envelope = Envelope::wrap(event)?;
        let topic = self.bindings.destination(channel).to_string();
        let partition_key = envelope.partition_key.clone();

        tracing::debug!(
            event_type = %envelope.event_type,
            channel = %channel,
            key = %partition_key,
            "Sending a {} message to {}",
            envelope.event_type,
            channel
        );

        let backbone = self.backbone.clone();
        let metrics = self.metrics.clone();

        self.pool.submit(
            &partition_key,
            Box::pin(async move {
                match backbone.send(&topic, &envelope).await {
                    Ok(()) => {
                        metrics.record_event_published(channel.binding_name(), envelope.event_type.as_str());
                    }
                    Err(e) => {
                        metrics.record_event_failed(channel.binding_name(), "backbone");
                        tracing::error!(
                            error = %e,
                            topic = %topic,
                            key = %envelope.partition_key,
                            message_id = %envelope.message_id,
                            "Failed to publish event"
                        );
                    }
                }
            }),
        )
    }
}
