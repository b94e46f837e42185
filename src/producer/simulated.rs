//! Simulated event producer
//!
//! Generates one random event inside the box, publishes it, then sleeps a
//! jittered interval. Used when no live feed is available.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::broker::BrokerPublisher;
use crate::geo::{BoundingBox, GeoEvent};

use super::config::SimulatedConfig;
use super::task::ProducerTask;

/// Producer emitting random events inside a bounding box
#[derive(Debug)]
pub struct SimulatedProducer {
    bbox: BoundingBox,
    task: ProducerTask,
}

impl SimulatedProducer {
    /// Start generating events for `bbox`
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: SimulatedConfig, bbox: BoundingBox, publisher: BrokerPublisher) -> Self {
        let task = ProducerTask::spawn(publisher.stats(), move |cancel| {
            run(config, bbox, publisher, cancel)
        });
        Self { bbox, task }
    }

    /// Box events are generated in
    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    /// Stop generating; idempotent
    pub fn stop(&self) {
        self.task.stop();
    }

    /// Whether the generator loop is still alive
    pub fn is_running(&self) -> bool {
        self.task.is_running()
    }

    /// Whether `stop` has been called
    pub fn is_stopped(&self) -> bool {
        self.task.is_stopped()
    }
}

/// Generate one event uniformly inside `bbox`
pub fn generate_event<R: Rng + ?Sized>(rng: &mut R, bbox: &BoundingBox) -> GeoEvent {
    let lat = rng.random_range(bbox.sw_lat()..=bbox.ne_lat());
    let lng = rng.random_range(bbox.sw_lng()..=bbox.ne_lng());
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    GeoEvent::new(
        format!("Event {}: {}", rng.random_range(1..=100), now),
        lat,
        lng,
    )
}

/// Pause before the next event: base interval plus uniform jitter
pub fn next_delay<R: Rng + ?Sized>(rng: &mut R, config: &SimulatedConfig) -> Duration {
    let jitter_ms = config.max_jitter.as_millis() as u64;
    let jitter = if jitter_ms > 0 {
        Duration::from_millis(rng.random_range(0..=jitter_ms))
    } else {
        Duration::ZERO
    };
    config.base_interval + jitter
}

async fn run(
    config: SimulatedConfig,
    bbox: BoundingBox,
    publisher: BrokerPublisher,
    cancel: CancellationToken,
) {
    let routing_key = publisher.routing_key().clone();
    tracing::info!(routing_key = %routing_key, bbox = %bbox, "Simulated producer started");

    while !cancel.is_cancelled() {
        let (event, delay) = {
            let mut rng = rand::rng();
            (generate_event(&mut rng, &bbox), next_delay(&mut rng, &config))
        };

        if let Err(e) = publisher.publish(&event) {
            tracing::warn!(routing_key = %routing_key, error = %e, "Simulated producer terminated");
            return;
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    tracing::info!(routing_key = %routing_key, "Simulated producer stopped");
}
