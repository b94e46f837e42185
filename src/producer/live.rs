//! Live feed producer
//!
//! Connects to an external feed over TCP, asks for items inside the box and
//! forwards every item that carries coordinates.
//!
//! # Feed protocol
//!
//! The producer writes one request line:
//!
//! ```text
//! {"locations":[sw_lng,sw_lat,ne_lng,ne_lat]}
//! ```
//!
//! and then reads newline-delimited JSON items. Items look like
//! `{"text": "...", "coordinates": {"type": "Point", "coordinates": [lng, lat]}}`;
//! `coordinates` may be null or absent, in which case the item is dropped.
//! Blank lines are keep-alives.
//!
//! Any transport error or end of stream ends the producer for good; the
//! producer does not reconnect.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use crate::broker::BrokerPublisher;
use crate::geo::{BoundingBox, GeoEvent};

use super::config::LiveConfig;
use super::error::ProducerError;
use super::task::ProducerTask;

/// Filter request sent to the feed
#[derive(Debug, Serialize)]
struct FilterRequest {
    locations: [f64; 4],
}

/// One inbound feed item
#[derive(Debug, Deserialize)]
struct FeedItem {
    text: Option<String>,
    coordinates: Option<FeedPoint>,
}

#[derive(Debug, Deserialize)]
struct FeedPoint {
    /// `[lng, lat]`
    coordinates: [f64; 2],
}

/// Producer forwarding items from an external feed
#[derive(Debug)]
pub struct LiveProducer {
    bbox: BoundingBox,
    task: ProducerTask,
}

impl LiveProducer {
    /// Connect to the feed and start forwarding items for `bbox`
    ///
    /// The connection happens on the spawned task; this returns immediately.
    /// Must be called from within a tokio runtime.
    pub fn start(config: LiveConfig, bbox: BoundingBox, publisher: BrokerPublisher) -> Self {
        let task = ProducerTask::spawn(publisher.stats(), move |cancel| {
            run(config, bbox, publisher, cancel)
        });
        Self { bbox, task }
    }

    /// Box the feed is filtered by
    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    /// Disconnect from the feed; idempotent
    pub fn stop(&self) {
        self.task.stop();
    }

    /// Whether the feed connection is still being served
    pub fn is_running(&self) -> bool {
        self.task.is_running()
    }

    /// Whether `stop` has been called
    pub fn is_stopped(&self) -> bool {
        self.task.is_stopped()
    }
}

async fn run(config: LiveConfig, bbox: BoundingBox, publisher: BrokerPublisher, cancel: CancellationToken) {
    let routing_key = publisher.routing_key().clone();
    tracing::info!(
        routing_key = %routing_key,
        feed = %config.feed_addr,
        bbox = %bbox,
        "Live producer started"
    );

    let result = tokio::select! {
        _ = cancel.cancelled() => Ok(()),
        result = stream_feed(&config, &bbox, &publisher) => result,
    };

    match result {
        Ok(()) => tracing::info!(routing_key = %routing_key, "Live producer stopped"),
        Err(e) => tracing::warn!(
            routing_key = %routing_key,
            error = %e,
            "Live producer terminated"
        ),
    }
}

async fn stream_feed(
    config: &LiveConfig,
    bbox: &BoundingBox,
    publisher: &BrokerPublisher,
) -> Result<(), ProducerError> {
    let mut stream = TcpStream::connect(&config.feed_addr)
        .await
        .map_err(|source| ProducerError::Connect {
            addr: config.feed_addr.clone(),
            source,
        })?;

    let request = FilterRequest {
        locations: bbox.to_feed_filter(),
    };
    let mut line = serde_json::to_vec(&request).map_err(std::io::Error::from)?;
    line.push(b'\n');
    stream.write_all(&line).await?;
    stream.flush().await?;

    forward_items(BufReader::new(stream), publisher).await
}

/// Read feed lines and publish every item with coordinates
///
/// Returns only on failure: transport error, end of stream, or a broker
/// that can no longer route.
pub(crate) async fn forward_items<R>(reader: R, publisher: &BrokerPublisher) -> Result<(), ProducerError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.split(b'\n');

    while let Some(line) = lines.next_segment().await? {
        let line = line.trim_ascii();
        if line.is_empty() {
            continue;
        }

        match parse_item(line) {
            Some(event) => publisher.publish(&event)?,
            None => tracing::debug!(
                routing_key = %publisher.routing_key(),
                "Dropped malformed or uncoordinated feed item"
            ),
        }
    }

    Err(ProducerError::FeedClosed)
}

/// Extract an event from one raw feed line, if it has text and coordinates
///
/// Lines that are not valid UTF-8 or not valid JSON yield `None`.
fn parse_item(line: &[u8]) -> Option<GeoEvent> {
    let item: FeedItem = serde_json::from_slice(line).ok()?;
    let point = item.coordinates?;
    let [lng, lat] = point.coordinates;
    Some(GeoEvent::new(item.text?, lat, lng))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::net::TcpListener;

    use super::*;
    use crate::broker::{ExclusiveQueue, RoutingBroker, RoutingKey};

    fn bound_publisher() -> (Arc<RoutingBroker>, ExclusiveQueue, BrokerPublisher) {
        let broker = Arc::new(RoutingBroker::new());
        broker.declare_exchange("ex");
        let queue = broker.create_exclusive_queue();
        let key = RoutingKey::new("live-session");
        broker.bind_queue("ex", queue.id(), &key).unwrap();
        let publisher = BrokerPublisher::new(Arc::clone(&broker), "ex", key);
        (broker, queue, publisher)
    }

    #[test]
    fn test_parse_item_with_coordinates() {
        let line = br#"{"text":"hello","coordinates":{"type":"Point","coordinates":[-73.5,40.25]}}"#;
        let event = parse_item(line).unwrap();
        assert_eq!(event, GeoEvent::new("hello", 40.25, -73.5));
    }

    #[test]
    fn test_parse_item_drops_uncoordinated_and_malformed() {
        assert!(parse_item(br#"{"text":"no geo","coordinates":null}"#).is_none());
        assert!(parse_item(br#"{"text":"no geo"}"#).is_none());
        assert!(parse_item(br#"{"coordinates":{"coordinates":[1.0,2.0]}}"#).is_none());
        assert!(parse_item(b"{truncated").is_none());
        assert!(parse_item(b"{\"text\":\"caf\xe9\",\"coordinates\":null}").is_none());
    }

    #[tokio::test]
    async fn test_forward_items_skips_and_ends_on_close() {
        let (_broker, queue, publisher) = bound_publisher();
        let feed = tokio_test::io::Builder::new()
            .read(b"{\"text\":\"a\",\"coordinates\":{\"coordinates\":[-73.9,40.7]}}\n")
            .read(b"\n")
            .read(b"{\"text\":\"b\",\"coordinates\":null}\n")
            .read(b"garbage\n")
            .read(b"{\"text\":\"c\",\"coordinates\":{\"coordinates\":[-73.1,40.1]}}\n")
            .build();

        let result = forward_items(BufReader::new(feed), &publisher).await;
        assert!(matches!(result, Err(ProducerError::FeedClosed)));

        let first = GeoEvent::from_body(&queue.poll().unwrap()).unwrap();
        let second = GeoEvent::from_body(&queue.poll().unwrap()).unwrap();
        assert_eq!(first.text, "a");
        assert_eq!(second.text, "c");
        assert!(queue.poll().is_none());
    }

    #[tokio::test]
    async fn test_forward_items_survives_invalid_utf8() {
        let (_broker, queue, publisher) = bound_publisher();
        let feed = tokio_test::io::Builder::new()
            .read(b"{\"text\":\"caf\xe9\",\"coordinates\":{\"coordinates\":[-73.5,40.5]}}\n")
            .read(b"\xff\xfe\r\n")
            .read(b"{\"text\":\"after\",\"coordinates\":{\"coordinates\":[-73.5,40.5]}}\r\n")
            .build();

        let result = forward_items(BufReader::new(feed), &publisher).await;
        assert!(matches!(result, Err(ProducerError::FeedClosed)));

        let event = GeoEvent::from_body(&queue.poll().unwrap()).unwrap();
        assert_eq!(event, GeoEvent::new("after", 40.5, -73.5));
        assert!(queue.poll().is_none());
    }

    #[tokio::test]
    async fn test_forward_items_read_error_is_terminal() {
        let (_broker, queue, publisher) = bound_publisher();
        let feed = tokio_test::io::Builder::new()
            .read(b"{\"text\":\"a\",\"coordinates\":{\"coordinates\":[1.0,2.0]}}\n")
            .read_error(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset"))
            .build();

        let result = forward_items(BufReader::new(feed), &publisher).await;
        assert!(matches!(result, Err(ProducerError::Feed(_))));
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_live_producer_sends_filter_and_forwards() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (_broker, queue, publisher) = bound_publisher();
        let bbox = BoundingBox::new(-74.0, 40.0, -73.0, 41.0).unwrap();

        let feed = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut reader = BufReader::new(socket);
            let mut request = String::new();
            reader.read_line(&mut request).await.unwrap();

            reader
                .get_mut()
                .write_all(b"{\"text\":\"live\",\"coordinates\":{\"coordinates\":[-73.5,40.5]}}\n")
                .await
                .unwrap();
            // Hold the connection open until the producer goes away
            let mut rest = String::new();
            let _ = reader.read_line(&mut rest).await;
            request
        });

        let producer = LiveProducer::start(LiveConfig::new(addr.to_string()), bbox, publisher);

        let body = loop {
            if let Some(body) = queue.poll() {
                break body;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        };
        assert_eq!(GeoEvent::from_body(&body).unwrap().text, "live");

        producer.stop();
        let request = feed.await.unwrap();
        let request: serde_json::Value = serde_json::from_str(request.trim()).unwrap();
        assert_eq!(request["locations"], serde_json::json!([-74.0, 40.0, -73.0, 41.0]));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!producer.is_running());
    }

    #[tokio::test]
    async fn test_connect_failure_is_terminal() {
        // Bind then drop to get a port nobody listens on
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let (broker, _queue, publisher) = bound_publisher();
        let bbox = BoundingBox::new(-74.0, 40.0, -73.0, 41.0).unwrap();

        let producer = LiveProducer::start(LiveConfig::new(addr.to_string()), bbox, publisher);
        for _ in 0..100 {
            if !producer.is_running() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert!(!producer.is_running());
        assert!(!producer.is_stopped());
        assert_eq!(broker.stats().active_producers(), 0);
    }
}
