//! geostream gateway binary
//!
//! Run with: cargo run -- [OPTIONS]
//!
//! Examples:
//!   cargo run                                              # simulated events on 0.0.0.0:5000
//!   cargo run -- --bind 127.0.0.1:5001                     # custom bind address
//!   cargo run -- --producer live --feed-addr 10.0.0.5:7000 # forward a live feed
//!
//! Talk to it with netcat:
//!   nc localhost 5000
//!   {"type":"submit_bounds","sw":{"lat":36.8,"lng":-122.75},"ne":{"lat":37.8,"lng":-121.75}}

use std::net::SocketAddr;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use geostream::broker::BrokerConfig;
use geostream::producer::{LiveConfig, ProducerKind, SimulatedConfig};
use geostream::session::SessionConfig;
use geostream::{BoundingBox, GeoServer, ServerConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ProducerChoice {
    Simulated,
    Live,
}

#[derive(Debug, Parser)]
#[command(name = "geostream", version, about = "Geofenced event streaming gateway")]
struct Args {
    /// Address to listen on
    #[arg(long, env = "GEOSTREAM_BIND", default_value = "0.0.0.0:5000")]
    bind: SocketAddr,

    /// Event source for every session
    #[arg(long, env = "GEOSTREAM_PRODUCER", value_enum, default_value = "simulated")]
    producer: ProducerChoice,

    /// host:port of the live feed
    #[arg(long, env = "GEOSTREAM_FEED_ADDR", required_if_eq("producer", "live"))]
    feed_addr: Option<String>,

    /// Name of the direct exchange
    #[arg(long, env = "GEOSTREAM_EXCHANGE", default_value = "events_exchange")]
    exchange: String,

    /// Initial box as sw_lng,sw_lat,ne_lng,ne_lat
    #[arg(
        long,
        env = "GEOSTREAM_DEFAULT_BOX",
        value_parser = parse_box,
        allow_hyphen_values = true,
        default_value = "-74,40,-73,41"
    )]
    default_box: BoundingBox,

    /// Maximum concurrent connections (0 = unlimited)
    #[arg(long, env = "GEOSTREAM_MAX_CONNECTIONS", default_value_t = 0)]
    max_connections: usize,

    /// Pause after an empty queue poll, in milliseconds
    #[arg(long, default_value_t = 500)]
    poll_backoff_ms: u64,

    /// Base pause between simulated events, in seconds
    #[arg(long, default_value_t = 10)]
    interval_secs: u64,

    /// Maximum extra random pause between simulated events, in seconds
    #[arg(long, default_value_t = 3)]
    jitter_secs: u64,

    /// Messages held per queue before the oldest is dropped
    #[arg(long, default_value_t = 1024)]
    queue_capacity: usize,
}

fn parse_box(value: &str) -> Result<BoundingBox, String> {
    let parts = value
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;

    match parts.as_slice() {
        [sw_lng, sw_lat, ne_lng, ne_lat] => {
            BoundingBox::new(*sw_lng, *sw_lat, *ne_lng, *ne_lat).map_err(|e| e.to_string())
        }
        _ => Err("expected four comma-separated numbers".to_string()),
    }
}

impl Args {
    fn producer_kind(&self) -> ProducerKind {
        match (self.producer, &self.feed_addr) {
            (ProducerChoice::Live, Some(addr)) => ProducerKind::Live(LiveConfig::new(addr)),
            _ => ProducerKind::Simulated(
                SimulatedConfig::default()
                    .base_interval(Duration::from_secs(self.interval_secs))
                    .max_jitter(Duration::from_secs(self.jitter_secs)),
            ),
        }
    }

    fn into_config(self) -> ServerConfig {
        let session = SessionConfig::default()
            .exchange(self.exchange.clone())
            .default_box(self.default_box)
            .poll_backoff(Duration::from_millis(self.poll_backoff_ms))
            .producer(self.producer_kind());

        ServerConfig::default()
            .bind(self.bind)
            .max_connections(self.max_connections)
            .broker(BrokerConfig::default().queue_capacity(self.queue_capacity))
            .session(session)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("geostream=info")),
        )
        .init();

    let config = Args::parse().into_config();

    let server = match GeoServer::new(config) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    };

    match server.run_until(shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, addr = %server.bind_addr(), "Server failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_box() {
        let bbox = parse_box("-74, 40, -73, 41").unwrap();
        assert_eq!(bbox, BoundingBox::new(-74.0, 40.0, -73.0, 41.0).unwrap());

        assert!(parse_box("-74,40,-73").is_err());
        assert!(parse_box("a,b,c,d").is_err());
        assert!(parse_box("-73,40,-74,41").is_err());
    }

    #[test]
    fn test_live_requires_feed_addr() {
        assert!(Args::try_parse_from(["geostream", "--producer", "live"]).is_err());

        let args = Args::try_parse_from([
            "geostream",
            "--producer",
            "live",
            "--feed-addr",
            "127.0.0.1:7000",
        ])
        .unwrap();
        assert!(matches!(args.producer_kind(), ProducerKind::Live(_)));
    }
}
