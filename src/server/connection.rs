//! Per-connection handling
//!
//! Each TCP connection is one session. The connection reads client messages
//! line by line and writes client events line by line until either side
//! goes away, then unregisters the session.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::delivery::{ChannelDelivery, ClientEvent, Delivery};
use crate::error::Result;
use crate::session::{SessionId, SessionRegistry};

use super::message::ClientMessage;

/// One client connection
pub(crate) struct Connection {
    session_id: SessionId,
    socket: TcpStream,
    peer_addr: SocketAddr,
    registry: Arc<SessionRegistry>,
    delivery: Arc<ChannelDelivery>,
    max_line_length: usize,
    shutdown: CancellationToken,
}

impl Connection {
    pub(crate) fn new(
        session_id: SessionId,
        socket: TcpStream,
        peer_addr: SocketAddr,
        registry: Arc<SessionRegistry>,
        delivery: Arc<ChannelDelivery>,
    ) -> Self {
        Self {
            session_id,
            socket,
            peer_addr,
            registry,
            delivery,
            max_line_length: crate::server::config::DEFAULT_MAX_LINE_LENGTH,
            shutdown: CancellationToken::new(),
        }
    }

    /// Longest accepted client line, newline excluded
    pub(crate) fn max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = max;
        self
    }

    /// Stop serving when `token` is cancelled
    pub(crate) fn shutdown_on(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Serve the connection until it closes, then tear the session down
    pub(crate) async fn run(self) -> Result<()> {
        let Connection {
            session_id,
            mut socket,
            peer_addr,
            registry,
            delivery,
            max_line_length,
            shutdown,
        } = self;

        let mut events = delivery.attach(&session_id);
        let result = tokio::select! {
            biased;
            _ = shutdown.cancelled() => Ok(()),
            result = serve(&session_id, &mut socket, &registry, &delivery, &mut events, max_line_length) => result,
        };

        registry.on_disconnect(&session_id).await;
        delivery.detach(&session_id);

        tracing::debug!(session_id = %session_id, peer = %peer_addr, "Connection finished");
        result
    }
}

async fn serve(
    session_id: &SessionId,
    socket: &mut TcpStream,
    registry: &SessionRegistry,
    delivery: &ChannelDelivery,
    events: &mut mpsc::Receiver<ClientEvent>,
    max_line_length: usize,
) -> Result<()> {
    let bbox = registry.on_connect(session_id).await?;
    delivery.emit(
        session_id,
        ClientEvent::Connected {
            ws_id: session_id.to_string(),
            sw: bbox.sw(),
            ne: bbox.ne(),
        },
    );

    let (reader, mut writer) = socket.split();
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        tokio::select! {
            inbound = read_line_capped(&mut reader, &mut buf, max_line_length) => {
                match inbound? {
                    Inbound::Line(line) => handle_line(session_id, registry, &line).await,
                    Inbound::TooLong => {
                        tracing::warn!(
                            session_id = %session_id,
                            max = max_line_length,
                            "Client line too long, closing connection"
                        );
                        return Ok(());
                    }
                    Inbound::Closed => return Ok(()),
                }
            }
            Some(event) = events.recv() => {
                write_event(&mut writer, &event).await?;
            }
        }
    }
}

/// Result of reading one client line
#[derive(Debug, PartialEq)]
enum Inbound {
    /// A complete line, delimiter stripped
    Line(Vec<u8>),
    /// More than the allowed bytes arrived without a newline
    TooLong,
    /// The client closed its side
    Closed,
}

/// Read one newline-terminated line of at most `max` bytes
///
/// Cancel safe: bytes read before cancellation stay in `buf` and the next
/// call picks up where this one stopped. A final unterminated line before
/// end of stream is returned as a line.
async fn read_line_capped<R>(reader: &mut R, buf: &mut Vec<u8>, max: usize) -> std::io::Result<Inbound>
where
    R: AsyncBufRead + Unpin,
{
    let remaining = (max + 1).saturating_sub(buf.len()) as u64;
    (&mut *reader).take(remaining).read_until(b'\n', buf).await?;

    if buf.last() == Some(&b'\n') {
        buf.pop();
        return Ok(Inbound::Line(std::mem::take(buf)));
    }
    if buf.len() > max {
        return Ok(Inbound::TooLong);
    }
    if buf.is_empty() {
        return Ok(Inbound::Closed);
    }
    Ok(Inbound::Line(std::mem::take(buf)))
}

async fn handle_line(session_id: &SessionId, registry: &SessionRegistry, line: &[u8]) {
    let line = line.trim_ascii();
    if line.is_empty() {
        return;
    }

    let message = match ClientMessage::parse(line) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(session_id = %session_id, error = %e, "Ignoring malformed message");
            return;
        }
    };

    let update = match message.into_update() {
        Ok(update) => update,
        Err(e) => {
            tracing::warn!(session_id = %session_id, error = %e, "Ignoring invalid bounds");
            return;
        }
    };

    tracing::debug!(session_id = %session_id, update = ?update, "Bounds changed");
    if let Err(e) = registry.on_bounds_changed(session_id, update).await {
        tracing::warn!(session_id = %session_id, error = %e, "Location update rejected");
    }
}

async fn write_event<W>(writer: &mut W, event: &ClientEvent) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(event)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    Ok(())
}
