//! Broker session
//!
//! One WebSocket connection carries both directions. A single loop waits on
//! either an inbound frame (handed to the dispatcher) or a wake-up from the
//! [`FrameLink`] (pending frames popped and sent). There is no reconnect:
//! when the connection ends the session ends.

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use rover_core::{LogSummary, RoverError, RoverResult};
use rover_library::FrameLink;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};

use crate::dispatcher::CommandDispatcher;

pub type BrokerStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Why a session ended without an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// Close frame from the broker, with its reason if any
    Closed(Option<String>),
    /// Stream ended without a close frame
    Eof,
}

impl std::fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed(Some(reason)) => write!(f, "closed by broker ({})", reason),
            Self::Closed(None) => f.write_str("closed by broker"),
            Self::Eof => f.write_str("connection lost"),
        }
    }
}

/// Open the broker connection
pub async fn connect(endpoint: &str) -> RoverResult<BrokerStream> {
    let (ws, response) = connect_async(endpoint)
        .await
        .map_err(|e| RoverError::communication(format!("connect failed: {}", e)))?;
    debug!("handshake status {}", response.status());
    Ok(ws)
}

/// Drive one connection until it ends
pub async fn run<S>(ws: S, dispatcher: &CommandDispatcher, link: &FrameLink) -> RoverResult<SessionEnd>
where
    S: Stream<Item = Result<Message, tungstenite::Error>>
        + Sink<Message, Error = tungstenite::Error>
        + Unpin,
{
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    let outcome = dispatcher.handle_text(&text);
                    trace!("dispatched: {:?}", outcome);
                }
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| f.reason.to_string())
                        .filter(|r| !r.is_empty());
                    return Ok(SessionEnd::Closed(reason));
                }
                Some(Ok(Message::Binary(data))) => {
                    debug!("ignoring {} byte binary frame", data.len());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    return Err(RoverError::communication(format!("receive failed: {}", e)));
                }
                None => return Ok(SessionEnd::Eof),
            },
            _ = link.ready() => {
                while let Some(frame) = link.pop() {
                    trace!("sending {}", frame.log_summary());
                    let text = frame.to_json()?;
                    sink.send(Message::Text(text))
                        .await
                        .map_err(|e| RoverError::communication(format!("send failed: {}", e)))?;
                }
                if link.dropped() > 0 {
                    debug!("{} outbound frames dropped so far", link.dropped());
                }
            }
        }
    }
}

/// Connect, run until the connection ends, then stop the camera pipeline.
///
/// Always returns how the session ended; the caller decides the exit status.
pub async fn serve(endpoint: &str, dispatcher: &CommandDispatcher) -> RoverResult<SessionEnd> {
    let ws = connect(endpoint).await?;
    info!("connected to broker");

    let result = run(ws, dispatcher, dispatcher.link()).await;

    dispatcher.camera().stop(None);
    match &result {
        Ok(end) => info!("session ended: {}", end),
        Err(e) => warn!("session failed: {}", e),
    }
    result
}
