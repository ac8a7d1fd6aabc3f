//! Reconnecting WebSocket transport for the event channel.
//!
//! A [`PushSocket`] owns a background tokio task that keeps a single
//! connection to the server's `/api/events` endpoint alive, feeding inbound
//! text frames into the listener registry. Dropped connections are re-dialed
//! with exponential backoff; subscriptions are unaffected because they live
//! in the registry, not on the connection.

use std::ops::ControlFlow;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};
use url::Url;

use super::hub::decode_frame;
use super::registry::ListenerRegistry;

/// Delay before the first reconnect attempt.
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);

/// Upper bound for the reconnect delay.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

type Stream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Handle to the background connection task.
///
/// The task runs until [`shutdown`](PushSocket::shutdown) is called or the
/// handle is dropped.
pub(crate) struct PushSocket {
    shutdown_tx: mpsc::UnboundedSender<()>,
}

impl PushSocket {
    /// Spawns the connection task. Must be called within a tokio runtime.
    pub(crate) fn spawn(
        url: Url,
        auth_header: Option<String>,
        registry: ListenerRegistry,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::unbounded_channel();
        tokio::spawn(run(url, auth_header, registry, shutdown_rx));
        Self { shutdown_tx }
    }

    /// Signals the connection task to close the socket and stop reconnecting.
    pub(crate) fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

fn build_request(url: &Url, auth_header: Option<&str>) -> Option<Request> {
    let mut request = match url.as_str().into_client_request() {
        Ok(request) => request,
        Err(error) => {
            warn!(%url, %error, "cannot build event channel request");
            return None;
        }
    };
    if let Some(credentials) = auth_header
        && let Ok(value) = HeaderValue::from_str(credentials)
    {
        request.headers_mut().insert(AUTHORIZATION, value);
    }
    Some(request)
}

/// Connect loop: dial, read until the stream ends, back off, repeat.
async fn run(
    url: Url,
    auth_header: Option<String>,
    registry: ListenerRegistry,
    mut shutdown_rx: mpsc::UnboundedReceiver<()>,
) {
    let mut backoff = INITIAL_BACKOFF;
    loop {
        let Some(request) = build_request(&url, auth_header.as_deref()) else {
            return;
        };

        tokio::select! {
            _ = shutdown_rx.recv() => break,
            attempt = connect_async(request) => match attempt {
                Ok((stream, _)) => {
                    debug!(%url, "event channel connected");
                    backoff = INITIAL_BACKOFF;
                    if read_frames(stream, &registry, &mut shutdown_rx).await.is_break() {
                        break;
                    }
                }
                Err(error) => {
                    warn!(%url, %error, "event channel connect failed");
                }
            }
        }

        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = tokio::time::sleep(backoff) => {}
        }
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
    debug!(%url, "event channel closed");
}

/// Reads frames until the stream ends (reconnect) or shutdown is requested.
async fn read_frames(
    mut stream: Stream,
    registry: &ListenerRegistry,
    shutdown_rx: &mut mpsc::UnboundedReceiver<()>,
) -> ControlFlow<()> {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                let _ = stream.close(None).await;
                return ControlFlow::Break(());
            }
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => decode_frame(registry, text.as_str()),
                Some(Ok(Message::Close(_))) | None => {
                    debug!("event channel closed by server");
                    return ControlFlow::Continue(());
                }
                Some(Err(error)) => {
                    warn!(%error, "event channel read failed");
                    return ControlFlow::Continue(());
                }
                // Binary, Ping, Pong and raw frames carry no events.
                Some(Ok(_)) => {}
            }
        }
    }
}
