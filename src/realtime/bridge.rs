//! Connection manager for the backend's push channel.
//!
//! Responsibilities:
//! - Own at most one transport connection, handed to pages by composition.
//! - Map every inbound frame to one [`RealtimeEvent`] and deliver it, in receipt order,
//!   to the caller's callback from the connection task.
//! - Report lifecycle transitions (`connected`, `error`, `disconnected`) as events.
//! - Re-dial with the fixed [`ReconnectPolicy`] (constant delay, bounded attempts).
//!
//! A transport that cannot be prepared never surfaces as an error: `connect` hands back a
//! no-op [`Disconnect`] and the page falls back to manual refresh.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::future::{self, BoxFuture};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use reqwest::Url;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, trace, warn};

use super::event::RealtimeEvent;
use super::frame::{decode_frame, Frame, ENGINE_IO_PONG, SOCKET_IO_CONNECT};
use crate::config::{Config, ReconnectPolicy};
use crate::error::AppError;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid realtime url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("unsupported realtime scheme '{0}', expected ws or wss")]
    UnsupportedScheme(String),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

impl From<TransportError> for AppError {
    fn from(e: TransportError) -> Self {
        AppError::Transport { code: "realtime_transport".into(), message: e.to_string() }
    }
}

/// Inbound item produced by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Text(String),
    Close,
}

pub type FrameSink = Pin<Box<dyn Sink<String, Error = TransportError> + Send>>;
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Inbound, TransportError>> + Send>>;

/// Transport seam. `prepare` runs once per `connect`; `dial` runs for every (re)connection.
pub trait Connector: Send + Sync + 'static {
    fn prepare(&self, url: &str) -> Result<(), TransportError>;
    fn dial(&self, url: &str) -> BoxFuture<'static, Result<(FrameSink, FrameStream), TransportError>>;
}

/// socket.io-compatible websocket transport.
#[derive(Debug, Clone)]
pub struct WsConnector {
    /// Speak the Engine.IO v4 handshake (`/socket.io/` path, `40` connect packet)
    pub engine_io: bool,
}

impl Default for WsConnector {
    fn default() -> Self { Self { engine_io: true } }
}

impl WsConnector {
    pub fn plain() -> Self { Self { engine_io: false } }

    pub fn endpoint(&self, url: &str) -> Result<Url, TransportError> {
        let mut u = Url::parse(url)
            .map_err(|e| TransportError::InvalidUrl { url: url.to_string(), reason: e.to_string() })?;
        match u.scheme() {
            "ws" | "wss" => {}
            other => return Err(TransportError::UnsupportedScheme(other.to_string())),
        }
        if self.engine_io && (u.path().is_empty() || u.path() == "/") {
            u.set_path("/socket.io/");
            u.set_query(Some("EIO=4&transport=websocket"));
        }
        Ok(u)
    }
}

impl Connector for WsConnector {
    fn prepare(&self, url: &str) -> Result<(), TransportError> {
        self.endpoint(url).map(|_| ())
    }

    fn dial(&self, url: &str) -> BoxFuture<'static, Result<(FrameSink, FrameStream), TransportError>> {
        let target = self.endpoint(url);
        let engine_io = self.engine_io;
        Box::pin(async move {
            let target = target?;
            let (ws, _resp) = tokio_tungstenite::connect_async(target.as_str()).await?;
            let (mut sink, stream) = ws.split();
            if engine_io {
                sink.send(Message::Text(SOCKET_IO_CONNECT.to_string())).await?;
            }
            let sink: FrameSink = Box::pin(
                sink.sink_map_err(TransportError::WebSocket)
                    .with(|text: String| future::ready(Ok::<_, TransportError>(Message::Text(text)))),
            );
            let stream: FrameStream = Box::pin(stream.filter_map(|msg| {
                future::ready(match msg {
                    Ok(Message::Text(t)) => Some(Ok(Inbound::Text(t))),
                    Ok(Message::Close(_)) => Some(Ok(Inbound::Close)),
                    Ok(_) => None,
                    Err(e) => Some(Err(TransportError::WebSocket(e))),
                })
            }));
            Ok((sink, stream))
        })
    }
}

type EventCallback = Box<dyn FnMut(RealtimeEvent) + Send>;

/// Shared between the manager and its `Disconnect` handles. The connection task holds only
/// the `connected` flag, so once every owner is gone the stop sender drops and the task ends.
struct Connection {
    connected: Arc<AtomicBool>,
    stop: watch::Sender<bool>,
    task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Connection {
    /// Stop the connection task and wait for it, so the callback is never invoked again
    /// once this returns.
    async fn shutdown(&self) {
        self.stop.send_replace(true);
        let mut task = self.task.lock().await;
        if let Some(handle) = task.take() {
            if let Err(e) = handle.await {
                warn!(target: "facepay::realtime", "realtime task ended abnormally: {}", e);
            }
        }
        self.connected.store(false, Ordering::SeqCst);
    }
}

/// Capability returned by [`ConnectionManager::connect`].
pub struct Disconnect {
    conn: Option<Arc<Connection>>,
}

impl Disconnect {
    pub fn noop() -> Self { Self { conn: None } }

    pub fn is_noop(&self) -> bool { self.conn.is_none() }

    /// Tear the transport down. No events are delivered after this returns; refreshes
    /// already started by earlier events keep running.
    pub async fn disconnect(self) {
        match self.conn {
            Some(conn) => {
                info!(target: "facepay::realtime", "disconnecting realtime channel");
                conn.shutdown().await;
            }
            None => debug!(target: "facepay::realtime", "no realtime connection to disconnect"),
        }
    }
}

/// Owns the single realtime connection of the page that created it.
pub struct ConnectionManager {
    url: String,
    policy: ReconnectPolicy,
    connector: Arc<dyn Connector>,
    active: Option<Arc<Connection>>,
}

impl ConnectionManager {
    pub fn new(config: &Config) -> Self {
        Self::with_connector(config.ws_url.clone(), config.reconnect.clone(), Arc::new(WsConnector::default()))
    }

    pub fn with_connector(url: impl Into<String>, policy: ReconnectPolicy, connector: Arc<dyn Connector>) -> Self {
        Self { url: url.into(), policy, connector, active: None }
    }

    pub fn url(&self) -> &str { &self.url }

    pub fn is_connected(&self) -> bool {
        self.active.as_ref().map(|c| c.connected.load(Ordering::SeqCst)).unwrap_or(false)
    }

    /// Open the channel and start delivering events to `on_event`.
    ///
    /// A connection already owned by this manager is shut down first. Never fails: when
    /// the transport cannot be prepared the returned handle is a no-op.
    pub async fn connect<F>(&mut self, on_event: F) -> Disconnect
    where
        F: FnMut(RealtimeEvent) + Send + 'static,
    {
        if let Some(prev) = self.active.take() {
            warn!(target: "facepay::realtime", "connect called with an active connection, replacing it");
            prev.shutdown().await;
        }
        if let Err(e) = self.connector.prepare(&self.url) {
            warn!(target: "facepay::realtime", "realtime transport unavailable, manual refresh only: {}", e);
            return Disconnect::noop();
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(target: "facepay::realtime", "no async runtime, realtime disabled");
            return Disconnect::noop();
        };

        let (stop, stop_rx) = watch::channel(false);
        let connected = Arc::new(AtomicBool::new(false));
        let conn = Arc::new(Connection {
            connected: connected.clone(),
            stop,
            task: tokio::sync::Mutex::new(None),
        });
        let handle = runtime.spawn(run_connection(
            self.connector.clone(),
            self.url.clone(),
            self.policy.clone(),
            Box::new(on_event),
            stop_rx,
            connected,
        ));
        *conn.task.lock().await = Some(handle);
        self.active = Some(conn.clone());
        Disconnect { conn: Some(conn) }
    }

    /// Shut down whatever connection this manager currently owns.
    pub async fn disconnect(&mut self) {
        if let Some(conn) = self.active.take() {
            conn.shutdown().await;
            info!(target: "facepay::realtime", "realtime channel disconnected manually");
        }
    }
}

impl Drop for ConnectionManager {
    /// Dropping the manager stops delivery. The task winds down on its own; use
    /// [`ConnectionManager::disconnect`] to wait for it.
    fn drop(&mut self) {
        if let Some(conn) = self.active.take() {
            debug!(target: "facepay::realtime", "connection manager dropped, stopping realtime channel");
            conn.stop.send_replace(true);
        }
    }
}

enum SessionEnd {
    Stopped,
    Lost,
}

async fn run_connection(
    connector: Arc<dyn Connector>,
    url: String,
    policy: ReconnectPolicy,
    mut on_event: EventCallback,
    mut stop_rx: watch::Receiver<bool>,
    connected: Arc<AtomicBool>,
) {
    let mut attempts: u32 = 0;
    loop {
        if *stop_rx.borrow() { return; }

        let dialed = tokio::select! {
            biased;
            _ = stop_rx.changed() => return,
            r = connector.dial(&url) => r,
        };

        match dialed {
            Ok((mut sink, mut stream)) => {
                attempts = 0;
                connected.store(true, Ordering::SeqCst);
                info!(target: "facepay::realtime", "realtime connected to {}", url);
                on_event(RealtimeEvent::connected());

                let end = loop {
                    let item = tokio::select! {
                        biased;
                        _ = stop_rx.changed() => break SessionEnd::Stopped,
                        item = stream.next() => item,
                    };
                    match item {
                        Some(Ok(Inbound::Text(text))) => match decode_frame(&text) {
                            Frame::Event(ev) => {
                                debug!(target: "facepay::realtime", "event {}", ev.kind);
                                on_event(ev);
                            }
                            Frame::Ping => {
                                if let Err(e) = sink.send(ENGINE_IO_PONG.to_string()).await {
                                    warn!(target: "facepay::realtime", "failed to answer ping: {}", e);
                                    break SessionEnd::Lost;
                                }
                            }
                            Frame::Disconnect => break SessionEnd::Lost,
                            Frame::Ignored => trace!(target: "facepay::realtime", "ignored frame: {}", text),
                        },
                        Some(Ok(Inbound::Close)) | None => break SessionEnd::Lost,
                        Some(Err(e)) => {
                            warn!(target: "facepay::realtime", "realtime stream error: {}", e);
                            break SessionEnd::Lost;
                        }
                    }
                };

                connected.store(false, Ordering::SeqCst);
                match end {
                    SessionEnd::Stopped => {
                        if let Err(e) = sink.close().await {
                            debug!(target: "facepay::realtime", "closing realtime transport failed: {}", e);
                        }
                        on_event(RealtimeEvent::disconnected());
                        return;
                    }
                    SessionEnd::Lost => {
                        warn!(target: "facepay::realtime", "realtime connection to {} lost", url);
                        on_event(RealtimeEvent::disconnected());
                    }
                }
            }
            Err(e) => {
                warn!(target: "facepay::realtime", "realtime connection error: {}", e);
                on_event(RealtimeEvent::error());
            }
        }

        attempts += 1;
        if attempts > policy.max_attempts {
            warn!(target: "facepay::realtime", "giving up on {} after {} reconnection attempts", url, policy.max_attempts);
            return;
        }
        tokio::select! {
            biased;
            _ = stop_rx.changed() => return,
            _ = tokio::time::sleep(policy.delay()) => {}
        }
    }
}
