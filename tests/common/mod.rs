//! Shared helpers for the integration tests: an in-memory transport and an event recorder.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use futures::channel::mpsc as fmpsc;
use futures::future::BoxFuture;
use futures::SinkExt;
use tokio::sync::mpsc;

use facepay::realtime::{Connector, FrameSink, FrameStream, Inbound, RealtimeEvent, TransportError};

/// Server side of one dialed in-memory connection.
pub struct Link {
    pub inbound: fmpsc::UnboundedSender<Result<Inbound, TransportError>>,
    pub outbound: fmpsc::UnboundedReceiver<String>,
}

impl Link {
    pub fn push(&self, text: &str) {
        let _ = self.inbound.unbounded_send(Ok(Inbound::Text(text.to_string())));
    }

    pub fn close(&self) {
        let _ = self.inbound.unbounded_send(Ok(Inbound::Close));
    }
}

/// Connector whose connections are in-memory channels handed to the test.
pub struct ChannelConnector {
    links: mpsc::UnboundedSender<Link>,
    dials: Arc<AtomicUsize>,
    refuse_dial: Arc<AtomicBool>,
    refuse_prepare: bool,
}

impl ChannelConnector {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Link>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { links: tx, dials: Arc::new(AtomicUsize::new(0)), refuse_dial: Arc::new(AtomicBool::new(false)), refuse_prepare: false }, rx)
    }

    /// Every dial fails, as if the backend were down.
    pub fn unreachable() -> Self {
        let (c, _rx) = Self::new();
        c.refuse_dial.store(true, Ordering::SeqCst);
        c
    }

    /// The transport cannot even be set up.
    pub fn unavailable() -> Self {
        let (mut c, _rx) = Self::new();
        c.refuse_prepare = true;
        c
    }

    pub fn dial_counter(&self) -> Arc<AtomicUsize> { self.dials.clone() }

    /// Switch that makes subsequent dials fail while set.
    pub fn outage_switch(&self) -> Arc<AtomicBool> { self.refuse_dial.clone() }
}

impl Connector for ChannelConnector {
    fn prepare(&self, _url: &str) -> Result<(), TransportError> {
        if self.refuse_prepare {
            return Err(TransportError::Unavailable("no transport in this environment".into()));
        }
        Ok(())
    }

    fn dial(&self, _url: &str) -> BoxFuture<'static, Result<(FrameSink, FrameStream), TransportError>> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        if self.refuse_dial.load(Ordering::SeqCst) {
            return Box::pin(async { Err(TransportError::Unavailable("connection refused".into())) });
        }
        let (in_tx, in_rx) = fmpsc::unbounded();
        let (out_tx, out_rx) = fmpsc::unbounded::<String>();
        let _ = self.links.send(Link { inbound: in_tx, outbound: out_rx });
        let sink: FrameSink = Box::pin(out_tx.sink_map_err(|e| TransportError::Unavailable(e.to_string())));
        let stream: FrameStream = Box::pin(in_rx);
        Box::pin(async move { Ok((sink, stream)) })
    }
}

/// Callback that forwards every delivered event into a channel.
pub fn recorder() -> (impl FnMut(RealtimeEvent) + Send + 'static, mpsc::UnboundedReceiver<RealtimeEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (move |ev| { let _ = tx.send(ev); }, rx)
}

pub async fn next_event(rx: &mut mpsc::UnboundedReceiver<RealtimeEvent>) -> RealtimeEvent {
    match tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv()).await {
        Ok(Some(ev)) => ev,
        Ok(None) => panic!("event channel closed"),
        Err(_) => panic!("timed out waiting for event"),
    }
}
