//! Inbound text frame decoding.
//!
//! Two shapes are accepted:
//! - socket.io over Engine.IO v4 (`2` ping, `40` connect ack, `41` disconnect,
//!   `42[/ns,][ack]["name", payload]` events);
//! - plain JSON envelopes `{"event" | "type": name, "payload" | "data": ...}`.

use serde_json::Value;

use super::event::{EventKind, RealtimeEvent};

pub const ENGINE_IO_PONG: &str = "3";
pub const SOCKET_IO_CONNECT: &str = "40";

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Engine.IO heartbeat; answer with [`ENGINE_IO_PONG`]
    Ping,
    /// Server closed the socket.io session
    Disconnect,
    Event(RealtimeEvent),
    /// Open/ack/noop frames and events nobody subscribed to
    Ignored,
}

pub fn decode_frame(text: &str) -> Frame {
    let text = text.trim();
    if text.starts_with('{') {
        return decode_envelope(text);
    }
    match text.as_bytes().first() {
        Some(b'2') => Frame::Ping,
        Some(b'4') => decode_socket_io(&text[1..]),
        _ => Frame::Ignored,
    }
}

fn decode_socket_io(packet: &str) -> Frame {
    match packet.as_bytes().first() {
        Some(b'1') => Frame::Disconnect,
        Some(b'2') => {
            let mut body = &packet[1..];
            // optional namespace, terminated by ','
            if body.starts_with('/') {
                body = match body.split_once(',') { Some((_, rest)) => rest, None => return Frame::Ignored };
            }
            let body = body.trim_start_matches(|c: char| c.is_ascii_digit());
            match serde_json::from_str::<Vec<Value>>(body) {
                Ok(items) => {
                    let mut it = items.into_iter();
                    let name = it.next();
                    let payload = it.next().unwrap_or(Value::Null);
                    match name.as_ref().and_then(Value::as_str) {
                        Some(n) => named(n, payload),
                        None => Frame::Ignored,
                    }
                }
                Err(_) => Frame::Ignored,
            }
        }
        _ => Frame::Ignored,
    }
}

fn decode_envelope(text: &str) -> Frame {
    let Ok(Value::Object(mut obj)) = serde_json::from_str::<Value>(text) else { return Frame::Ignored };
    let name = obj
        .get("event")
        .or_else(|| obj.get("type"))
        .and_then(Value::as_str)
        .map(str::to_string);
    let payload = obj.remove("payload").or_else(|| obj.remove("data")).unwrap_or(Value::Null);
    match name {
        Some(n) => named(&n, payload),
        None => Frame::Ignored,
    }
}

fn named(name: &str, payload: Value) -> Frame {
    match EventKind::from_wire(name) {
        Some(kind) => Frame::Event(RealtimeEvent::new(kind, payload)),
        None => Frame::Ignored,
    }
}
