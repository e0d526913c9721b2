//! Backend push notifications and the page refreshes they drive.

mod event;
mod frame;
mod bridge;
mod refresh;

pub use event::{EventKind, RealtimeEvent};
pub use frame::{decode_frame, Frame, ENGINE_IO_PONG, SOCKET_IO_CONNECT};
pub use bridge::{ConnectionManager, Connector, Disconnect, FrameSink, FrameStream, Inbound, TransportError, WsConnector};
pub use refresh::{refresh_on, EventFilter, RefreshTrigger};
