//! Ports: the capabilities the session needs from the outside world.
//!
//! The application layer drives a terminal, opens WebSocket connections and
//! saves frames, but never knows *how*.  Production adapters live in the
//! infrastructure layer; tests plug in mocks.

use async_trait::async_trait;
use futures_util::{Sink, Stream};
use minitel_core::SystemEvent;
use tokio::sync::{broadcast, watch};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use super::error::{DeviceError, RecorderError, TransportError};

/// One read from the keyboard line, with system sequences already removed.
pub type KeyboardChunk = Result<Vec<u8>, DeviceError>;

/// The terminal device: keyboard input, screen output and system events.
#[async_trait]
pub trait Terminal: Send + Sync {
    /// Subscribes to keyboard chunks read from now on.
    ///
    /// Chunks read while nobody is subscribed are dropped; a relay only sees
    /// what is typed during its own connection.  Once the keyboard line has
    /// failed, a new subscription yields that error first.
    fn keyboard(&self) -> broadcast::Receiver<KeyboardChunk>;

    /// Holds the keyboard read failure, if any.  Latched: it stays set once
    /// the line has failed, whoever was subscribed at the time.
    fn keyboard_failure(&self) -> watch::Receiver<Option<DeviceError>>;

    /// Subscribes to system events (power-on) emitted from now on.
    fn system_events(&self) -> broadcast::Receiver<SystemEvent>;

    /// Writes `bytes` to the screen and flushes them.
    async fn write(&self, bytes: &[u8]) -> Result<(), DeviceError>;
}

/// A live WebSocket connection: a stream of inbound messages and a sink for
/// outbound ones.
pub trait WsTransport:
    Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError> + Unpin + Send
{
}

impl<T> WsTransport for T where
    T: Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError> + Unpin + Send
{
}

/// Opens WebSocket connections to the remote service.
#[cfg_attr(test, mockall::automock(type Stream = crate::infrastructure::ws_client::WsStream;))]
#[async_trait]
pub trait Connector: Send + Sync {
    type Stream: WsTransport + 'static;

    /// Connects to `url` and completes the WebSocket handshake.
    async fn connect(&self, url: &str) -> Result<Self::Stream, TransportError>;
}

/// Persists inbound frames for later replay.
#[async_trait]
pub trait FrameRecorder: Send + Sync {
    /// Saves `payload` as frame number `sequence`.  A no-op when capture is off.
    async fn record(&self, sequence: u64, payload: &[u8]) -> Result<(), RecorderError>;
}
