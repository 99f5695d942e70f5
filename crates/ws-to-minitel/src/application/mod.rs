//! Application layer for ws-to-minitel.
//!
//! Orchestrates the session: the terminal handshake, the relay between one
//! WebSocket connection and the terminal, the bounded reconnect loop and the
//! restart on power-on.  I/O is reached only through the [`ports`] traits.

pub mod error;
pub mod handshake;
pub mod orchestrator;
pub mod ports;
pub mod relay;
pub mod supervisor;

pub use error::{DeviceError, RecorderError, SessionError, TransportError};
pub use handshake::Handshake;
pub use orchestrator::SessionOrchestrator;
pub use ports::{Connector, FrameRecorder, KeyboardChunk, Terminal, WsTransport};
pub use relay::Relay;
pub use supervisor::ReconnectSupervisor;
