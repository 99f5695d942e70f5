//! Infrastructure layer: adapters behind the application ports.
//!
//! - [`device`]: the terminal over serial device files (plus a test mock)
//! - [`ws_client`]: WebSocket connections via tokio-tungstenite
//! - [`recorder`]: frame captures on disk

pub mod device;
pub mod recorder;
pub mod ws_client;

pub use device::SerialTerminal;
pub use recorder::FileFrameRecorder;
pub use ws_client::{TungsteniteConnector, WsStream};
