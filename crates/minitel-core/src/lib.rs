//! # minitel-core
//!
//! Shared description of the Minitel videotex terminal as seen from a serial
//! line: the control characters, the fixed command sequences sent during a
//! session handshake, and an incremental decoder that separates keystrokes
//! from the system sequences the terminal emits on its own (for instance
//! when it is switched on).
//!
//! This crate performs no I/O.  The bridge (`ws-to-minitel`) owns the
//! device handles and only asks this crate *which* bytes to send and *what*
//! the bytes it reads mean.
//!
//! # Layout
//!
//! - **`protocol::control`** – control characters, [`ProtocolCommand`] and the
//!   [`DeviceProfile`] grouping the handshake commands.
//! - **`protocol::keyboard`** – [`KeyboardDecoder`], turning the raw keyboard
//!   byte stream into [`KeyboardInput`] items.

pub mod protocol;

pub use protocol::control::{DeviceProfile, ProtocolCommand};
pub use protocol::keyboard::{KeyboardDecoder, KeyboardInput, SystemEvent};
