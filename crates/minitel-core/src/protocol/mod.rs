//! Protocol module containing control sequences and the keyboard decoder.

pub mod control;
pub mod keyboard;

pub use control::{DeviceProfile, ProtocolCommand};
pub use keyboard::{KeyboardDecoder, KeyboardInput, SystemEvent};
