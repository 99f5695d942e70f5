//! Domain layer for ws-to-minitel.
//!
//! Pure types with no I/O: the session configuration, the frame naming rule
//! used by captures and the process-wide frame counter.
//!
//! # What does NOT belong here?
//!
//! - Any `tokio`, file or WebSocket types
//! - Environment variable or command-line reading

pub mod config;
pub mod frame;
pub mod sequence;

pub use config::{
    ConfigError, DevicePaths, HandshakePolicy, LocalEcho, LogLevel, RetryPolicy, SessionConfig,
};
pub use frame::{frame_file_name, FrameKind};
pub use sequence::FrameCounter;
