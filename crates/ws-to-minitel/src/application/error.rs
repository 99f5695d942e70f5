//! Error types of the session layer.
//!
//! Errors are grouped by the leg they come from, because the leg decides
//! what happens next:
//!
//! | Error              | Effect on the session                          |
//! |--------------------|------------------------------------------------|
//! | [`TransportError`] | attempt ends, retried by the supervisor        |
//! | [`RecorderError`]  | attempt ends, retried by the supervisor        |
//! | [`DeviceError`]    | fatal: the session stops and the process exits |
//! | `Cancelled`        | not a failure: a power-on or shutdown request  |

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

/// Failures on the terminal leg.
///
/// `Clone` so a keyboard read failure can be broadcast to every subscriber;
/// the underlying `io::Error` is shared behind an `Arc`.
#[derive(Debug, Clone, Error)]
pub enum DeviceError {
    /// The device path could not be opened.
    #[error("failed to open terminal device {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    /// Reading the keyboard line failed.
    #[error("keyboard read failed: {0}")]
    Read(#[source] Arc<io::Error>),

    /// Writing to the screen line failed.
    #[error("screen write failed: {0}")]
    Write(#[source] Arc<io::Error>),
}

impl DeviceError {
    pub fn open(path: &Path, source: io::Error) -> Self {
        Self::Open {
            path: path.to_path_buf(),
            source: Arc::new(source),
        }
    }

    pub fn read(source: io::Error) -> Self {
        Self::Read(Arc::new(source))
    }

    pub fn write(source: io::Error) -> Self {
        Self::Write(Arc::new(source))
    }
}

/// Failures on the network leg.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The TCP, TLS or WebSocket handshake failed.
    #[error("failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: WsError,
    },

    /// The connection was not established in time.
    #[error("timed out connecting to {url} after {timeout:?}")]
    ConnectTimeout { url: String, timeout: Duration },

    /// The TLS connector could not be built.
    #[error("failed to build TLS connector: {0}")]
    Tls(#[from] native_tls::Error),

    /// Writing a frame failed.
    #[error("failed to send frame: {0}")]
    Send(#[source] WsError),

    /// Reading a frame failed.
    #[error("failed to receive frame: {0}")]
    Receive(#[source] WsError),

    /// The stream ended without the server sending a Close frame.
    #[error("connection dropped without a Close frame")]
    Disconnected,
}

/// Failures while saving a frame capture.
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("failed to write frame capture {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Everything that can end a connection attempt or a whole session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Recorder(#[from] RecorderError),

    /// The attempt was cancelled by the session (power-on or shutdown).
    #[error("session run cancelled")]
    Cancelled,

    /// The supervisor task panicked or was aborted.
    #[error("supervisor task failed: {0}")]
    Task(String),
}

impl SessionError {
    /// Whether the reconnect supervisor should spend another attempt on it.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Recorder(_))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_errors_are_retryable() {
        let err = SessionError::from(TransportError::Disconnected);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_recorder_errors_are_retryable() {
        let err = SessionError::from(RecorderError::Io {
            path: PathBuf::from("/tmp/cap/frame-000.vdt"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        });
        assert!(err.is_retryable());
    }

    #[test]
    fn test_device_errors_are_fatal() {
        let err = SessionError::from(DeviceError::write(io::Error::from(io::ErrorKind::BrokenPipe)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_cancellation_is_not_retried() {
        assert!(!SessionError::Cancelled.is_retryable());
    }

    #[test]
    fn test_device_open_error_names_the_path() {
        let err = DeviceError::open(
            Path::new("/dev/ttyUSB0"),
            io::Error::from(io::ErrorKind::NotFound),
        );
        assert!(err.to_string().contains("/dev/ttyUSB0"));
    }

    #[test]
    fn test_device_error_clone_shares_source() {
        // Arrange
        let err = DeviceError::read(io::Error::new(io::ErrorKind::Other, "line dropped"));

        // Act
        let cloned = err.clone();

        // Assert
        assert_eq!(err.to_string(), cloned.to_string());
    }
}
