//! Session configuration types.
//!
//! [`SessionConfig`] is the single source of truth for all runtime settings.
//! `main.rs` builds it from command-line arguments; tests build it directly
//! with [`SessionConfig::new`] and adjust the fields they care about.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Errors detected while assembling a [`SessionConfig`].
///
/// Any of these aborts startup before a connection is attempted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Neither a combined device path nor separate input/output paths were given.
    #[error("either --input-output or both --input and --output must be provided")]
    MissingDevice,

    /// A combined device path was given together with separate paths.
    #[error("--input-output cannot be combined with --input or --output")]
    ConflictingDevice,

    /// Only one of `--input` / `--output` was given.
    #[error("--{0} is required when using separate input and output paths")]
    IncompleteDevice(&'static str),

    /// The remote URL does not use the `ws` or `wss` scheme.
    #[error("invalid WebSocket URL '{0}': expected a ws:// or wss:// URL")]
    InvalidUrl(String),

    /// The retry budget must allow at least one attempt.
    #[error("--max-attempts must be at least 1")]
    NoAttempts,
}

// ── Device paths ──────────────────────────────────────────────────────────────

/// Where the terminal keyboard is read from and the screen written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DevicePaths {
    /// One path used for both directions, e.g. `/dev/ttyUSB0`.
    Combined(PathBuf),
    /// Distinct keyboard and screen paths.
    Separate { input: PathBuf, output: PathBuf },
}

impl DevicePaths {
    /// Validates the mutually exclusive device options.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingDevice`] when nothing is given.
    /// - [`ConfigError::ConflictingDevice`] when both forms are given.
    /// - [`ConfigError::IncompleteDevice`] when only one separate path is given.
    pub fn from_options(
        combined: Option<PathBuf>,
        input: Option<PathBuf>,
        output: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        match (combined, input, output) {
            (Some(path), None, None) => Ok(Self::Combined(path)),
            (Some(_), _, _) => Err(ConfigError::ConflictingDevice),
            (None, Some(input), Some(output)) => Ok(Self::Separate { input, output }),
            (None, Some(_), None) => Err(ConfigError::IncompleteDevice("output")),
            (None, None, Some(_)) => Err(ConfigError::IncompleteDevice("input")),
            (None, None, None) => Err(ConfigError::MissingDevice),
        }
    }

    /// Path the keyboard bytes are read from.
    pub fn keyboard(&self) -> &Path {
        match self {
            Self::Combined(path) => path,
            Self::Separate { input, .. } => input,
        }
    }

    /// Path the screen bytes are written to.
    pub fn screen(&self) -> &Path {
        match self {
            Self::Combined(path) => path,
            Self::Separate { output, .. } => output,
        }
    }
}

// ── Handshake and retry policies ──────────────────────────────────────────────

/// Local echo command sent during the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalEcho {
    On,
    #[default]
    Off,
    /// Send no local echo command at all.
    Neither,
}

/// How the session handshake talks to the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakePolicy {
    /// Upper bound on the wait for a command reply.  The handshake never
    /// blocks longer than this per command, even if the terminal stays silent.
    pub reply_timeout: Duration,
    /// Hide the cursor and clear the screen once the terminal is configured.
    pub reset_screen: bool,
}

impl Default for HandshakePolicy {
    fn default() -> Self {
        Self {
            reply_timeout: Duration::from_secs(1),
            reset_screen: true,
        }
    }
}

/// Bounded retry budget of the reconnect supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Number of connection attempts before the supervisor gives up and idles.
    pub max_attempts: u32,
    /// Fixed pause after every attempt, whatever its outcome.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    /// | Field        | Default    |
    /// |--------------|------------|
    /// | max_attempts | 10         |
    /// | delay        | 10 seconds |
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay: Duration::from_secs(10),
        }
    }
}

// ── Logging ───────────────────────────────────────────────────────────────────

/// Verbosity selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    /// Disable logging entirely.
    None,
}

impl LogLevel {
    /// The `tracing_subscriber::EnvFilter` directive for this level.
    pub fn filter_directive(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::None => "off",
        }
    }
}

// ── Session configuration ─────────────────────────────────────────────────────

/// All runtime configuration for one terminal session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Remote WebSocket endpoint, `ws://` or `wss://`.
    pub url: String,
    /// Terminal keyboard and screen paths.
    pub device: DevicePaths,
    /// Local echo command sent during the handshake.
    pub local_echo: LocalEcho,
    /// Directory receiving `frame-NNN.vdt` captures; `None` disables capture.
    pub capture_dir: Option<PathBuf>,
    pub handshake: HandshakePolicy,
    pub retry: RetryPolicy,
    /// Interval between WebSocket Ping frames; `None` disables keep-alive.
    pub ping_interval: Option<Duration>,
    /// Upper bound on establishing one WebSocket connection.
    pub connect_timeout: Duration,
    /// Accept TLS certificates that fail validation.
    pub accept_invalid_certs: bool,
}

impl SessionConfig {
    /// Builds a configuration with default policies.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] if `url` is not a WebSocket URL.
    ///
    /// # Example
    ///
    /// ```rust
    /// use ws_to_minitel::domain::{DevicePaths, SessionConfig};
    ///
    /// let cfg = SessionConfig::new(
    ///     "wss://example.test/ws",
    ///     DevicePaths::Combined("/dev/ttyUSB0".into()),
    /// )
    /// .unwrap();
    /// assert_eq!(cfg.retry.max_attempts, 10);
    /// ```
    pub fn new(url: impl Into<String>, device: DevicePaths) -> Result<Self, ConfigError> {
        let url = url.into();
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(ConfigError::InvalidUrl(url));
        }
        Ok(Self {
            url,
            device,
            local_echo: LocalEcho::default(),
            capture_dir: None,
            handshake: HandshakePolicy::default(),
            retry: RetryPolicy::default(),
            ping_interval: Some(Duration::from_secs(30)),
            connect_timeout: Duration::from_secs(15),
            accept_invalid_certs: false,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn tty() -> Option<PathBuf> {
        Some(PathBuf::from("/dev/ttyUSB0"))
    }

    #[test]
    fn test_combined_path_is_used_for_both_directions() {
        // Arrange / Act
        let paths = DevicePaths::from_options(tty(), None, None).unwrap();

        // Assert
        assert_eq!(paths.keyboard(), Path::new("/dev/ttyUSB0"));
        assert_eq!(paths.screen(), Path::new("/dev/ttyUSB0"));
    }

    #[test]
    fn test_separate_paths_are_kept_apart() {
        let paths = DevicePaths::from_options(
            None,
            Some("/dev/ttyUSB0".into()),
            Some("/dev/ttyUSB1".into()),
        )
        .unwrap();

        assert_eq!(paths.keyboard(), Path::new("/dev/ttyUSB0"));
        assert_eq!(paths.screen(), Path::new("/dev/ttyUSB1"));
    }

    #[test]
    fn test_no_device_option_is_rejected() {
        assert_eq!(
            DevicePaths::from_options(None, None, None),
            Err(ConfigError::MissingDevice)
        );
    }

    #[test]
    fn test_combined_and_separate_paths_conflict() {
        let result = DevicePaths::from_options(tty(), Some("/dev/in".into()), Some("/dev/out".into()));
        assert_eq!(result, Err(ConfigError::ConflictingDevice));
    }

    #[test]
    fn test_combined_with_single_separate_path_conflicts() {
        let result = DevicePaths::from_options(tty(), None, Some("/dev/out".into()));
        assert_eq!(result, Err(ConfigError::ConflictingDevice));
    }

    #[test]
    fn test_input_without_output_is_incomplete() {
        let result = DevicePaths::from_options(None, Some("/dev/in".into()), None);
        assert_eq!(result, Err(ConfigError::IncompleteDevice("output")));
    }

    #[test]
    fn test_output_without_input_is_incomplete() {
        let result = DevicePaths::from_options(None, None, Some("/dev/out".into()));
        assert_eq!(result, Err(ConfigError::IncompleteDevice("input")));
    }

    #[test]
    fn test_default_retry_policy_is_ten_attempts_ten_seconds() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 10);
        assert_eq!(policy.delay, Duration::from_secs(10));
    }

    #[test]
    fn test_default_local_echo_is_off() {
        assert_eq!(LocalEcho::default(), LocalEcho::Off);
    }

    #[test]
    fn test_session_config_rejects_http_url() {
        let result = SessionConfig::new("https://example.test", DevicePaths::Combined("/dev/tty".into()));
        assert!(matches!(result, Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_session_config_defaults() {
        // Arrange / Act
        let cfg = SessionConfig::new("ws://127.0.0.1:8080/ws", DevicePaths::Combined("/dev/tty".into()))
            .unwrap();

        // Assert
        assert_eq!(cfg.local_echo, LocalEcho::Off);
        assert!(cfg.capture_dir.is_none());
        assert_eq!(cfg.ping_interval, Some(Duration::from_secs(30)));
        assert!(cfg.handshake.reset_screen);
        assert!(!cfg.accept_invalid_certs);
    }

    #[test]
    fn test_log_level_none_turns_logging_off() {
        assert_eq!(LogLevel::None.filter_directive(), "off");
        assert_eq!(LogLevel::default().filter_directive(), "info");
    }
}
