//! ws-to-minitel: entry point.
//!
//! Connects a Minitel terminal on a serial line to a remote WebSocket
//! service.  Keystrokes are sent to the service; every frame it sends back is
//! written to the screen as is.
//!
//! # Usage
//!
//! ```text
//! ws-to-minitel --url <URL> (--input-output <PATH> | --input <PATH> --output <PATH>) [OPTIONS]
//!
//! Options:
//!   -u, --url <URL>                WebSocket URL (ws:// or wss://)
//!   -t, --input-output <PATH>      device used for both keyboard and screen
//!   -i, --input <PATH>             keyboard device
//!   -o, --output <PATH>            screen device
//!   -e, --local-echo <MODE>        on | off | neither            [default: off]
//!   -s, --save-frames <DIR>        save every received frame as DIR/frame-NNN.vdt
//!   -l, --log-level <LEVEL>        debug | info | warn | error | none [default: info]
//!       --max-attempts <N>         connection attempts before idling [default: 10]
//!       --retry-delay <SECS>       pause after every attempt         [default: 10]
//!       --ping-interval <SECS>     keep-alive ping period, 0 = off   [default: 30]
//!       --insecure                 accept invalid TLS certificates
//!       --keep-screen              do not clear the screen during the handshake
//! ```
//!
//! `RUST_LOG`, when set, overrides `--log-level`.
//!
//! Switching the terminal off and on replays the handshake and starts a new
//! connection budget.  Ctrl+C closes the connection and exits.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ws_to_minitel::application::SessionOrchestrator;
use ws_to_minitel::domain::{
    ConfigError, DevicePaths, LocalEcho, LogLevel, RetryPolicy, SessionConfig,
};
use ws_to_minitel::infrastructure::{FileFrameRecorder, SerialTerminal, TungsteniteConnector};

// ── CLI argument definitions ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LocalEchoArg {
    On,
    Off,
    Neither,
}

impl From<LocalEchoArg> for LocalEcho {
    fn from(arg: LocalEchoArg) -> Self {
        match arg {
            LocalEchoArg::On => LocalEcho::On,
            LocalEchoArg::Off => LocalEcho::Off,
            LocalEchoArg::Neither => LocalEcho::Neither,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevelArg {
    Debug,
    Info,
    Warn,
    Error,
    None,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::None => LogLevel::None,
        }
    }
}

/// Connect a Minitel terminal to a WebSocket service.
#[derive(Debug, Parser)]
#[command(
    name = "ws-to-minitel",
    about = "Bridge between a Minitel terminal and a WebSocket service",
    version
)]
struct Cli {
    /// WebSocket URL of the service, ws:// or wss://.
    #[arg(short, long, env = "WS_TO_MINITEL_URL")]
    url: String,

    /// Device path used for both keyboard input and screen output.
    #[arg(short = 't', long, env = "WS_TO_MINITEL_TTY")]
    input_output: Option<PathBuf>,

    /// Device path the keyboard is read from.
    #[arg(short, long, env = "WS_TO_MINITEL_INPUT")]
    input: Option<PathBuf>,

    /// Device path the screen is written to.
    #[arg(short, long, env = "WS_TO_MINITEL_OUTPUT")]
    output: Option<PathBuf>,

    /// Local echo setting sent to the terminal during the handshake.
    #[arg(
        short = 'e',
        long,
        value_enum,
        default_value_t = LocalEchoArg::Off,
        env = "WS_TO_MINITEL_LOCAL_ECHO"
    )]
    local_echo: LocalEchoArg,

    /// Directory in which every received frame is saved.
    #[arg(short, long, value_name = "DIR", env = "WS_TO_MINITEL_SAVE_FRAMES")]
    save_frames: Option<PathBuf>,

    /// Log verbosity; RUST_LOG takes precedence when set.
    #[arg(
        short,
        long,
        value_enum,
        default_value_t = LogLevelArg::Info,
        env = "WS_TO_MINITEL_LOG_LEVEL"
    )]
    log_level: LogLevelArg,

    /// Connection attempts before giving up until the next power-on.
    #[arg(long, default_value_t = 10, env = "WS_TO_MINITEL_MAX_ATTEMPTS")]
    max_attempts: u32,

    /// Seconds to wait after every connection attempt.
    #[arg(long, default_value_t = 10, env = "WS_TO_MINITEL_RETRY_DELAY")]
    retry_delay: u64,

    /// Seconds between keep-alive pings; 0 disables them.
    #[arg(long, default_value_t = 30, env = "WS_TO_MINITEL_PING_INTERVAL")]
    ping_interval: u64,

    /// Accept TLS certificates that fail validation.  Off by default:
    /// self-signed `wss://` servers need this flag.
    #[arg(long, env = "WS_TO_MINITEL_INSECURE")]
    insecure: bool,

    /// Do not hide the cursor and clear the screen during the handshake.
    #[arg(long)]
    keep_screen: bool,
}

impl Cli {
    /// Converts the parsed arguments into a [`SessionConfig`].
    ///
    /// # Errors
    ///
    /// Invalid device option combinations, a non-WebSocket URL, or a zero
    /// attempt budget.
    fn into_session_config(self) -> Result<SessionConfig, ConfigError> {
        let device = DevicePaths::from_options(self.input_output, self.input, self.output)?;
        if self.max_attempts == 0 {
            return Err(ConfigError::NoAttempts);
        }

        let mut config = SessionConfig::new(self.url, device)?;
        config.local_echo = self.local_echo.into();
        config.capture_dir = self.save_frames;
        config.retry = RetryPolicy {
            max_attempts: self.max_attempts,
            delay: Duration::from_secs(self.retry_delay),
        };
        config.ping_interval = (self.ping_interval > 0).then(|| Duration::from_secs(self.ping_interval));
        config.accept_invalid_certs = self.insecure;
        config.handshake.reset_screen = !self.keep_screen;
        Ok(config)
    }
}

fn init_logging(level: LogLevel) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(level.filter_directive())),
        )
        .init();
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.into());
    info!("ws-to-minitel v{}", env!("CARGO_PKG_VERSION"));

    let config = match cli.into_session_config() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return Err(e.into());
        }
    };
    info!(
        "relaying {} to {} (local echo: {:?})",
        config.device.keyboard().display(),
        config.url,
        config.local_echo
    );
    if let Some(dir) = &config.capture_dir {
        info!("saving received frames to {}", dir.display());
    }

    let terminal = match SerialTerminal::open(&config.device).await {
        Ok(terminal) => Arc::new(terminal),
        Err(e) => {
            error!("{e}");
            return Err(e).context("cannot open the terminal device");
        }
    };
    let connector = Arc::new(
        TungsteniteConnector::from_config(&config).context("cannot set up the WebSocket client")?,
    );
    let recorder = Arc::new(FileFrameRecorder::new(config.capture_dir.clone()));

    // ── Graceful shutdown ─────────────────────────────────────────────────────
    let shutdown = CancellationToken::new();
    let on_ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, shutting down");
                on_ctrl_c.cancel();
            }
            Err(e) => error!("failed to listen for Ctrl+C: {e}"),
        }
    });

    let session = SessionOrchestrator::new(config, terminal, connector, recorder);
    if let Err(e) = session.run(shutdown).await {
        error!("session ended: {e}");
        return Err(e.into());
    }

    info!("ws-to-minitel stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
