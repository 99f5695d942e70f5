//! Session orchestrator: handshake, supervised relaying and power-on restarts.
//!
//! # Lifecycle
//!
//! ```text
//!   run ──► handshake ──► spawn supervisor ──┬── shutdown ──► stop supervisor, Ok
//!                ▲                           ├── supervisor error ──► Err
//!                │                           ├── keyboard failure ──► stop supervisor, Err
//!                │                           └── power-on
//!                │                                  │
//!                └──────── stop supervisor ◄────────┘
//! ```
//!
//! At most one supervisor (and therefore one connection) is alive at any
//! time: the previous one is cancelled and awaited before the handshake is
//! replayed.  The frame counter is created once and outlives every restart.

use std::sync::Arc;
use std::time::Duration;

use minitel_core::{DeviceProfile, SystemEvent};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::error::SessionError;
use super::handshake::Handshake;
use super::ports::{Connector, FrameRecorder, Terminal};
use super::relay::Relay;
use super::supervisor::ReconnectSupervisor;
use crate::domain::{FrameCounter, SessionConfig};

/// Upper bound on a cancelled supervisor winding down before it is aborted.
const STOP_GRACE: Duration = Duration::from_secs(5);

/// A spawned supervisor and the token that stops it.
struct SupervisedRun {
    cancel: CancellationToken,
    handle: JoinHandle<Result<(), SessionError>>,
}

impl SupervisedRun {
    async fn stop(mut self) {
        self.cancel.cancel();
        match timeout(STOP_GRACE, &mut self.handle).await {
            Ok(Ok(Ok(()))) => debug!("supervisor stopped"),
            Ok(Ok(Err(e))) => warn!("supervisor failed while stopping: {e}"),
            Ok(Err(e)) => warn!("supervisor task ended abnormally: {e}"),
            Err(_) => {
                warn!("supervisor did not stop within {STOP_GRACE:?}, aborting it");
                self.handle.abort();
            }
        }
    }
}

/// Owns the terminal, the adapters and the process-wide frame counter.
pub struct SessionOrchestrator<T, C> {
    config: SessionConfig,
    terminal: Arc<T>,
    connector: Arc<C>,
    recorder: Arc<dyn FrameRecorder>,
    counter: Arc<FrameCounter>,
    handshake: Handshake,
}

impl<T, C> SessionOrchestrator<T, C>
where
    T: Terminal + 'static,
    C: Connector + 'static,
{
    pub fn new(
        config: SessionConfig,
        terminal: Arc<T>,
        connector: Arc<C>,
        recorder: Arc<dyn FrameRecorder>,
    ) -> Self {
        let handshake = Handshake::new(
            DeviceProfile::MINITEL,
            config.local_echo,
            config.handshake.clone(),
        );
        Self {
            config,
            terminal,
            connector,
            recorder,
            counter: Arc::new(FrameCounter::new()),
            handshake,
        }
    }

    /// The counter numbering inbound frames for the life of this session.
    pub fn frame_counter(&self) -> Arc<FrameCounter> {
        Arc::clone(&self.counter)
    }

    /// Runs the session until `shutdown` fires or a fatal error occurs.
    ///
    /// # Errors
    ///
    /// A [`SessionError::Device`] from the handshake, a relay or the keyboard
    /// line, or [`SessionError::Task`] if the supervisor task panicked.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), SessionError> {
        // Subscribed before the first handshake so no power-on is missed.
        let mut system_events = self.terminal.system_events();
        let mut events_open = true;
        let mut keyboard_failure = self.terminal.keyboard_failure();
        let mut failure_open = true;
        let mut run = self.start().await?;

        loop {
            let failed = keyboard_failure.borrow_and_update().clone();
            if let Some(e) = failed {
                error!("terminal keyboard is gone: {e}");
                run.stop().await;
                return Err(e.into());
            }

            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("shutting down session");
                    run.stop().await;
                    return Ok(());
                }
                finished = &mut run.handle => {
                    return match finished {
                        Ok(result) => result,
                        Err(e) => Err(SessionError::Task(e.to_string())),
                    };
                }
                event = system_events.recv(), if events_open => match event {
                    Ok(SystemEvent::TurnedOn) => {
                        info!("terminal switched on, restarting session");
                        run.stop().await;
                        run = self.start().await?;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("missed {skipped} terminal events, restarting session");
                        run.stop().await;
                        run = self.start().await?;
                    }
                    Err(RecvError::Closed) => {
                        debug!("terminal event stream ended");
                        events_open = false;
                    }
                },
                changed = keyboard_failure.changed(), if failure_open => {
                    if changed.is_err() {
                        failure_open = false;
                    }
                }
            }
        }
    }

    /// Replays the handshake and spawns a fresh supervisor.
    async fn start(&self) -> Result<SupervisedRun, SessionError> {
        self.handshake.run(self.terminal.as_ref()).await?;

        let relay = Relay::new(
            Arc::clone(&self.terminal),
            Arc::clone(&self.recorder),
            Arc::clone(&self.counter),
            self.config.ping_interval,
        );
        let supervisor = ReconnectSupervisor::new(
            Arc::clone(&self.connector),
            relay,
            self.config.url.clone(),
            self.config.retry,
        );

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move { supervisor.run(&token).await });
        Ok(SupervisedRun { cancel, handle })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::error::{DeviceError, TransportError};
    use crate::application::ports::MockConnector;
    use crate::domain::{DevicePaths, LocalEcho};
    use crate::infrastructure::device::mock::MockTerminal;
    use crate::infrastructure::device::SerialTerminal;
    use crate::infrastructure::recorder::FileFrameRecorder;
    use minitel_core::ProtocolCommand;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn config() -> SessionConfig {
        let mut config = SessionConfig::new(
            "ws://127.0.0.1:9/ws",
            DevicePaths::Combined("/dev/null".into()),
        )
        .unwrap();
        config.handshake.reset_screen = false;
        config.retry.delay = Duration::from_secs(10);
        config.retry.max_attempts = 3;
        config
    }

    fn orchestrator(
        terminal: Arc<MockTerminal>,
        connector: MockConnector,
    ) -> SessionOrchestrator<MockTerminal, MockConnector> {
        SessionOrchestrator::new(
            config(),
            terminal,
            Arc::new(connector),
            Arc::new(FileFrameRecorder::disabled()),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_handshake_failure_is_fatal_before_connecting() {
        // Arrange
        let terminal = Arc::new(MockTerminal::new());
        terminal.set_fail_writes(true);
        let mut connector = MockConnector::new();
        connector.expect_connect().never();
        let session = orchestrator(terminal, connector);

        // Act
        let result = session.run(CancellationToken::new()).await;

        // Assert
        assert!(matches!(result, Err(SessionError::Device(DeviceError::Write(_)))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_idle_session_cleanly() {
        // Arrange
        let terminal = Arc::new(MockTerminal::new().answering_commands());
        let mut connector = MockConnector::new();
        connector
            .expect_connect()
            .returning(|_| Err(TransportError::Disconnected));
        let session = orchestrator(terminal, connector);
        let shutdown = CancellationToken::new();
        let trigger = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(120)).await;
            trigger.cancel();
        });

        // Act
        let result = session.run(shutdown).await;

        // Assert
        assert!(result.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_power_on_replays_handshake_and_restarts_budget() {
        // Arrange: every attempt fails; 3 attempts per budget
        let terminal = Arc::new(MockTerminal::new().answering_commands());
        let attempts = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&attempts);
        let mut connector = MockConnector::new();
        connector.expect_connect().returning(move |_| {
            counted.fetch_add(1, Ordering::SeqCst);
            Err(TransportError::Disconnected)
        });
        let session = orchestrator(Arc::clone(&terminal), connector);
        let shutdown = CancellationToken::new();

        let driver = {
            let terminal = Arc::clone(&terminal);
            let shutdown = shutdown.clone();
            async move {
                // Budget of the first run is long spent after 10 minutes.
                tokio::time::sleep(Duration::from_secs(600)).await;
                terminal.switch_on();
                tokio::time::sleep(Duration::from_secs(600)).await;
                shutdown.cancel();
            }
        };

        // Act
        let (result, ()) = tokio::join!(session.run(shutdown.clone()), driver);

        // Assert: two full budgets, two handshakes
        assert!(result.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 6);
        let disable_acks = terminal
            .writes()
            .iter()
            .filter(|w| w.as_slice() == ProtocolCommand::DISABLE_ACKNOWLEDGEMENT.bytes)
            .count();
        assert_eq!(disable_acks, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keyboard_failure_while_idle_ends_session() {
        // Arrange: every attempt fails, so no relay is listening to the keyboard
        let terminal = Arc::new(MockTerminal::new().answering_commands());
        let mut connector = MockConnector::new();
        connector
            .expect_connect()
            .returning(|_| Err(TransportError::Disconnected));
        let session = orchestrator(Arc::clone(&terminal), connector);
        let line = Arc::clone(&terminal);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(600)).await;
            line.fail_keyboard(std::io::ErrorKind::BrokenPipe);
        });

        // Act
        let result = timeout(
            Duration::from_secs(3600),
            session.run(CancellationToken::new()),
        )
        .await;

        // Assert
        assert!(matches!(
            result,
            Ok(Err(SessionError::Device(DeviceError::Read(_))))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_broken_serial_line_ends_session_with_read_error() {
        // Arrange: the keyboard fails at once and the handshake never reads it
        let line = tokio_test::io::Builder::new()
            .read_error(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
            .build();
        let terminal = Arc::new(SerialTerminal::from_streams(line, tokio::io::sink()));
        let mut connector = MockConnector::new();
        connector
            .expect_connect()
            .returning(|_| Err(TransportError::Disconnected));
        let mut config = config();
        config.local_echo = LocalEcho::Neither;
        let session = SessionOrchestrator::new(
            config,
            terminal,
            Arc::new(connector),
            Arc::new(FileFrameRecorder::disabled()),
        );

        // Act
        let result = timeout(
            Duration::from_secs(600),
            session.run(CancellationToken::new()),
        )
        .await;

        // Assert
        assert!(matches!(
            result,
            Ok(Err(SessionError::Device(DeviceError::Read(_))))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_frame_counter_is_shared_with_caller() {
        let session = orchestrator(Arc::new(MockTerminal::new()), MockConnector::new());

        let counter = session.frame_counter();
        counter.next();

        assert_eq!(session.frame_counter().issued(), 1);
    }
}
