//! Reconnect supervisor: runs relays under a bounded retry budget.
//!
//! Every attempt, whether it ends in a clean Close, a transport failure or a
//! capture failure, is followed by the same fixed delay.  After
//! `max_attempts` the supervisor stops trying and idles until it is
//! cancelled; only a power-on (which restarts the whole session) or a
//! shutdown gets the terminal talking again.
//!
//! A device failure is not retried: it ends the supervisor with an error.

use std::sync::Arc;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::SessionError;
use super::ports::{Connector, Terminal};
use super::relay::Relay;
use crate::domain::RetryPolicy;

pub struct ReconnectSupervisor<C, T> {
    connector: Arc<C>,
    relay: Relay<T>,
    url: String,
    policy: RetryPolicy,
}

impl<C: Connector, T: Terminal> ReconnectSupervisor<C, T> {
    pub fn new(connector: Arc<C>, relay: Relay<T>, url: String, policy: RetryPolicy) -> Self {
        Self {
            connector,
            relay,
            url,
            policy,
        }
    }

    /// Runs attempts until the budget is spent, then idles.
    ///
    /// Returns `Ok(())` once `cancel` fires, or the first non-retryable error.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<(), SessionError> {
        let max = self.policy.max_attempts;

        for attempt in 1..=max {
            match self.attempt(attempt, cancel).await {
                Ok(()) => info!("attempt {attempt}/{max}: server closed the connection"),
                Err(SessionError::Cancelled) => {
                    debug!("attempt {attempt}/{max} cancelled");
                    return Ok(());
                }
                Err(e) if e.is_retryable() => warn!("attempt {attempt}/{max} failed: {e}"),
                Err(e) => return Err(e),
            }

            debug!("next attempt in {:?}", self.policy.delay);
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = sleep(self.policy.delay) => {}
            }
        }

        warn!("giving up after {max} attempts; switch the terminal off and on to retry");
        cancel.cancelled().await;
        Ok(())
    }

    async fn attempt(&self, attempt: u32, cancel: &CancellationToken) -> Result<(), SessionError> {
        info!(
            "attempt {attempt}/{}: connecting to {}",
            self.policy.max_attempts, self.url
        );
        let ws = tokio::select! {
            _ = cancel.cancelled() => return Err(SessionError::Cancelled),
            result = self.connector.connect(&self.url) => result?,
        };
        info!("connected to {}", self.url);
        self.relay.run(ws, cancel).await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::error::TransportError;
    use crate::application::ports::MockConnector;
    use crate::domain::FrameCounter;
    use crate::infrastructure::device::mock::MockTerminal;
    use crate::infrastructure::recorder::FileFrameRecorder;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    const URL: &str = "ws://127.0.0.1:9/ws";

    fn supervisor(
        connector: MockConnector,
        max_attempts: u32,
        delay: Duration,
    ) -> ReconnectSupervisor<MockConnector, MockTerminal> {
        let relay = Relay::new(
            Arc::new(MockTerminal::new()),
            Arc::new(FileFrameRecorder::disabled()),
            Arc::new(FrameCounter::new()),
            None,
        );
        ReconnectSupervisor::new(
            Arc::new(connector),
            relay,
            URL.to_string(),
            RetryPolicy {
                max_attempts,
                delay,
            },
        )
    }

    /// A connector whose every attempt fails, recording when it was tried.
    fn refusing_connector(attempts: Arc<Mutex<Vec<Instant>>>) -> MockConnector {
        let mut connector = MockConnector::new();
        connector
            .expect_connect()
            .withf(|url| url == URL)
            .returning(move |_| {
                attempts.lock().unwrap().push(Instant::now());
                Err(TransportError::Disconnected)
            });
        connector
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_is_spent_with_fixed_delay_then_supervisor_idles() {
        // Arrange
        let attempts = Arc::new(Mutex::new(Vec::new()));
        let delay = Duration::from_secs(10);
        let sup = supervisor(refusing_connector(Arc::clone(&attempts)), 3, delay);
        let cancel = CancellationToken::new();

        // Act: give it far longer than the whole budget needs
        let idle = tokio::time::timeout(Duration::from_secs(600), sup.run(&cancel)).await;

        // Assert: still idling, exactly three attempts, D apart
        assert!(idle.is_err(), "supervisor must idle after the budget is spent");
        let attempts = attempts.lock().unwrap();
        assert_eq!(attempts.len(), 3);
        for pair in attempts.windows(2) {
            assert!(pair[1] - pair[0] >= delay);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_supervisor_returns_when_cancelled() {
        // Arrange
        let attempts = Arc::new(Mutex::new(Vec::new()));
        let sup = supervisor(
            refusing_connector(Arc::clone(&attempts)),
            1,
            Duration::from_secs(1),
        );
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(60)).await;
            trigger.cancel();
        });

        // Act
        let result = sup.run(&cancel).await;

        // Assert
        assert!(result.is_ok());
        assert_eq!(attempts.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_delay_skips_remaining_attempts() {
        // Arrange
        let attempts = Arc::new(Mutex::new(Vec::new()));
        let sup = supervisor(
            refusing_connector(Arc::clone(&attempts)),
            10,
            Duration::from_secs(10),
        );
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(5)).await;
            trigger.cancel();
        });
        let start = Instant::now();

        // Act
        let result = sup.run(&cancel).await;

        // Assert: returned during the first delay
        assert!(result.is_ok());
        assert_eq!(attempts.lock().unwrap().len(), 1);
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_cancelled_supervisor_never_connects() {
        let mut connector = MockConnector::new();
        connector.expect_connect().never();
        let sup = supervisor(connector, 10, Duration::from_secs(10));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = sup.run(&cancel).await;

        assert!(result.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_timeout_counts_as_an_attempt() {
        // Arrange
        let mut connector = MockConnector::new();
        connector.expect_connect().times(2).returning(|url| {
            Err(TransportError::ConnectTimeout {
                url: url.to_string(),
                timeout: Duration::from_secs(15),
            })
        });
        let sup = supervisor(connector, 2, Duration::from_secs(1));
        let cancel = CancellationToken::new();

        // Act
        let idle = tokio::time::timeout(Duration::from_secs(60), sup.run(&cancel)).await;

        // Assert: both attempts used, mock verifies times(2) on drop
        assert!(idle.is_err());
    }
}
