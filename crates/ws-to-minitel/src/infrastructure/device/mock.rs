//! Mock terminal for tests.
//!
//! Records every screen write and lets tests type keys, switch the terminal
//! on, or break either direction.  Optionally answers protocol commands the
//! way a real Minitel does, so the handshake's reply handling is exercised.
//!
//! Shared by unit tests and the integration tests under `tests/`.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use minitel_core::protocol::control::{ESC, PRO3, RCPT_ECRAN};
use minitel_core::{ProtocolCommand, SystemEvent};
use tokio::sync::{broadcast, watch};

use crate::application::error::DeviceError;
use crate::application::ports::{KeyboardChunk, Terminal};

use super::KeyboardFeed;

/// Reply sent for a local echo command: PRO3 status with the screen receiver.
pub const COMMAND_REPLY: [u8; 5] = [ESC, PRO3, 0x63, RCPT_ECRAN, 0x44];

const CHANNEL_CAPACITY: usize = 64;
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// In-memory [`Terminal`].
pub struct MockTerminal {
    keyboard: KeyboardFeed,
    system_tx: broadcast::Sender<SystemEvent>,
    writes: Mutex<Vec<Vec<u8>>>,
    answers_commands: bool,
    /// When `true`, every screen write fails with a broken pipe.
    pub should_fail: AtomicBool,
}

impl MockTerminal {
    pub fn new() -> Self {
        let (system_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            keyboard: KeyboardFeed::new(),
            system_tx,
            writes: Mutex::new(Vec::new()),
            answers_commands: false,
            should_fail: AtomicBool::new(false),
        }
    }

    /// Answers the local echo commands with [`COMMAND_REPLY`] on the keyboard line.
    pub fn answering_commands(mut self) -> Self {
        self.answers_commands = true;
        self
    }

    /// Simulates typing `bytes`.  Returns how many subscribers received them.
    pub fn type_keys(&self, bytes: &[u8]) -> usize {
        self.keyboard.publish(bytes.to_vec())
    }

    /// Simulates the terminal being switched on.
    pub fn switch_on(&self) {
        let _ = self.system_tx.send(SystemEvent::TurnedOn);
    }

    /// Simulates the keyboard line failing.  The failure is latched like
    /// on a real device.
    pub fn fail_keyboard(&self, kind: io::ErrorKind) {
        self.keyboard.fail(DeviceError::read(io::Error::from(kind)));
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    /// Every successful screen write, in order.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.writes.lock().unwrap().clone()
    }

    /// All screen bytes concatenated.
    pub fn screen(&self) -> Vec<u8> {
        self.writes().concat()
    }

    /// Number of live keyboard subscriptions.
    pub fn keyboard_subscribers(&self) -> usize {
        self.keyboard.subscribers()
    }

    /// Waits until at least `count` screen writes have been recorded.
    pub async fn wait_for_writes(&self, count: usize) {
        while self.writes.lock().unwrap().len() < count {
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Waits until a relay (or anything else) subscribes to the keyboard.
    pub async fn wait_for_keyboard_subscriber(&self) {
        while self.keyboard_subscribers() == 0 {
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

impl Default for MockTerminal {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Terminal for MockTerminal {
    fn keyboard(&self) -> broadcast::Receiver<KeyboardChunk> {
        self.keyboard.subscribe()
    }

    fn keyboard_failure(&self) -> watch::Receiver<Option<DeviceError>> {
        self.keyboard.failure()
    }

    fn system_events(&self) -> broadcast::Receiver<SystemEvent> {
        self.system_tx.subscribe()
    }

    async fn write(&self, bytes: &[u8]) -> Result<(), DeviceError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(DeviceError::write(io::Error::from(io::ErrorKind::BrokenPipe)));
        }
        self.writes.lock().unwrap().push(bytes.to_vec());

        let is_echo_command = bytes == ProtocolCommand::LOCAL_ECHO_ON.bytes
            || bytes == ProtocolCommand::LOCAL_ECHO_OFF.bytes;
        if self.answers_commands && is_echo_command {
            self.keyboard.publish(COMMAND_REPLY.to_vec());
        }
        Ok(())
    }
}
