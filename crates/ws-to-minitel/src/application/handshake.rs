//! Session handshake: puts the terminal into a known state.
//!
//! Sent in this order, at startup and after every power-on:
//!
//! 1. disable acknowledgement
//! 2. local echo on/off (skipped for [`LocalEcho::Neither`])
//! 3. reset screen (cursor off, clear screen), unless disabled in the policy
//!
//! Commands that make the terminal answer (local echo) have their reply
//! consumed here so it is never forwarded upstream as keystrokes.  The wait
//! is bounded by [`HandshakePolicy::reply_timeout`]: a silent terminal delays
//! the handshake but never blocks it.

use std::time::Duration;

use minitel_core::{DeviceProfile, ProtocolCommand};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use super::error::DeviceError;
use super::ports::{KeyboardChunk, Terminal};
use crate::domain::{HandshakePolicy, LocalEcho};

/// The command sequence for one terminal model and echo setting.
#[derive(Debug, Clone)]
pub struct Handshake {
    profile: DeviceProfile,
    local_echo: LocalEcho,
    policy: HandshakePolicy,
}

impl Handshake {
    pub fn new(profile: DeviceProfile, local_echo: LocalEcho, policy: HandshakePolicy) -> Self {
        Self {
            profile,
            local_echo,
            policy,
        }
    }

    /// Sends the handshake to `terminal`.
    ///
    /// # Errors
    ///
    /// Any screen write failure, or a keyboard read failure while waiting for
    /// a reply.
    pub async fn run<T: Terminal + ?Sized>(&self, terminal: &T) -> Result<(), DeviceError> {
        debug!("disabling terminal acknowledgements");
        self.send(terminal, self.profile.disable_acknowledgement).await?;

        match self.local_echo {
            LocalEcho::On => {
                debug!("turning local echo on");
                self.send(terminal, self.profile.local_echo(true)).await?;
            }
            LocalEcho::Off => {
                debug!("turning local echo off");
                self.send(terminal, self.profile.local_echo(false)).await?;
            }
            LocalEcho::Neither => debug!("leaving local echo unchanged"),
        }

        if self.policy.reset_screen {
            debug!("resetting terminal screen");
            self.send(terminal, self.profile.reset_screen).await?;
        }
        Ok(())
    }

    async fn send<T: Terminal + ?Sized>(
        &self,
        terminal: &T,
        command: ProtocolCommand,
    ) -> Result<(), DeviceError> {
        // Subscribe before writing: the reply may arrive before write() returns.
        let mut replies = command.expects_reply().then(|| terminal.keyboard());
        terminal.write(command.bytes).await?;

        if let Some(replies) = replies.as_mut() {
            consume_reply(replies, command.reply_len, self.policy.reply_timeout).await?;
        }
        Ok(())
    }
}

/// Discards `len` reply bytes, or whatever arrives before `limit` elapses.
///
/// Keystrokes read in the same chunk as the reply are discarded with it.
async fn consume_reply(
    replies: &mut broadcast::Receiver<KeyboardChunk>,
    len: usize,
    limit: Duration,
) -> Result<(), DeviceError> {
    let deadline = Instant::now() + limit;
    let mut consumed = 0;

    while consumed < len {
        match timeout_at(deadline, replies.recv()).await {
            Ok(Ok(Ok(bytes))) => consumed += bytes.len(),
            Ok(Ok(Err(e))) => return Err(e),
            Ok(Err(RecvError::Lagged(skipped))) => {
                warn!("handshake missed {skipped} keyboard chunks while waiting for a reply");
            }
            Ok(Err(RecvError::Closed)) => break,
            Err(_) => {
                debug!("terminal replied {consumed}/{len} bytes within {limit:?}, continuing");
                break;
            }
        }
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
