//! Terminal device adapter.
//!
//! [`SerialTerminal`] drives a Minitel through any byte stream pair: in
//! production the serial device file(s), in tests an in-memory duplex.
//!
//! A background task owns the keyboard reader.  It feeds every read through
//! the [`KeyboardDecoder`], publishes keystrokes on one broadcast channel and
//! system events (power-on) on another.  A read error is latched in the
//! [`KeyboardFeed`] so it is seen even when nobody was listening.  Screen
//! writes are serialized by a mutex and flushed one by one.
//!
//! Serial line settings (speed, parity) are expected to be configured on the
//! device beforehand, e.g. with `stty`.

pub mod mock;

use std::sync::Arc;

use async_trait::async_trait;
use minitel_core::{KeyboardDecoder, KeyboardInput, SystemEvent};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace};

use crate::application::error::DeviceError;
use crate::application::ports::{KeyboardChunk, Terminal};
use crate::domain::DevicePaths;

const READ_BUFFER_SIZE: usize = 256;
const CHANNEL_CAPACITY: usize = 64;

type Screen = Box<dyn AsyncWrite + Send + Unpin>;

/// Keyboard fan-out with a latched read failure.
pub(crate) struct KeyboardFeed {
    chunks: broadcast::Sender<KeyboardChunk>,
    failure: watch::Sender<Option<DeviceError>>,
}

impl KeyboardFeed {
    pub(crate) fn new() -> Self {
        let (chunks, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (failure, _) = watch::channel(None);
        Self { chunks, failure }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<KeyboardChunk> {
        // Subscribe first: a failure latched after the check is still delivered.
        let live = self.chunks.subscribe();
        let Some(failed) = self.failure.borrow().clone() else {
            return live;
        };
        let (tx, replay) = broadcast::channel(1);
        let _ = tx.send(Err(failed));
        replay
    }

    /// Returns how many subscribers received `bytes`.
    pub(crate) fn publish(&self, bytes: Vec<u8>) -> usize {
        self.chunks.send(Ok(bytes)).unwrap_or(0)
    }

    pub(crate) fn fail(&self, error: DeviceError) {
        self.failure.send_replace(Some(error.clone()));
        let _ = self.chunks.send(Err(error));
    }

    pub(crate) fn failure(&self) -> watch::Receiver<Option<DeviceError>> {
        self.failure.subscribe()
    }

    pub(crate) fn subscribers(&self) -> usize {
        self.chunks.receiver_count()
    }
}

/// A Minitel attached through a keyboard reader and a screen writer.
pub struct SerialTerminal {
    screen: Mutex<Screen>,
    keyboard: Arc<KeyboardFeed>,
    system_tx: broadcast::Sender<SystemEvent>,
    reader: JoinHandle<()>,
}

impl SerialTerminal {
    /// Opens the device path(s) and starts reading the keyboard.
    ///
    /// With a combined path the device is opened twice, once per direction.
    ///
    /// # Errors
    ///
    /// [`DeviceError::Open`] naming the path that could not be opened.
    pub async fn open(paths: &DevicePaths) -> Result<Self, DeviceError> {
        let keyboard = File::open(paths.keyboard())
            .await
            .map_err(|e| DeviceError::open(paths.keyboard(), e))?;
        let screen = OpenOptions::new()
            .write(true)
            .open(paths.screen())
            .await
            .map_err(|e| DeviceError::open(paths.screen(), e))?;

        info!(
            "terminal opened (keyboard: {}, screen: {})",
            paths.keyboard().display(),
            paths.screen().display()
        );
        Ok(Self::from_streams(keyboard, screen))
    }

    /// Wraps an already open keyboard reader and screen writer.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn from_streams<R, W>(keyboard: R, screen: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let feed = Arc::new(KeyboardFeed::new());
        let (system_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        let reader = tokio::spawn(read_keyboard(
            keyboard,
            Arc::clone(&feed),
            system_tx.clone(),
        ));
        Self {
            screen: Mutex::new(Box::new(screen)),
            keyboard: feed,
            system_tx,
            reader,
        }
    }
}

impl Drop for SerialTerminal {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[async_trait]
impl Terminal for SerialTerminal {
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
        let mut screen = self.screen.lock().await;
        screen.write_all(bytes).await.map_err(DeviceError::write)?;
        screen.flush().await.map_err(DeviceError::write)?;
        trace!("wrote {} bytes to screen", bytes.len());
        Ok(())
    }
}

/// Reads the keyboard until end of input or the first read error.
///
/// Keystrokes read while nobody is subscribed are dropped; a read error is
/// latched in `feed`.
async fn read_keyboard<R: AsyncRead + Unpin>(
    mut keyboard: R,
    feed: Arc<KeyboardFeed>,
    system_tx: broadcast::Sender<SystemEvent>,
) {
    let mut decoder = KeyboardDecoder::new();
    let mut buf = [0u8; READ_BUFFER_SIZE];

    loop {
        let n = match keyboard.read(&mut buf).await {
            Ok(0) => {
                debug!("keyboard input reached end of file");
                return;
            }
            Ok(n) => n,
            Err(e) => {
                error!("keyboard read failed: {e}");
                feed.fail(DeviceError::read(e));
                return;
            }
        };
        trace!("read {n} bytes from keyboard");

        for input in decoder.feed(&buf[..n]) {
            match input {
                KeyboardInput::Keys(bytes) => {
                    feed.publish(bytes);
                }
                KeyboardInput::System(event) => {
                    debug!("terminal event: {event:?}");
                    let _ = system_tx.send(event);
                }
            }
        }
    }
}
