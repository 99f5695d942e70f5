//! Relay: one live WebSocket connection bridged to the terminal.
//!
//! Two legs run concurrently inside a single `tokio::select!`:
//!
//! ```text
//!   keyboard ──► forward_keyboard ──► WebSocket sink     (+ keep-alive pings)
//!   screen   ◄── forward_frames   ◄── WebSocket stream   (+ frame capture)
//! ```
//!
//! The first leg to finish decides the outcome of the attempt:
//!
//! - Close frame from the server: `Ok(())`
//! - stream ends without Close, or send/receive fails: [`TransportError`]
//! - capture write fails: [`RecorderError`](super::error::RecorderError)
//! - screen write or keyboard read fails: [`DeviceError`](super::error::DeviceError)
//! - the cancellation token fires: [`SessionError::Cancelled`]
//!
//! Whatever the outcome, the connection is closed before returning, within
//! a short grace period.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{interval_at, timeout, Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::error::{SessionError, TransportError};
use super::ports::{FrameRecorder, KeyboardChunk, Terminal, WsTransport};
use crate::domain::{FrameCounter, FrameKind};

/// Upper bound on the closing handshake once an attempt has ended.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

pub struct Relay<T> {
    terminal: Arc<T>,
    recorder: Arc<dyn FrameRecorder>,
    counter: Arc<FrameCounter>,
    ping_interval: Option<Duration>,
}

impl<T: Terminal> Relay<T> {
    pub fn new(
        terminal: Arc<T>,
        recorder: Arc<dyn FrameRecorder>,
        counter: Arc<FrameCounter>,
        ping_interval: Option<Duration>,
    ) -> Self {
        Self {
            terminal,
            recorder,
            counter,
            ping_interval,
        }
    }

    /// Relays between `ws` and the terminal until one leg ends or `cancel` fires.
    pub async fn run<S: WsTransport>(
        &self,
        ws: S,
        cancel: &CancellationToken,
    ) -> Result<(), SessionError> {
        let mut keyboard = self.terminal.keyboard();
        let (mut sink, mut stream) = ws.split();

        let outcome = tokio::select! {
            _ = cancel.cancelled() => Err(SessionError::Cancelled),
            result = self.forward_keyboard(&mut sink, &mut keyboard) => result,
            result = self.forward_frames(&mut stream) => result,
        };

        match timeout(CLOSE_GRACE, sink.close()).await {
            Ok(Ok(())) => debug!("connection closed"),
            Ok(Err(e)) => debug!("closing connection failed: {e}"),
            Err(_) => debug!("connection did not close within {CLOSE_GRACE:?}"),
        }
        outcome
    }

    async fn forward_keyboard<K>(
        &self,
        sink: &mut K,
        keyboard: &mut broadcast::Receiver<KeyboardChunk>,
    ) -> Result<(), SessionError>
    where
        K: Sink<Message, Error = WsError> + Unpin,
    {
        let mut keep_alive = self.ping_interval.map(|period| {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        let mut keyboard_open = true;

        loop {
            tokio::select! {
                chunk = keyboard.recv(), if keyboard_open => match chunk {
                    Ok(Ok(bytes)) => {
                        debug!("sending {} keyboard bytes", bytes.len());
                        sink.send(keyboard_frame(bytes))
                            .await
                            .map_err(TransportError::Send)?;
                    }
                    Ok(Err(e)) => return Err(e.into()),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("keyboard relay fell behind, {skipped} chunks dropped");
                    }
                    Err(RecvError::Closed) => {
                        debug!("keyboard input ended");
                        keyboard_open = false;
                    }
                },
                _ = next_tick(&mut keep_alive) => {
                    trace!("sending keep-alive ping");
                    sink.send(Message::Ping(Vec::new()))
                        .await
                        .map_err(TransportError::Send)?;
                }
            }
        }
    }

    async fn forward_frames<R>(&self, stream: &mut R) -> Result<(), SessionError>
    where
        R: Stream<Item = Result<Message, WsError>> + Unpin,
    {
        while let Some(message) = stream.next().await {
            match message.map_err(TransportError::Receive)? {
                Message::Text(text) => self.deliver(FrameKind::Text, text.into_bytes()).await?,
                Message::Binary(data) => self.deliver(FrameKind::Binary, data).await?,
                Message::Close(frame) => {
                    debug!("server sent Close: {frame:?}");
                    return Ok(());
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {
                    trace!("ignoring control frame");
                }
            }
        }
        Err(TransportError::Disconnected.into())
    }

    /// Numbers, captures and displays one data frame.
    async fn deliver(&self, kind: FrameKind, payload: Vec<u8>) -> Result<(), SessionError> {
        let sequence = self.counter.next();
        debug!("received {kind} frame #{sequence} ({} bytes)", payload.len());
        self.recorder.record(sequence, &payload).await?;
        self.terminal.write(&payload).await?;
        Ok(())
    }
}

/// Keystrokes go out as a Text frame when they are valid UTF-8, otherwise
/// as a Binary frame with the bytes untouched.
fn keyboard_frame(bytes: Vec<u8>) -> Message {
    match String::from_utf8(bytes) {
        Ok(text) => Message::Text(text),
        Err(e) => Message::Binary(e.into_bytes()),
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
