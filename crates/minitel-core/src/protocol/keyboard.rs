//! Incremental decoding of the Minitel keyboard line.
//!
//! Everything the terminal sends back travels on the same line as the
//! keystrokes: function keys (`SEP` + code), command replies and system
//! notifications.  [`KeyboardDecoder`] pulls the system notifications out of
//! the stream and leaves everything else untouched, so keystrokes (including
//! function keys) are forwarded byte for byte.
//!
//! # Reads split sequences
//!
//! A serial read may stop between `SEP` and its code.  The decoder keeps
//! that trailing `SEP` back and resolves it with the first byte of the next
//! chunk.

use std::mem;

use tracing::trace;

use super::control::{SEP, SEP_TURNED_ON};

/// A notification emitted by the terminal itself rather than typed by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemEvent {
    /// The terminal has just been switched on; its local state (echo,
    /// acknowledgement, screen content) is back to factory defaults.
    TurnedOn,
}

/// One decoded item from the keyboard line, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyboardInput {
    /// Bytes typed by the user, unmodified.
    Keys(Vec<u8>),
    /// A system notification.
    System(SystemEvent),
}

/// Splits the raw keyboard byte stream into keystrokes and system events.
#[derive(Debug, Default)]
pub struct KeyboardDecoder {
    pending_sep: bool,
}

impl KeyboardDecoder {
    /// Creates a decoder with no buffered state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes one chunk read from the keyboard line.
    ///
    /// Consecutive keystrokes are grouped into a single [`KeyboardInput::Keys`]
    /// item; a system event splits the group so the relative order is kept.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use minitel_core::{KeyboardDecoder, KeyboardInput, SystemEvent};
    ///
    /// let mut decoder = KeyboardDecoder::new();
    /// let items = decoder.feed(&[b'A', 0x13, 0x54, b'B']);
    /// assert_eq!(
    ///     items,
    ///     vec![
    ///         KeyboardInput::Keys(vec![b'A']),
    ///         KeyboardInput::System(SystemEvent::TurnedOn),
    ///         KeyboardInput::Keys(vec![b'B']),
    ///     ]
    /// );
    /// ```
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<KeyboardInput> {
        let mut items = Vec::new();
        let mut keys = Vec::with_capacity(chunk.len() + 1);

        for &byte in chunk {
            if mem::take(&mut self.pending_sep) {
                match system_event(byte) {
                    Some(event) => {
                        if !keys.is_empty() {
                            items.push(KeyboardInput::Keys(mem::take(&mut keys)));
                        }
                        trace!("decoded system event {event:?}");
                        items.push(KeyboardInput::System(event));
                    }
                    None => {
                        keys.push(SEP);
                        keys.push(byte);
                    }
                }
            } else if byte == SEP {
                self.pending_sep = true;
            } else {
                keys.push(byte);
            }
        }

        if !keys.is_empty() {
            items.push(KeyboardInput::Keys(keys));
        }
        items
    }

    /// Whether a `SEP` is held back waiting for the next chunk.
    pub fn has_pending(&self) -> bool {
        self.pending_sep
    }
}

fn system_event(code: u8) -> Option<SystemEvent> {
    match code {
        SEP_TURNED_ON => Some(SystemEvent::TurnedOn),
        _ => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
