//! Control characters and fixed command sequences understood by the Minitel.
//!
//! # Protocol commands
//!
//! Configuration commands start with `ESC` followed by a `PRO2` or `PRO3`
//! introducer (two or three parameter bytes).  Some of them make
//! the terminal answer with a status reply on its keyboard line; the number
//! of reply bytes is part of the command description so the caller can
//! consume the reply instead of forwarding it upstream as if it had been
//! typed.
//!
//! ```text
//! ESC PRO3 AIGUILLAGE_OFF RCPT_ECRAN EMET_MODEM   → 5 reply bytes
//! 1B  3B   60             58         52
//! ```

// ── Control characters ────────────────────────────────────────────────────────

/// Escape: introduces every protocol command.
pub const ESC: u8 = 0x1B;
/// Two-parameter protocol command introducer.
pub const PRO2: u8 = 0x3A;
/// Three-parameter protocol command introducer.
pub const PRO3: u8 = 0x3B;
/// Separator: prefixes function keys and system sequences on the keyboard line.
pub const SEP: u8 = 0x13;
/// Cursor off.
pub const COF: u8 = 0x14;
/// Form feed: clears the screen and moves the cursor home.
pub const FF: u8 = 0x0C;

// ── Command parameters ────────────────────────────────────────────────────────

/// `PRO2` parameter: stop a mode.
pub const STOP: u8 = 0x6A;
/// `PRO2 STOP` target: acknowledgement of protocol commands.
pub const ACQUITTEMENT: u8 = 0x5E;
/// `PRO3` parameter: disconnect a routing.
pub const AIGUILLAGE_OFF: u8 = 0x60;
/// `PRO3` parameter: connect a routing.
pub const AIGUILLAGE_ON: u8 = 0x61;
/// Routing receiver: the screen.
pub const RCPT_ECRAN: u8 = 0x58;
/// Routing emitter: the modem (the serial line).
pub const EMET_MODEM: u8 = 0x52;

/// Code following `SEP` when the terminal has just been switched on.
pub const SEP_TURNED_ON: u8 = 0x54;

// ── Commands ──────────────────────────────────────────────────────────────────

/// A fixed byte sequence sent to the terminal, with the length of the reply
/// the terminal sends back on its keyboard line (0 when it does not answer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolCommand {
    /// Raw bytes written to the screen line.
    pub bytes: &'static [u8],
    /// Number of bytes the terminal answers with.
    pub reply_len: usize,
}

impl ProtocolCommand {
    /// Stops the terminal from acknowledging subsequent protocol commands.
    pub const DISABLE_ACKNOWLEDGEMENT: Self = Self {
        bytes: &[ESC, PRO2, STOP, ACQUITTEMENT],
        reply_len: 0,
    };

    /// Routes the keyboard to the screen (characters appear as typed).
    pub const LOCAL_ECHO_ON: Self = Self {
        bytes: &[ESC, PRO3, AIGUILLAGE_ON, RCPT_ECRAN, EMET_MODEM],
        reply_len: 5,
    };

    /// Stops routing the keyboard to the screen; only the remote service
    /// decides what gets displayed.
    pub const LOCAL_ECHO_OFF: Self = Self {
        bytes: &[ESC, PRO3, AIGUILLAGE_OFF, RCPT_ECRAN, EMET_MODEM],
        reply_len: 5,
    };

    /// Hides the cursor, then clears the screen and homes the cursor.
    pub const RESET_SCREEN: Self = Self {
        bytes: &[COF, FF],
        reply_len: 0,
    };

    /// Whether the terminal answers this command.
    pub fn expects_reply(&self) -> bool {
        self.reply_len > 0
    }
}

/// The commands a session handshake sends, grouped per terminal model.
///
/// The handshake only knows the order in which they are sent; the byte
/// values live here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceProfile {
    pub disable_acknowledgement: ProtocolCommand,
    pub local_echo_on: ProtocolCommand,
    pub local_echo_off: ProtocolCommand,
    pub reset_screen: ProtocolCommand,
}

impl DeviceProfile {
    /// Profile of the Minitel 1B and later models.
    pub const MINITEL: Self = Self {
        disable_acknowledgement: ProtocolCommand::DISABLE_ACKNOWLEDGEMENT,
        local_echo_on: ProtocolCommand::LOCAL_ECHO_ON,
        local_echo_off: ProtocolCommand::LOCAL_ECHO_OFF,
        reset_screen: ProtocolCommand::RESET_SCREEN,
    };

    /// Returns the local echo command for `enabled`.
    pub fn local_echo(&self, enabled: bool) -> ProtocolCommand {
        if enabled {
            self.local_echo_on
        } else {
            self.local_echo_off
        }
    }
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self::MINITEL
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
