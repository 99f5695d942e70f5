//! Inbound frame vocabulary and the capture file naming rule.

use std::fmt;

/// The WebSocket message type a data frame arrived as.
///
/// Both kinds are relayed identically as opaque bytes; the kind is only
/// kept for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Text,
    Binary,
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("Text"),
            Self::Binary => f.write_str("Binary"),
        }
    }
}

/// File name of the capture for frame `sequence`.
///
/// The number is zero-padded to three digits and widens past 999, so names
/// stay unique for the whole process even though they stop sorting
/// lexically after `frame-999.vdt`.
///
/// ```rust
/// use ws_to_minitel::domain::frame_file_name;
///
/// assert_eq!(frame_file_name(7), "frame-007.vdt");
/// assert_eq!(frame_file_name(1234), "frame-1234.vdt");
/// ```
pub fn frame_file_name(sequence: u64) -> String {
    format!("frame-{sequence:03}.vdt")
}
