//! Shared types, error enum, and channel/hex helpers for sonde-core.

use thiserror::Error;

/// All errors produced by sonde-core.
#[derive(Debug, Error)]
pub enum SondeError {
    #[error("unrecognized frame type: 0x{0:02X}")]
    UnknownFrameType(u8),
    #[error("frame truncated: declared {declared} bytes, buffer has {actual}")]
    Truncated { declared: usize, actual: usize },
    #[error("checksum mismatch")]
    ChecksumMismatch,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SondeError>;

// ---------------------------------------------------------------------------
// Receive channel
// ---------------------------------------------------------------------------

/// Receive channel key: frequency quantized to integer kHz.
///
/// The registry's primary key. Quantizing avoids float keys while keeping
/// neighbouring channels (25 kHz raster) distinct.
pub type ChannelKhz = u32;

/// Quantize a receive frequency in Hz to a channel key.
pub fn channel_from_hz(hz: f64) -> ChannelKhz {
    (hz / 1e3).round() as ChannelKhz
}

/// Channel frequency in Hz.
pub fn channel_to_hz(channel: ChannelKhz) -> f64 {
    channel as f64 * 1e3
}

/// Channel frequency in MHz, as printed in reports.
pub fn channel_to_mhz(channel: ChannelKhz) -> f64 {
    channel as f64 / 1e3
}

// ---------------------------------------------------------------------------
// Hex utilities
// ---------------------------------------------------------------------------

/// Decode a hex string into bytes. Case-insensitive, must be even length.
pub fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    let hex = hex.trim();
    if hex.len() % 2 != 0 {
        return None;
    }
    let mut bytes = Vec::with_capacity(hex.len() / 2);
    for chunk in hex.as_bytes().chunks(2) {
        let high = hex_digit(chunk[0])?;
        let low = hex_digit(chunk[1])?;
        bytes.push((high << 4) | low);
    }
    Some(bytes)
}

/// Encode bytes as uppercase hex string.
pub fn hex_encode(data: &[u8]) -> String {
    let mut s = String::with_capacity(data.len() * 2);
    for &b in data {
        s.push(HEX_CHARS[(b >> 4) as usize] as char);
        s.push(HEX_CHARS[(b & 0x0F) as usize] as char);
    }
    s
}

const HEX_CHARS: &[u8; 16] = b"0123456789ABCDEF";

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
