//! Classify raw buffers into iMet frames.
//!
//! Responsibilities:
//! - Map the leading type tag to a declared frame length
//! - Reject unknown tags and truncated buffers
//! - CRC-verify and package into a `RawFrame` view
//!
//! The type tag also selects the field decoder later; XDATA is classified
//! (its length is known) but reserved — no decoder is wired up for it.

use serde::Serialize;

use crate::crc;
use crate::types::{Result, SondeError};

/// Declared lengths below this leave no room for payload plus a 2-byte
/// checksum; such buffers short-circuit processing.
pub const MIN_FRAME_LEN: usize = 3;

// ---------------------------------------------------------------------------
// Frame kinds
// ---------------------------------------------------------------------------

/// The closed set of recognized frame types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FrameKind {
    /// 0x01: pressure/temperature/humidity, 13 bytes.
    Ptu,
    /// 0x02: GPS position fix, 17 bytes.
    Gps,
    /// 0x03: auxiliary sensor data, variable length (reserved).
    Xdata,
    /// 0x04: extended PTU with sensor temperatures, 19 bytes.
    PtuX,
    /// 0x05: extended GPS with velocity vector, 29 bytes.
    GpsX,
}

impl FrameKind {
    /// Classify a type tag. `None` for unrecognized tags.
    pub fn from_tag(tag: u8) -> Option<FrameKind> {
        match tag {
            0x01 => Some(FrameKind::Ptu),
            0x02 => Some(FrameKind::Gps),
            0x03 => Some(FrameKind::Xdata),
            0x04 => Some(FrameKind::PtuX),
            0x05 => Some(FrameKind::GpsX),
            _ => None,
        }
    }

    pub fn tag(self) -> u8 {
        match self {
            FrameKind::Ptu => 0x01,
            FrameKind::Gps => 0x02,
            FrameKind::Xdata => 0x03,
            FrameKind::PtuX => 0x04,
            FrameKind::GpsX => 0x05,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FrameKind::Ptu => "PTU",
            FrameKind::Gps => "GPS",
            FrameKind::Xdata => "XDATA",
            FrameKind::PtuX => "PTUx",
            FrameKind::GpsX => "GPSx",
        }
    }
}

/// Declared total frame length (checksum included) for a buffer's type tag.
///
/// Fixed protocol knowledge: it determines how many bytes the validator
/// reads before the trailing checksum. XDATA embeds its size in the second
/// byte. Returns `None` for unrecognized tags or lengths below
/// [`MIN_FRAME_LEN`].
pub fn frame_length(buffer: &[u8]) -> Option<usize> {
    let kind = FrameKind::from_tag(*buffer.first()?)?;
    let length = match kind {
        FrameKind::Ptu => 13,
        FrameKind::Gps => 17,
        FrameKind::Xdata => 4 + *buffer.get(1)? as usize,
        FrameKind::PtuX => 19,
        FrameKind::GpsX => 29,
    };
    (length >= MIN_FRAME_LEN).then_some(length)
}

// ---------------------------------------------------------------------------
// RawFrame
// ---------------------------------------------------------------------------

/// A classified, checksum-verified view over an input buffer.
///
/// Transient: borrows the buffer and is never persisted.
#[derive(Debug, Clone, Copy)]
pub struct RawFrame<'a> {
    pub kind: FrameKind,
    /// Frame bytes, trimmed to the declared length (checksum included).
    pub bytes: &'a [u8],
}

/// Classify, bounds-check, and CRC-verify a buffer.
pub fn parse(buffer: &[u8]) -> Result<RawFrame<'_>> {
    let tag = buffer.first().copied().unwrap_or(0);
    let kind = FrameKind::from_tag(tag).ok_or(SondeError::UnknownFrameType(tag))?;
    let declared = frame_length(buffer).ok_or(SondeError::UnknownFrameType(tag))?;

    if buffer.len() < declared {
        return Err(SondeError::Truncated {
            declared,
            actual: buffer.len(),
        });
    }

    let bytes = &buffer[..declared];
    if !crc::verify(bytes) {
        return Err(SondeError::ChecksumMismatch);
    }

    Ok(RawFrame { kind, bytes })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
