//! CRC-16 validation for iMet telemetry frames.
//!
//! CCITT polynomial 0x1021, MSB-first data and sum order, no reflection,
//! no final XOR. The last two frame bytes hold the checksum big-endian.
//!
//! Each transmission starts with an SOH marker (0x01) that the byte
//! synchronizer strips before the frame buffer reaches this layer. The
//! marker is still covered by the checksum, so the CRC is seeded with the
//! state left behind after feeding SOH into the initial value 0x1D0F.

const POLY: u16 = 0x1021;

/// CRC state after SOH (0x01) from initial value 0x1D0F.
pub const SEED: u16 = 0xDCBD;

// ---------------------------------------------------------------------------
// CRC lookup table (compile-time)
// ---------------------------------------------------------------------------

const fn build_crc_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut bit = 0;
        while bit < 8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ POLY;
            } else {
                crc <<= 1;
            }
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

static CRC_TABLE: [u16; 256] = build_crc_table();

// ---------------------------------------------------------------------------
// Core CRC functions
// ---------------------------------------------------------------------------

/// CRC-16/CCITT over `data`, starting from `seed`.
pub fn crc16(data: &[u8], seed: u16) -> u16 {
    let mut crc = seed;
    for &byte in data {
        crc = (crc << 8) ^ CRC_TABLE[(((crc >> 8) ^ byte as u16) & 0xFF) as usize];
    }
    crc
}

/// Verify a frame's embedded checksum.
///
/// Computes the CRC over all bytes except the final two and compares it
/// against the big-endian value stored there. Frames shorter than 3 bytes
/// cannot carry a checksum and always fail.
pub fn verify(frame: &[u8]) -> bool {
    if frame.len() < 3 {
        return false;
    }
    let split = frame.len() - 2;
    let received = u16::from_be_bytes([frame[split], frame[split + 1]]);
    crc16(&frame[..split], SEED) == received
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
