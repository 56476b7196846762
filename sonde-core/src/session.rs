//! Session controller: per-buffer processing and control operations.
//!
//! A `Session` owns the registry and the reference to the active sonde.
//! All operations take `&mut self`, so one buffer is processed to
//! completion before the next — the single-mutator model is enforced by
//! the borrow checker rather than by a lock.
//!
//! External collaborators enter as trait objects per call: the host report
//! channels ([`ReportSink`]), the new-transmitter notification seam
//! ([`EventSink`]), and the demodulator reset control ([`DspControl`]).

use serde::Serialize;

use crate::decode;
use crate::frame::{self, FrameKind};
use crate::registry::{Registry, DEFAULT_CAPACITY};
use crate::report::{self, ReportSink};
use crate::types::{channel_from_hz, channel_to_hz, ChannelKhz, SondeError};

// ---------------------------------------------------------------------------
// Collaborator seams
// ---------------------------------------------------------------------------

/// Decoder family tag carried by heard notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DecoderFamily {
    Imet,
}

impl std::fmt::Display for DecoderFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecoderFamily::Imet => write!(f, "iMet"),
        }
    }
}

/// "Transmitter heard" notification, raised once per newly-updated
/// position fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeardEvent {
    /// Channel frequency rounded to the nearest integer Hz.
    pub frequency_hz: u64,
    pub family: DecoderFamily,
}

/// Event-bus seam for heard notifications. Fire-and-forget.
pub trait EventSink {
    fn sonde_heard(&mut self, event: HeardEvent);
}

/// Control seam for the external demodulation subsystem.
pub trait DspControl {
    fn reset(&mut self);
}

// ---------------------------------------------------------------------------
// Per-buffer input and outcome
// ---------------------------------------------------------------------------

/// Receive-side measurements accompanying one input buffer.
#[derive(Debug, Clone, Copy)]
pub struct RxMeta {
    /// Configured receive frequency in Hz.
    pub frequency_hz: f64,
    /// Measured RX frequency offset in Hz.
    pub offset_hz: f64,
    /// Signal strength.
    pub rssi: f64,
    /// Monotonic arrival timestamp, 10 ms ticks.
    pub real_time: u64,
}

/// What happened to one input buffer. The drop cases are expected
/// steady-state conditions under noisy reception, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Type tag not mapped to a known length (or buffer shorter than the
    /// declared length). Dropped, no diagnostic.
    Unrecognized,
    /// Checksum mismatch. Dropped, no registry mutation.
    ChecksumFailed,
    /// Classified, but the type has no field decoder wired up (XDATA).
    Ignored,
    /// Decoded into the channel's sonde entry. `reported` is set when a
    /// position update triggered report emission.
    Decoded { kind: FrameKind, reported: bool },
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One decoding session: the registry plus the active-sonde reference.
#[derive(Debug, Default)]
pub struct Session {
    registry: Registry,
    active: Option<ChannelKhz>,
}

impl Session {
    pub fn new() -> Self {
        Session::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Session {
            registry: Registry::new(capacity),
            active: None,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Process one incoming buffer.
    ///
    /// Classify, verify, log the validated bytes, then dispatch to the
    /// field decoder for the frame's type and update the channel's sonde
    /// entry. A newly-updated position fix emits both report lines and one
    /// heard notification; metrology-only frames emit nothing — reports
    /// are paced by position fixes.
    pub fn process_buffer(
        &mut self,
        buffer: &[u8],
        rx: &RxMeta,
        sink: &mut dyn ReportSink,
        events: &mut dyn EventSink,
    ) -> ProcessOutcome {
        let raw = match frame::parse(buffer) {
            Ok(raw) => raw,
            Err(SondeError::ChecksumMismatch) => return ProcessOutcome::ChecksumFailed,
            Err(_) => return ProcessOutcome::Unrecognized,
        };

        // Raw frame log, observational only. Uses the identity of the
        // previously active sonde, which may still be unassigned.
        let log_id = self
            .active
            .and_then(|channel| self.registry.get(channel))
            .and_then(|sonde| sonde.id)
            .unwrap_or(0);
        sink.info_report(&report::diagnostic_line(log_id, raw.bytes));

        let channel = channel_from_hz(rx.frequency_hz);
        self.active = Some(channel);

        let sonde = self.registry.fetch_or_create(channel);
        sonde.rssi = rx.rssi;
        sonde.real_time = rx.real_time;
        sonde.frame_count += 1;
        sonde.rx_offset_hz = rx.offset_hz;

        let decoded = match raw.kind {
            FrameKind::Ptu => {
                decode::decode_ptu(raw.bytes, &mut sonde.metro);
                true
            }
            FrameKind::PtuX => {
                decode::decode_ptux(raw.bytes, &mut sonde.metro);
                true
            }
            FrameKind::Gps => {
                decode::decode_gps(raw.bytes, &mut sonde.fix);
                true
            }
            FrameKind::GpsX => {
                decode::decode_gpsx(raw.bytes, &mut sonde.fix);
                true
            }
            // Reserved type: classified, but no decoder wired up
            FrameKind::Xdata => false,
        };
        if !decoded {
            return ProcessOutcome::Ignored;
        }

        let mut reported = false;
        if sonde.fix.updated {
            sonde.fix.updated = false;
            if sonde.id.is_none() {
                let id = sonde.derive_identity();
                sonde.adopt_identity(id);
            }
            report::send_reports(sonde, sink);
            events.sonde_heard(HeardEvent {
                frequency_hz: rx.frequency_hz.round() as u64,
                family: DecoderFamily::Imet,
            });
            reported = true;
        }

        ProcessOutcome::Decoded {
            kind: raw.kind,
            reported,
        }
    }

    /// Emit the report pair for every live sonde, in registry iteration
    /// order. Refreshes a downstream consumer without waiting for frames.
    pub fn resend_all(&self, sink: &mut dyn ReportSink) {
        for sonde in self.registry.iter() {
            report::send_reports(sonde, sink);
        }
    }

    /// Pause or resume decoding. This core holds no pause state of its
    /// own; either transition resets the external demodulator.
    pub fn pause_resume(&mut self, _pause: bool, dsp: &mut dyn DspControl) {
        dsp.reset();
    }

    /// Remove one sonde by identity. Returns the freed channel frequency
    /// in Hz so the caller can retune; `None` means the identity is
    /// already gone (benign). The active reference is cleared if it
    /// pointed at the removed entry.
    pub fn remove_sonde(&mut self, id: u32) -> Option<f64> {
        let channel = self.registry.remove_by_id(id)?;
        if self.active == Some(channel) {
            self.active = None;
        }
        Some(channel_to_hz(channel))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
