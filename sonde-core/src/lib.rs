//! sonde-core: Pure decode + tracking library for iMet radiosonde telemetry.
//!
//! No async, no I/O — just algorithms. Demodulated frame buffers go in;
//! host report lines and heard notifications come out through trait seams.
//! This crate is the shared core used by the `sonde` CLI and any embedding
//! receiver application.

pub mod crc;
pub mod decode;
pub mod frame;
pub mod registry;
pub mod report;
pub mod session;
pub mod types;

// Re-export commonly used types at crate root
pub use frame::{frame_length, parse, FrameKind, RawFrame};
pub use registry::{Metrology, PositionFix, Registry, Sonde};
pub use report::ReportSink;
pub use session::{
    DecoderFamily, DspControl, EventSink, HeardEvent, ProcessOutcome, RxMeta, Session,
};
pub use types::*;
