//! Report synthesis: turn one sonde snapshot into host-bound text lines.
//!
//! Two independent lines per invocation, both derived from the snapshot at
//! call time (no retained state):
//! - position/metrology line on the KISS channel
//! - device-info line on the info channel
//!
//! The comma layout matches the established host protocol field positions;
//! undefined values render as empty fields, never as zero. Latitude and
//! longitude are stored in radians and converted to decimal degrees here.
//! Emission is fire-and-forget: the sink's transport is not our concern.

use crate::registry::Sonde;
use crate::types::hex_encode;

/// Sonde type indicator for the iMet-1 family.
pub const TYPE_INDICATOR: &str = "6";

/// The two host output channels, as a trait seam.
pub trait ReportSink {
    /// Hand one complete position/metrology record to the KISS channel.
    fn position_report(&mut self, line: &str);
    /// Hand one complete record to the info channel.
    fn info_report(&mut self, line: &str);
}

/// Emit the position line and the info line for one sonde snapshot.
pub fn send_reports(sonde: &Sonde, sink: &mut dyn ReportSink) {
    sink.position_report(&position_line(sonde));
    sink.info_report(&info_line(sonde));
}

// ---------------------------------------------------------------------------
// Line synthesis
// ---------------------------------------------------------------------------

/// Position/metrology line.
///
/// If latitude or longitude is undefined, a degraded variant is produced
/// with all position-dependent fields blank, signaling "no fix" without
/// failing.
pub fn position_line(sonde: &Sonde) -> String {
    let id = sonde.id.unwrap_or(0);
    let freq_mhz = sonde.frequency_khz as f64 / 1e3;
    let altitude = opt_f64(sonde.fix.altitude, 0);
    let climb = opt_f64(sonde.fix.climb_rate, 1);
    let rx_offset_khz = sonde.rx_offset_hz / 1e3;

    match (sonde.fix.latitude, sonde.fix.longitude) {
        (Some(lat), Some(lon)) => {
            let heading = opt_f64(sonde.fix.heading.map(f64::to_degrees), 1);
            let velocity = opt_f64(sonde.fix.ground_speed.map(|v| v * 3.6), 1);
            format!(
                "{},{},{:.3},,{:.5},{:.5},{},{},{},{},{},{},,,{},,{:.1},{:.1},{},{},,{},,,{:.2}",
                id,
                TYPE_INDICATOR,
                freq_mhz,
                lat.to_degrees(),
                lon.to_degrees(),
                altitude,
                climb,
                heading,
                velocity,
                opt_f64(sonde.metro.temperature, 1),
                opt_f64(sonde.metro.pressure, 1),
                opt_f64(sonde.metro.humidity, 1),
                sonde.rssi,
                rx_offset_khz,
                sonde.fix.used_sats,
                sonde.metro.frame_counter,
                opt_f64(sonde.metro.battery_voltage, 1),
                sonde.real_time as f64 * 0.01,
            )
        }
        _ => format!(
            "{},{},{:.3},,,,{},{},,,,,,,,,{:.1},{:.1},0",
            id, TYPE_INDICATOR, freq_mhz, altitude, climb, sonde.rssi, rx_offset_khz,
        ),
    }
}

/// Device-info line: identity, sub-type 0, name tag, and the auxiliary
/// sensor temperatures.
pub fn info_line(sonde: &Sonde) -> String {
    format!(
        "{},{},0,{},{},{},{}",
        sonde.id.unwrap_or(0),
        TYPE_INDICATOR,
        sonde.name,
        opt_f64(sonde.metro.temperature_internal, 1),
        opt_f64(sonde.metro.temperature_p_sensor, 1),
        opt_f64(sonde.metro.temperature_u_sensor, 1),
    )
}

/// Raw validated-frame diagnostic (info channel, sub-type 1).
pub fn diagnostic_line(id: u32, frame: &[u8]) -> String {
    format!("{},{},1,{}", id, TYPE_INDICATOR, hex_encode(frame))
}

/// Format an optional value, blank when undefined.
fn opt_f64(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{v:.decimals$}"),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
