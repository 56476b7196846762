//! Field decoders for the iMet frame family.
//!
//! One decoder per frame type, consuming a validated frame and updating the
//! sonde's cooked records in place:
//! - PTU (0x01):  packet counter, pressure, temperature, humidity, battery
//! - GPS (0x02):  position, satellite count, UTC time of day
//! - PTUx (0x04): PTU plus internal/sensor temperatures
//! - GPSx (0x05): GPS plus ground speed, course, and climb rate
//!
//! All multi-byte payload fields are little-endian (the trailing checksum is
//! the only big-endian field). Latitude/longitude arrive in decimal degrees
//! and are stored in radians; the report layer converts back. Non-finite or
//! out-of-range values decode to `None`, never to zero.

use crate::registry::{Metrology, PositionFix};

// ---------------------------------------------------------------------------
// Little-endian field readers
// ---------------------------------------------------------------------------

fn read_u16(frame: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([frame[offset], frame[offset + 1]])
}

fn read_i16(frame: &[u8], offset: usize) -> i16 {
    i16::from_le_bytes([frame[offset], frame[offset + 1]])
}

fn read_u24(frame: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([frame[offset], frame[offset + 1], frame[offset + 2], 0])
}

fn read_f32(frame: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes([
        frame[offset],
        frame[offset + 1],
        frame[offset + 2],
        frame[offset + 3],
    ])
}

/// Angle in degrees, or `None` if non-finite or outside ±limit.
fn valid_angle(deg: f32, limit: f64) -> Option<f64> {
    let deg = deg as f64;
    (deg.is_finite() && deg.abs() <= limit).then_some(deg)
}

/// Seconds since UTC midnight, or `None` for an out-of-range h/m/s triple.
fn time_of_day(h: u8, m: u8, s: u8) -> Option<u32> {
    (h < 24 && m < 60 && s < 60).then(|| u32::from(h) * 3600 + u32::from(m) * 60 + u32::from(s))
}

// ---------------------------------------------------------------------------
// PTU decoders
// ---------------------------------------------------------------------------

/// Decode a PTU frame (0x01) into the metrology record.
pub fn decode_ptu(frame: &[u8], metro: &mut Metrology) {
    metro.frame_counter = read_u16(frame, 1);

    let pressure_raw = read_u24(frame, 3);
    // A pressure of exactly zero marks a dead sensor
    metro.pressure = (pressure_raw != 0).then(|| pressure_raw as f64 * 0.01);
    metro.temperature = Some(read_i16(frame, 6) as f64 * 0.01);
    metro.humidity = Some(read_u16(frame, 8) as f64 * 0.01);
    metro.battery_voltage = Some(frame[10] as f64 * 0.1);
}

/// Decode an extended PTU frame (0x04): PTU fields plus the three
/// auxiliary sensor temperatures.
pub fn decode_ptux(frame: &[u8], metro: &mut Metrology) {
    decode_ptu(frame, metro);
    metro.temperature_internal = Some(read_i16(frame, 11) as f64 * 0.01);
    metro.temperature_p_sensor = Some(read_i16(frame, 13) as f64 * 0.01);
    metro.temperature_u_sensor = Some(read_i16(frame, 15) as f64 * 0.01);
}

// ---------------------------------------------------------------------------
// GPS decoders
// ---------------------------------------------------------------------------

/// Decode a GPS frame (0x02) into the position-fix record.
///
/// Sets the `updated` flag; fields not carried by this frame type (climb
/// rate, speed, heading) keep their previous values.
pub fn decode_gps(frame: &[u8], fix: &mut PositionFix) {
    decode_position_base(frame, fix);
    fix.used_sats = frame[11];
    fix.time_of_day = time_of_day(frame[12], frame[13], frame[14]);
    fix.updated = true;
}

/// Decode an extended GPS frame (0x05): position plus velocity vector.
pub fn decode_gpsx(frame: &[u8], fix: &mut PositionFix) {
    decode_position_base(frame, fix);

    let sog = read_f32(frame, 11) as f64;
    fix.ground_speed = (sog.is_finite() && sog >= 0.0).then_some(sog);
    fix.heading = valid_course(read_f32(frame, 15));
    let climb = read_f32(frame, 19) as f64;
    fix.climb_rate = climb.is_finite().then_some(climb);

    fix.time_of_day = time_of_day(frame[23], frame[24], frame[25]);
    fix.used_sats = frame[26];
    fix.updated = true;
}

/// Latitude/longitude/altitude, common to both GPS frame types.
fn decode_position_base(frame: &[u8], fix: &mut PositionFix) {
    fix.latitude = valid_angle(read_f32(frame, 1), 90.0).map(f64::to_radians);
    fix.longitude = valid_angle(read_f32(frame, 5), 180.0).map(f64::to_radians);
    // Altitude is offset by 5000 m to keep the field unsigned
    fix.altitude = Some(read_u16(frame, 9) as f64 - 5000.0);
}

/// Course over ground in degrees, stored in radians.
fn valid_course(deg: f32) -> Option<f64> {
    let deg = deg as f64;
    (deg.is_finite() && (0.0..360.0).contains(&deg)).then(|| deg.to_radians())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::hex_decode;

    const PTU_FRAME: &str = "01D204CD8B01F5FDA91138D416";
    const PTUX_FRAME: &str = "04D204CD8B01F5FDA911386608BC07B608E6A4";
    const GPS_FRAME: &str = "02CD8C40423F353941DC82090C2238A938";
    const GPSX_FRAME: &str = "05CD8C40423F353941DC820000484133338B43666686400C2238093106";
    const GPS_NO_FIX: &str = "02FFFFFFFF3F353941DC82000C2238E4C3";

    fn frame(hex: &str) -> Vec<u8> {
        hex_decode(hex).expect("valid hex")
    }

    #[test]
    fn test_decode_ptu() {
        let mut metro = Metrology::default();
        decode_ptu(&frame(PTU_FRAME), &mut metro);

        assert_eq!(metro.frame_counter, 1234);
        assert!((metro.pressure.unwrap() - 1013.25).abs() < 1e-9);
        assert!((metro.temperature.unwrap() - -5.23).abs() < 1e-9);
        assert!((metro.humidity.unwrap() - 45.21).abs() < 1e-9);
        assert!((metro.battery_voltage.unwrap() - 5.6).abs() < 1e-9);
        assert!(metro.temperature_internal.is_none());
    }

    #[test]
    fn test_decode_ptu_zero_pressure_undefined() {
        let mut raw = frame(PTU_FRAME);
        raw[3] = 0;
        raw[4] = 0;
        raw[5] = 0;
        let mut metro = Metrology::default();
        decode_ptu(&raw, &mut metro);
        assert!(metro.pressure.is_none());
    }

    #[test]
    fn test_decode_ptux_aux_temperatures() {
        let mut metro = Metrology::default();
        decode_ptux(&frame(PTUX_FRAME), &mut metro);

        assert!((metro.temperature_internal.unwrap() - 21.50).abs() < 1e-9);
        assert!((metro.temperature_p_sensor.unwrap() - 19.80).abs() < 1e-9);
        assert!((metro.temperature_u_sensor.unwrap() - 22.30).abs() < 1e-9);
        // Base PTU fields decode too
        assert_eq!(metro.frame_counter, 1234);
    }

    #[test]
    fn test_decode_gps() {
        let mut fix = PositionFix::default();
        decode_gps(&frame(GPS_FRAME), &mut fix);

        assert!((fix.latitude.unwrap().to_degrees() - 48.1375).abs() < 1e-4);
        assert!((fix.longitude.unwrap().to_degrees() - 11.5755).abs() < 1e-4);
        assert_eq!(fix.altitude, Some(28500.0));
        assert_eq!(fix.used_sats, 9);
        assert_eq!(fix.time_of_day, Some(12 * 3600 + 34 * 60 + 56));
        assert!(fix.updated);
        // Not carried by the base GPS frame
        assert!(fix.climb_rate.is_none());
        assert!(fix.ground_speed.is_none());
    }

    #[test]
    fn test_decode_gpsx() {
        let mut fix = PositionFix::default();
        decode_gpsx(&frame(GPSX_FRAME), &mut fix);

        assert!((fix.latitude.unwrap().to_degrees() - 48.1375).abs() < 1e-4);
        assert!((fix.ground_speed.unwrap() - 12.5).abs() < 1e-4);
        assert!((fix.heading.unwrap().to_degrees() - 278.4).abs() < 1e-3);
        assert!((fix.climb_rate.unwrap() - 4.2).abs() < 1e-4);
        assert_eq!(fix.used_sats, 9);
        assert_eq!(fix.time_of_day, Some(45_296));
        assert!(fix.updated);
    }

    #[test]
    fn test_decode_gps_nan_latitude_undefined() {
        let mut fix = PositionFix::default();
        decode_gps(&frame(GPS_NO_FIX), &mut fix);

        assert!(fix.latitude.is_none());
        assert!(fix.longitude.is_some());
        assert!(fix.updated, "frame without fix still counts as an update");
    }

    #[test]
    fn test_decode_gps_merges_partial_fields() {
        // A GPSx frame supplies velocity; a following base GPS frame must
        // not clear it
        let mut fix = PositionFix::default();
        decode_gpsx(&frame(GPSX_FRAME), &mut fix);
        decode_gps(&frame(GPS_FRAME), &mut fix);

        assert!(fix.ground_speed.is_some());
        assert!(fix.climb_rate.is_some());
    }

    #[test]
    fn test_invalid_time_of_day() {
        assert_eq!(time_of_day(24, 0, 0), None);
        assert_eq!(time_of_day(12, 60, 0), None);
        assert_eq!(time_of_day(12, 0, 60), None);
        assert_eq!(time_of_day(23, 59, 59), Some(86_399));
    }

    #[test]
    fn test_valid_angle_rejects_out_of_range() {
        assert!(valid_angle(91.0, 90.0).is_none());
        assert!(valid_angle(f32::NAN, 90.0).is_none());
        assert!(valid_angle(f32::INFINITY, 180.0).is_none());
        assert_eq!(valid_angle(-90.0, 90.0), Some(-90.0));
    }
}
