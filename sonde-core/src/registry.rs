//! Multi-sonde tracking registry.
//!
//! One entry per receive channel, keyed by the channel frequency in kHz.
//! A `BTreeMap` gives O(log n) fetch-by-channel and a stable
//! (ascending-channel) iteration order for bulk resend; removal by identity
//! is an O(n) scan.
//!
//! The table is bounded. When a new channel arrives at capacity, the entry
//! that has gone longest without a frame is evicted to make room; existing
//! entries are never touched otherwise.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::{channel_to_mhz, ChannelKhz};

/// Default registry capacity, one entry per receiver channel slot.
pub const DEFAULT_CAPACITY: usize = 16;

// ---------------------------------------------------------------------------
// Cooked field records
// ---------------------------------------------------------------------------

/// Geodetic/kinematic fields from GPS frames.
///
/// `None` means the transmitter has not supplied the field (or supplied an
/// invalid value); undefined fields are never folded to zero.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PositionFix {
    /// Latitude in radians.
    pub latitude: Option<f64>,
    /// Longitude in radians.
    pub longitude: Option<f64>,
    /// Altitude in meters.
    pub altitude: Option<f64>,
    /// Climb rate in m/s (positive up).
    pub climb_rate: Option<f64>,
    /// Ground speed in m/s.
    pub ground_speed: Option<f64>,
    /// Course over ground in radians.
    pub heading: Option<f64>,
    /// Satellites used in the fix.
    pub used_sats: u8,
    /// GPS time of day, seconds since UTC midnight.
    pub time_of_day: Option<u32>,
    /// Set by the GPS decoders, cleared after each emitted report.
    pub updated: bool,
}

impl PositionFix {
    pub fn has_position(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

/// Meteorological fields from PTU frames.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Metrology {
    /// Air temperature in °C.
    pub temperature: Option<f64>,
    /// Pressure in hPa.
    pub pressure: Option<f64>,
    /// Relative humidity in %.
    pub humidity: Option<f64>,
    /// Battery voltage in V.
    pub battery_voltage: Option<f64>,
    /// Internal (board) temperature in °C.
    pub temperature_internal: Option<f64>,
    /// Pressure sensor temperature in °C.
    pub temperature_p_sensor: Option<f64>,
    /// Humidity sensor temperature in °C.
    pub temperature_u_sensor: Option<f64>,
    /// Rolling packet counter from the PTU payload (diagnostics).
    pub frame_counter: u16,
}

// ---------------------------------------------------------------------------
// Sonde
// ---------------------------------------------------------------------------

/// State for one tracked transmitter.
#[derive(Debug, Clone, Serialize)]
pub struct Sonde {
    /// Advisory identity, absent until the first position fix supplies one.
    pub id: Option<u32>,
    /// Human-readable name tag.
    pub name: String,
    /// Receive channel this sonde was heard on.
    pub frequency_khz: ChannelKhz,
    /// Last-seen signal strength.
    pub rssi: f64,
    /// Last-seen arrival timestamp (monotonic, 10 ms ticks).
    pub real_time: u64,
    /// Validated frames seen on this channel.
    pub frame_count: u64,
    /// Measured RX frequency offset in Hz.
    pub rx_offset_hz: f64,
    pub fix: PositionFix,
    pub metro: Metrology,
}

impl Sonde {
    pub fn new(frequency_khz: ChannelKhz) -> Self {
        Sonde {
            id: None,
            name: String::new(),
            frequency_khz,
            rssi: 0.0,
            real_time: 0,
            frame_count: 0,
            rx_offset_hz: 0.0,
            fix: PositionFix::default(),
            metro: Metrology::default(),
        }
    }

    /// Adopt a decoder-supplied identity.
    ///
    /// A differing identity on an already-identified entry means a new
    /// transmitter took over the channel: all cooked state is reset before
    /// the identity is applied ("reset on identity change").
    pub fn adopt_identity(&mut self, id: u32) {
        if let Some(existing) = self.id {
            if existing != id {
                *self = Sonde::new(self.frequency_khz);
            }
        }
        if self.id.is_none() {
            self.id = Some(id);
            self.name = format!("IMET-{:.3}", channel_to_mhz(self.frequency_khz));
        }
    }

    /// Derive the advisory identity for this channel.
    ///
    /// iMet payloads carry no serial number, so the identity is a hash of
    /// the channel and the first decoded GPS time of day.
    pub fn derive_identity(&self) -> u32 {
        let tod = self.fix.time_of_day.unwrap_or(0);
        fnv1a(&[self.frequency_khz, tod])
    }
}

fn fnv1a(words: &[u32]) -> u32 {
    let mut hash = 0x811C_9DC5u32;
    for word in words {
        for byte in word.to_le_bytes() {
            hash ^= byte as u32;
            hash = hash.wrapping_mul(16_777_619);
        }
    }
    hash
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Bounded table of tracked sondes, one per receive channel.
#[derive(Debug)]
pub struct Registry {
    sondes: BTreeMap<ChannelKhz, Sonde>,
    capacity: usize,
}

impl Registry {
    pub fn new(capacity: usize) -> Self {
        Registry {
            sondes: BTreeMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Fetch the entry for a channel, creating a fresh undefined-valued one
    /// if the channel is not yet tracked. Never fails: at capacity the
    /// least-recently-heard entry is evicted first.
    pub fn fetch_or_create(&mut self, channel: ChannelKhz) -> &mut Sonde {
        if !self.sondes.contains_key(&channel) && self.sondes.len() >= self.capacity {
            self.evict_oldest();
        }
        self.sondes
            .entry(channel)
            .or_insert_with(|| Sonde::new(channel))
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .sondes
            .iter()
            .min_by_key(|(_, sonde)| sonde.real_time)
            .map(|(channel, _)| *channel);
        if let Some(channel) = oldest {
            self.sondes.remove(&channel);
        }
    }

    pub fn get(&self, channel: ChannelKhz) -> Option<&Sonde> {
        self.sondes.get(&channel)
    }

    /// All live entries in ascending channel order. Restartable; the order
    /// is stable across one resend pass.
    pub fn iter(&self) -> impl Iterator<Item = &Sonde> {
        self.sondes.values()
    }

    /// Remove the entry whose identity matches, returning its channel so
    /// the caller can release it. Not-found is a normal outcome.
    pub fn remove_by_id(&mut self, id: u32) -> Option<ChannelKhz> {
        let channel = self
            .sondes
            .iter()
            .find(|(_, sonde)| sonde.id == Some(id))
            .map(|(channel, _)| *channel)?;
        self.sondes.remove(&channel);
        Some(channel)
    }

    pub fn len(&self) -> usize {
        self.sondes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sondes.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_or_create_new_entry() {
        let mut registry = Registry::default();
        let sonde = registry.fetch_or_create(402_000);
        assert_eq!(sonde.frequency_khz, 402_000);
        assert!(sonde.id.is_none());
        assert!(sonde.fix.latitude.is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_fetch_or_create_is_idempotent() {
        let mut registry = Registry::default();
        registry.fetch_or_create(402_000).frame_count = 7;
        let sonde = registry.fetch_or_create(402_000);
        assert_eq!(sonde.frame_count, 7);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_one_entry_per_channel() {
        let mut registry = Registry::default();
        registry.fetch_or_create(402_000);
        registry.fetch_or_create(403_000);
        registry.fetch_or_create(402_000);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_iteration_order_stable() {
        let mut registry = Registry::default();
        registry.fetch_or_create(404_000);
        registry.fetch_or_create(402_000);
        registry.fetch_or_create(403_000);

        let first: Vec<_> = registry.iter().map(|s| s.frequency_khz).collect();
        let second: Vec<_> = registry.iter().map(|s| s.frequency_khz).collect();
        assert_eq!(first, vec![402_000, 403_000, 404_000]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_remove_by_id() {
        let mut registry = Registry::default();
        registry.fetch_or_create(402_000).id = Some(77);
        registry.fetch_or_create(403_000).id = Some(88);

        assert_eq!(registry.remove_by_id(77), Some(402_000));
        assert_eq!(registry.len(), 1);
        assert!(registry.get(402_000).is_none());
    }

    #[test]
    fn test_remove_unknown_id_is_benign() {
        let mut registry = Registry::default();
        registry.fetch_or_create(402_000).id = Some(77);
        assert_eq!(registry.remove_by_id(99), None);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_removed_channel_yields_fresh_entry() {
        let mut registry = Registry::default();
        {
            let sonde = registry.fetch_or_create(402_000);
            sonde.id = Some(77);
            sonde.fix.latitude = Some(0.84);
            sonde.metro.temperature = Some(-12.3);
        }
        registry.remove_by_id(77);

        let sonde = registry.fetch_or_create(402_000);
        assert!(sonde.id.is_none());
        assert!(sonde.fix.latitude.is_none());
        assert!(sonde.metro.temperature.is_none());
    }

    #[test]
    fn test_capacity_evicts_least_recently_heard() {
        let mut registry = Registry::new(3);
        for (i, channel) in [402_000u32, 403_000, 404_000].iter().enumerate() {
            let sonde = registry.fetch_or_create(*channel);
            sonde.real_time = 100 * (i as u64 + 1);
        }

        // 402000 has the oldest real_time and gets evicted
        registry.fetch_or_create(405_000);
        assert_eq!(registry.len(), 3);
        assert!(registry.get(402_000).is_none());
        assert!(registry.get(403_000).is_some());
        assert!(registry.get(405_000).is_some());
    }

    #[test]
    fn test_adopt_identity_first_time() {
        let mut sonde = Sonde::new(402_000);
        sonde.adopt_identity(1234);
        assert_eq!(sonde.id, Some(1234));
        assert_eq!(sonde.name, "IMET-402.000");
    }

    #[test]
    fn test_adopt_identity_same_id_keeps_state() {
        let mut sonde = Sonde::new(402_000);
        sonde.adopt_identity(1234);
        sonde.metro.temperature = Some(-40.0);
        sonde.adopt_identity(1234);
        assert_eq!(sonde.metro.temperature, Some(-40.0));
    }

    #[test]
    fn test_adopt_identity_change_resets_entry() {
        let mut sonde = Sonde::new(402_000);
        sonde.adopt_identity(1234);
        sonde.metro.temperature = Some(-40.0);
        sonde.fix.latitude = Some(0.84);

        sonde.adopt_identity(5678);
        assert_eq!(sonde.id, Some(5678));
        assert!(sonde.metro.temperature.is_none());
        assert!(sonde.fix.latitude.is_none());
        assert_eq!(sonde.frequency_khz, 402_000);
    }

    #[test]
    fn test_derive_identity_depends_on_channel_and_tod() {
        let mut a = Sonde::new(402_000);
        a.fix.time_of_day = Some(45_296);
        let mut b = Sonde::new(403_000);
        b.fix.time_of_day = Some(45_296);
        assert_ne!(a.derive_identity(), b.derive_identity());

        let mut c = Sonde::new(402_000);
        c.fix.time_of_day = Some(45_296);
        assert_eq!(a.derive_identity(), c.derive_identity());
    }
}
