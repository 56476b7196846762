//! sonde: capture replay frontend for the sonde-core decoder.
//!
//! Reads capture files of demodulated hex frames (one per line, with an
//! optional leading timestamp in seconds), runs them through a decoding
//! session, and prints the emitted host report lines plus a summary table
//! of all tracked sondes.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use comfy_table::Table;

use sonde_core::report::ReportSink;
use sonde_core::session::{EventSink, HeardEvent, ProcessOutcome, RxMeta, Session};
use sonde_core::types::hex_decode;

#[derive(Parser)]
#[command(name = "sonde", version, about = "iMet radiosonde frame decoder and tracker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode hex frames from a capture file and print a sonde table
    Decode {
        /// Path to capture file (`timestamp hex` or bare hex per line)
        file: PathBuf,

        /// Receive channel frequency in Hz
        #[arg(long, env = "SONDE_FREQUENCY_HZ", default_value_t = 402_000_000.0)]
        frequency_hz: f64,

        /// Measured RX frequency offset in Hz
        #[arg(long, default_value_t = 0.0)]
        offset_hz: f64,

        /// Signal strength fed into reports
        #[arg(long, default_value_t = -90.0)]
        rssi: f64,

        /// Registry capacity (channels)
        #[arg(long, default_value_t = 16)]
        capacity: usize,

        /// Print each emitted report line
        #[arg(short, long)]
        reports: bool,

        /// Re-emit reports for every tracked sonde after replay
        #[arg(long)]
        resend: bool,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Decode {
            file,
            frequency_hz,
            offset_hz,
            rssi,
            capacity,
            reports,
            resend,
        } => cmd_decode(file, frequency_hz, offset_hz, rssi, capacity, reports, resend),
    };

    if let Err(e) = result {
        log::error!("{e}");
        std::process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// Host channel / event sinks
// ---------------------------------------------------------------------------

/// Prints report lines to stdout, tagged with their host channel.
#[derive(Default)]
struct HostChannels {
    print: bool,
    position_lines: u64,
    info_lines: u64,
}

impl ReportSink for HostChannels {
    fn position_report(&mut self, line: &str) {
        self.position_lines += 1;
        if self.print {
            println!("KISS {line}");
        }
    }

    fn info_report(&mut self, line: &str) {
        self.info_lines += 1;
        if self.print {
            println!("INFO {line}");
        }
    }
}

struct HeardLogger;

impl EventSink for HeardLogger {
    fn sonde_heard(&mut self, event: HeardEvent) {
        log::info!("heard {} sonde on {} Hz", event.family, event.frequency_hz);
    }
}

// ---------------------------------------------------------------------------
// decode command
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn cmd_decode(
    file: PathBuf,
    frequency_hz: f64,
    offset_hz: f64,
    rssi: f64,
    capacity: usize,
    reports: bool,
    resend: bool,
) -> sonde_core::Result<()> {
    let reader = BufReader::new(File::open(&file)?);

    let mut session = Session::with_capacity(capacity);
    let mut sink = HostChannels {
        print: reports,
        ..HostChannels::default()
    };
    let mut events = HeardLogger;

    let mut total = 0u64;
    let mut decoded = 0u64;
    let mut bad_checksum = 0u64;
    let mut unrecognized = 0u64;
    let mut ignored = 0u64;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (timestamp, hex) = split_line(line, total);
        let buffer = match hex_decode(hex) {
            Some(b) => b,
            None => {
                log::warn!("{}:{}: not a hex frame, skipped", file.display(), line_no + 1);
                continue;
            }
        };

        total += 1;
        let rx = RxMeta {
            frequency_hz,
            offset_hz,
            rssi,
            real_time: (timestamp * 100.0) as u64,
        };
        match session.process_buffer(&buffer, &rx, &mut sink, &mut events) {
            ProcessOutcome::Decoded { .. } => decoded += 1,
            ProcessOutcome::ChecksumFailed => bad_checksum += 1,
            ProcessOutcome::Unrecognized => unrecognized += 1,
            ProcessOutcome::Ignored => ignored += 1,
        }
    }

    if resend {
        session.resend_all(&mut sink);
    }

    log::info!(
        "{total} frames: {decoded} decoded, {bad_checksum} bad checksum, \
         {unrecognized} unrecognized, {ignored} ignored"
    );
    log::info!(
        "{} position lines, {} info lines emitted",
        sink.position_lines,
        sink.info_lines
    );

    print_sonde_table(&session);
    Ok(())
}

/// Split a capture line into `(timestamp, hex)`. Lines without a leading
/// timestamp get a synthetic one-second spacing.
fn split_line(line: &str, index: u64) -> (f64, &str) {
    let mut parts = line.split_whitespace();
    let first = parts.next().unwrap_or("");
    match parts.next() {
        Some(second) => match first.parse::<f64>() {
            Ok(ts) => (ts, second),
            Err(_) => (index as f64, first),
        },
        None => (index as f64, first),
    }
}

fn print_sonde_table(session: &Session) {
    let mut table = Table::new();
    table.set_header([
        "ID", "Name", "Freq [MHz]", "Lat", "Lon", "Alt [m]", "Climb [m/s]", "Temp [°C]",
        "P [hPa]", "Batt [V]", "Frames",
    ]);

    for sonde in session.registry().iter() {
        table.add_row([
            sonde.id.map(|id| id.to_string()).unwrap_or_default(),
            sonde.name.clone(),
            format!("{:.3}", sonde.frequency_khz as f64 / 1e3),
            fmt_opt(sonde.fix.latitude.map(f64::to_degrees), 5),
            fmt_opt(sonde.fix.longitude.map(f64::to_degrees), 5),
            fmt_opt(sonde.fix.altitude, 0),
            fmt_opt(sonde.fix.climb_rate, 1),
            fmt_opt(sonde.metro.temperature, 1),
            fmt_opt(sonde.metro.pressure, 1),
            fmt_opt(sonde.metro.battery_voltage, 1),
            sonde.frame_count.to_string(),
        ]);
    }

    println!("{table}");
}

fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    value
        .map(|v| format!("{v:.decimals$}"))
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
