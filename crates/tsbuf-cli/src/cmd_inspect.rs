/// Implementation of `tsbuf inspect`.
///
/// Streams every packet through [`StreamBuffer`] and tallies what it sees
/// per PID. Decode failures are counted and listed but do not stop the
/// walk; only a fatal buffer error does.
///
/// # Example output
///
/// ```text
/// Source:         capture.ts
/// Packet size:    188 (detected)
/// Packets:        4
/// Bytes read:     752
/// Decode errors:  0
///
/// PID       Packets   PUSI   CC gaps
/// ──────────────────────────────────
/// 0x0000          1      1         0
/// 0x0100          3      1         1
/// ```
///
/// A continuity gap is counted when a payload-carrying packet's counter
/// is neither the previous counter plus one (mod 16) nor a repeat of it.
/// Null packets are never checked.
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Write as _;

use anyhow::{Context, Result};
use serde::Serialize;
use tsbuf_buffer::{BufferConfig, BufferError, StreamBuffer};
use tsbuf_types::{TsPacket, TsPacketDecoder};
use tsbuf_wire::ByteSource;

use crate::{InspectArgs, input_name, open_input};

/// At most this many decode errors are listed individually.
const MAX_LISTED_ERRORS: usize = 20;

#[derive(Debug, Serialize)]
pub struct Report {
    pub source: String,
    pub packet_size: usize,
    pub detected: bool,
    pub packets: u64,
    pub bytes_read: u64,
    pub decode_errors: u64,
    pub errors: Vec<ErrorEntry>,
    pub pids: Vec<PidSummary>,
}

#[derive(Debug, Serialize)]
pub struct ErrorEntry {
    pub packet: Option<u64>,
    pub message: String,
}

#[derive(Debug, Default, Serialize)]
pub struct PidSummary {
    pub pid: u16,
    pub packets: u64,
    pub payload_unit_starts: u64,
    pub continuity_gaps: u64,
    #[serde(skip)]
    last_counter: Option<u8>,
}

impl PidSummary {
    fn observe(&mut self, packet: &TsPacket) {
        let header = &packet.header;
        self.packets += 1;
        if header.payload_unit_start {
            self.payload_unit_starts += 1;
        }
        if header.is_null() || !header.adaptation_field_control.has_payload() {
            return;
        }

        let counter = header.continuity_counter;
        if let Some(last) = self.last_counter {
            if counter != (last + 1) & 0x0F && counter != last {
                self.continuity_gaps += 1;
            }
        }
        self.last_counter = Some(counter);
    }
}

/// Run the `tsbuf inspect` command.
///
/// # Errors
///
/// Returns an error if the input cannot be opened, the buffer cannot be
/// built, or a refill fails. Per-packet decode errors are reported, not
/// returned.
pub fn run(args: &InspectArgs) -> Result<()> {
    let name = input_name(&args.input);
    let source = open_input(&args.input)?;

    let mut config = BufferConfig::default()
        .with_packet_size(args.packet_size)
        .with_chunk_packets(args.chunk_packets);
    if let Some(workers) = args.workers {
        config = config.with_workers(workers);
    }
    log::debug!("inspecting {name} with {config:?}");

    let buffer = StreamBuffer::new(source, TsPacketDecoder, &config)
        .with_context(|| format!("cannot open packet buffer on {name}"))?;
    let report = collect(name, buffer).context("reading stream failed")?;

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("serialising report failed")?;
        println!("{json}");
    } else {
        print!("{}", render(&report));
    }
    Ok(())
}

/// Drain `buffer` into a report. Stops at end of stream or on the first
/// fatal error.
fn collect<S: ByteSource>(
    source: String,
    mut buffer: StreamBuffer<S, TsPacketDecoder>,
) -> Result<Report, BufferError> {
    let mut pids: BTreeMap<u16, PidSummary> = BTreeMap::new();
    let mut errors = Vec::new();
    let mut packets = 0;
    let mut decode_errors = 0;

    for outcome in &mut buffer {
        match outcome {
            Ok(packet) => {
                packets += 1;
                pids.entry(packet.header.pid)
                    .or_insert_with(|| PidSummary {
                        pid: packet.header.pid,
                        ..PidSummary::default()
                    })
                    .observe(&packet);
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                decode_errors += 1;
                log::debug!("{}", describe(&e));
                if errors.len() < MAX_LISTED_ERRORS {
                    errors.push(ErrorEntry {
                        packet: e.packet_index(),
                        message: describe(&e),
                    });
                }
            }
        }
    }

    Ok(Report {
        source,
        packet_size: buffer.packet_size(),
        detected: buffer.detection().is_some(),
        packets,
        bytes_read: buffer.stats().bytes_read,
        decode_errors,
        errors,
        pids: pids.into_values().collect(),
    })
}

/// `err` followed by each of its sources, colon separated.
fn describe(err: &dyn Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let _ = write!(out, ": {cause}");
        source = cause.source();
    }
    out
}

fn render(report: &Report) -> String {
    let mut out = String::new();
    let how = if report.detected { "detected" } else { "given" };

    let _ = writeln!(out, "{:<16}{}", "Source:", report.source);
    let _ = writeln!(out, "{:<16}{} ({how})", "Packet size:", report.packet_size);
    let _ = writeln!(out, "{:<16}{}", "Packets:", report.packets);
    let _ = writeln!(out, "{:<16}{}", "Bytes read:", report.bytes_read);
    let _ = writeln!(out, "{:<16}{}", "Decode errors:", report.decode_errors);

    if !report.pids.is_empty() {
        let sep = "─".repeat(34);
        let _ = writeln!(out);
        let _ = writeln!(out, "{:<8}{:>9}{:>7}{:>10}", "PID", "Packets", "PUSI", "CC gaps");
        let _ = writeln!(out, "{sep}");
        for pid in &report.pids {
            let _ = writeln!(
                out,
                "{:<8}{:>9}{:>7}{:>10}",
                format!("{:#06x}", pid.pid),
                pid.packets,
                pid.payload_unit_starts,
                pid.continuity_gaps
            );
        }
    }

    if !report.errors.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Errors:");
        for entry in &report.errors {
            match entry.packet {
                Some(index) => {
                    let _ = writeln!(out, "  packet {index}: {}", entry.message);
                }
                None => {
                    let _ = writeln!(out, "  {}", entry.message);
                }
            }
        }
        let unlisted = report.decode_errors - report.errors.len() as u64;
        if unlisted > 0 {
            let _ = writeln!(out, "  ... and {unlisted} more");
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// One payload-only 188-byte packet.
    fn packet(pid: u16, pusi: bool, counter: u8) -> Vec<u8> {
        let mut bytes = vec![0xFFu8; 188];
        bytes[0] = 0x47;
        bytes[1] = (if pusi { 0x40 } else { 0 }) | (pid >> 8) as u8;
        bytes[2] = (pid & 0xFF) as u8;
        bytes[3] = 0x10 | counter;
        bytes
    }

    fn inspect(data: Vec<u8>, packet_size: usize) -> Report {
        let config = BufferConfig::default()
            .with_packet_size(packet_size)
            .with_chunk_packets(3)
            .with_workers(2);
        let buffer = StreamBuffer::new(Cursor::new(data), TsPacketDecoder, &config).unwrap();
        collect("capture.ts".to_string(), buffer).unwrap()
    }

    fn sample() -> Vec<u8> {
        [
            packet(0x0000, true, 0),
            packet(0x0100, true, 0),
            packet(0x0100, false, 1),
            packet(0x0100, false, 3),
        ]
        .concat()
    }

    #[test]
    fn counts_pids_and_gaps() {
        let report = inspect(sample(), 0);
        assert!(report.detected);
        assert_eq!(report.packets, 4);
        assert_eq!(report.pids.len(), 2);
        assert_eq!(report.pids[1].continuity_gaps, 1);
        assert_eq!(report.pids[1].payload_unit_starts, 1);
    }

    #[test]
    fn repeated_counter_is_not_a_gap() {
        let data = [
            packet(0x0100, false, 7),
            packet(0x0100, false, 7),
            packet(0x0100, false, 8),
        ]
        .concat();
        let report = inspect(data, 188);
        assert_eq!(report.pids[0].continuity_gaps, 0);
    }

    #[test]
    fn counter_wraps_without_gap() {
        let data = [packet(0x0100, false, 15), packet(0x0100, false, 0)].concat();
        let report = inspect(data, 188);
        assert_eq!(report.pids[0].continuity_gaps, 0);
    }

    #[test]
    fn renders_table() {
        insta::assert_snapshot!(render(&inspect(sample(), 0)), @r"
        Source:         capture.ts
        Packet size:    188 (detected)
        Packets:        4
        Bytes read:     752
        Decode errors:  0

        PID       Packets   PUSI   CC gaps
        ──────────────────────────────────
        0x0000          1      1         0
        0x0100          3      1         1
        ");
    }

    #[test]
    fn renders_decode_errors() {
        let mut data = sample();
        data[188] = 0x00;
        data.extend_from_slice(&[0x47, 0x01, 0x00]);

        let report = inspect(data, 188);
        assert_eq!(report.decode_errors, 2);
        insta::assert_snapshot!(render(&report), @r"
        Source:         capture.ts
        Packet size:    188 (given)
        Packets:        3
        Bytes read:     755
        Decode errors:  2

        PID       Packets   PUSI   CC gaps
        ──────────────────────────────────
        0x0000          1      1         0
        0x0100          2      0         1

        Errors:
          packet 1: building packet 1 failed: packet does not start with sync byte: found 0x00
          packet 4: packet 4 truncated: 3 of 188 bytes before end of stream
        ");
    }

    #[test]
    fn serialises_report_as_json() {
        let report = inspect(sample(), 188);
        insta::assert_snapshot!(serde_json::to_string(&report.pids[1]).unwrap(), @r#"{"pid":256,"packets":3,"payload_unit_starts":1,"continuity_gaps":1}"#);
    }
}
