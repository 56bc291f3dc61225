//! Bulk import and export of packet dumps
//!
//! Import understands three formats, picked by content:
//!
//! - legacy pcap captures (by magic number); each IPv4 UDP/TCP frame with a
//!   payload becomes one undecoded record
//! - JSON arrays of decoded records (what `export` writes)
//! - JSON arrays of raw sniffer packets (`id`, `data` as base64, `received`
//!   in milliseconds); converted to undecoded records
//!
//! Imported records keep their order but not their `index`: the store hands
//! out fresh ordinals when they are appended.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use pcap_parser::traits::PcapReaderIterator;
use pcap_parser::{LegacyPcapReader, PcapBlockOwned, PcapError};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::CaptureConfig;
use crate::error::{Result, ViewerError};
use crate::model::{Origin, Record};

/// Legacy pcap magic numbers (micro/nanosecond, both byte orders)
const PCAP_MAGICS: [[u8; 4]; 4] = [
    [0xd4, 0xc3, 0xb2, 0xa1],
    [0xa1, 0xb2, 0xc3, 0xd4],
    [0x4d, 0x3c, 0xb2, 0xa1],
    [0xa1, 0xb2, 0x3c, 0x4d],
];

/// pcapng section header block type
const PCAPNG_MAGIC: [u8; 4] = [0x0a, 0x0d, 0x0d, 0x0a];

/// Reader buffer size for capture files
const PCAP_BUFFER_SIZE: usize = 65536;

// Link-layer header types handled by the frame parser
const LINKTYPE_NULL: i32 = 0;
const LINKTYPE_ETHERNET: i32 = 1;
const LINKTYPE_RAW: i32 = 101;
const LINKTYPE_LINUX_SLL: i32 = 113;
const LINKTYPE_IPV4: i32 = 228;

const ETHERTYPE_IPV4: u16 = 0x0800;
const ETHERTYPE_VLAN: u16 = 0x8100;

const IP_PROTO_TCP: u8 = 6;
const IP_PROTO_UDP: u8 = 17;

/// Load every record from a dump or capture file.
pub fn load(path: &Path, capture: &CaptureConfig) -> Result<Vec<Record>> {
    let data = std::fs::read(path).map_err(|source| ViewerError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    let records = match data.get(..4) {
        Some(magic) if PCAP_MAGICS.iter().any(|m| m == magic) => read_pcap(&data, capture)?,
        Some(magic) if magic == PCAPNG_MAGIC => {
            return Err(ViewerError::Capture(
                "pcapng captures are not supported, convert to legacy pcap".to_string(),
            ))
        }
        _ => read_json(&data)?,
    };

    info!(path = %path.display(), count = records.len(), "loaded packet dump");
    Ok(records)
}

/// Write the records to `<dir>/dump-<unix-ts>.json` and return the path.
pub fn export(records: &[Arc<Record>], dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    let mut path = dir.join(format!("dump-{timestamp}.json"));
    let mut suffix = 1;
    while path.exists() {
        path = dir.join(format!("dump-{timestamp}-{suffix}.json"));
        suffix += 1;
    }

    write_dump(records, &path)?;
    info!(path = %path.display(), count = records.len(), "exported packet dump");
    Ok(path)
}

/// Serialize records as a pretty JSON array.
pub fn write_dump(records: &[Arc<Record>], path: &Path) -> Result<()> {
    let records: Vec<&Record> = records.iter().map(Arc::as_ref).collect();
    let encoded = serde_json::to_string_pretty(&records)?;
    std::fs::write(path, encoded)?;
    Ok(())
}

// ============================================================================
// JSON dumps
// ============================================================================

/// A packet as written by the raw sniffer, before decoding.
#[derive(Debug, Deserialize)]
struct RawPacket {
    id: u16,
    /// Base64 payload
    data: String,
    source: RawOrigin,
    /// Milliseconds since sniffing began
    received: u64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
enum RawOrigin {
    #[serde(alias = "client")]
    Client,
    #[serde(alias = "server")]
    Server,
}

impl From<RawOrigin> for Origin {
    fn from(origin: RawOrigin) -> Self {
        match origin {
            RawOrigin::Client => Origin::Client,
            RawOrigin::Server => Origin::Server,
        }
    }
}

fn read_json(data: &[u8]) -> Result<Vec<Record>> {
    let values: Vec<serde_json::Value> = serde_json::from_slice(data)
        .map_err(|e| ViewerError::InvalidDump(format!("expected a JSON array: {e}")))?;

    let Some(first) = values.first() else {
        return Ok(Vec::new());
    };

    if first.get("packetId").is_some() {
        values
            .into_iter()
            .enumerate()
            .map(|(i, value)| {
                serde_json::from_value::<Record>(value)
                    .map_err(|e| ViewerError::InvalidDump(format!("record {i}: {e}")))
            })
            .collect()
    } else if first.get("id").is_some() && first.get("received").is_some() {
        let packets = values
            .into_iter()
            .enumerate()
            .map(|(i, value)| {
                serde_json::from_value::<RawPacket>(value)
                    .map_err(|e| ViewerError::InvalidDump(format!("packet {i}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        read_raw_packets(packets)
    } else {
        Err(ViewerError::InvalidDump(
            "unrecognised element format".to_string(),
        ))
    }
}

fn read_raw_packets(packets: Vec<RawPacket>) -> Result<Vec<Record>> {
    let base_time = packets.first().map_or(0, |p| p.received);

    packets
        .into_iter()
        .enumerate()
        .map(|(i, packet)| {
            let bytes = BASE64_STANDARD
                .decode(packet.data.as_bytes())
                .map_err(|e| ViewerError::InvalidDump(format!("packet {i}: {e}")))?;

            let elapsed_ms = packet.received.saturating_sub(base_time);
            let mut record = Record::undecoded(
                packet.id,
                packet.source.into(),
                bytes.len() as u64,
                elapsed_ms as f64 / 1000.0,
            );
            record.raw_binary = Some(packet.data);
            Ok(record)
        })
        .collect()
}

// ============================================================================
// pcap captures
// ============================================================================

fn read_pcap(data: &[u8], capture: &CaptureConfig) -> Result<Vec<Record>> {
    let mut reader = LegacyPcapReader::new(PCAP_BUFFER_SIZE, data)
        .map_err(|e| ViewerError::Capture(format!("{e:?}")))?;

    let mut records = Vec::new();
    let mut linktype = LINKTYPE_ETHERNET;
    let mut base_time: Option<f64> = None;
    let mut skipped = 0usize;
    let mut stalled = false;

    loop {
        match reader.next() {
            Ok((offset, block)) => {
                stalled = false;
                match block {
                    PcapBlockOwned::LegacyHeader(header) => linktype = header.network.0,
                    PcapBlockOwned::Legacy(frame) => {
                        let ts = frame.ts_sec as f64 + frame.ts_usec as f64 / 1_000_000.0;
                        let base = *base_time.get_or_insert(ts);
                        match frame_record(linktype, frame.data, ts - base, &capture.server_ports) {
                            Some(record) => records.push(record),
                            None => skipped += 1,
                        }
                    }
                    PcapBlockOwned::NG(_) => {}
                }
                reader.consume(offset);
            }
            Err(PcapError::Eof) => break,
            Err(PcapError::Incomplete(_)) => {
                if stalled {
                    return Err(ViewerError::Capture("truncated capture file".to_string()));
                }
                stalled = true;
                reader
                    .refill()
                    .map_err(|e| ViewerError::Capture(format!("{e:?}")))?;
            }
            Err(e) => return Err(ViewerError::Capture(format!("{e:?}"))),
        }
    }

    debug!(kept = records.len(), skipped, "parsed capture frames");
    Ok(records)
}

/// Turn one captured frame into an undecoded record.
///
/// Returns `None` for anything that is not IPv4 UDP/TCP with a payload.
fn frame_record(linktype: i32, frame: &[u8], time: f64, server_ports: &[u16]) -> Option<Record> {
    let ip = ipv4_packet(linktype, frame)?;
    if ip.len() < 20 || ip[0] >> 4 != 4 {
        return None;
    }

    let header_len = ((ip[0] & 0x0f) as usize) * 4;
    let total_len = (u16::from_be_bytes([ip[2], ip[3]]) as usize).min(ip.len());
    let protocol = ip[9];
    let segment = ip.get(header_len..total_len)?;
    if segment.len() < 4 {
        return None;
    }

    let src_port = u16::from_be_bytes([segment[0], segment[1]]);
    let dst_port = u16::from_be_bytes([segment[2], segment[3]]);

    let (label, payload) = match protocol {
        IP_PROTO_UDP => ("udp", segment.get(8..)?),
        IP_PROTO_TCP => {
            let data_offset = ((*segment.get(12)? >> 4) as usize) * 4;
            ("tcp", segment.get(data_offset..)?)
        }
        _ => return None,
    };
    if payload.is_empty() {
        return None;
    }

    let origin = if server_ports.contains(&src_port) {
        Origin::Server
    } else {
        Origin::Client
    };

    let mut record = Record::undecoded(0, origin, payload.len() as u64, time);
    record.type_name = format!("{label} {src_port} -> {dst_port}");
    record.raw_binary = Some(BASE64_STANDARD.encode(payload));
    Some(record)
}

/// Strip the link-layer header, keeping only IPv4 frames.
fn ipv4_packet(linktype: i32, frame: &[u8]) -> Option<&[u8]> {
    match linktype {
        LINKTYPE_RAW | LINKTYPE_IPV4 => Some(frame),
        LINKTYPE_NULL => {
            // 4-byte host-order address family, 2 = AF_INET
            let family = frame.get(..4)?;
            (family == [2, 0, 0, 0] || family == [0, 0, 0, 2]).then(|| &frame[4..])
        }
        LINKTYPE_ETHERNET => {
            let mut offset = 12;
            let mut ethertype = u16::from_be_bytes([*frame.get(offset)?, *frame.get(offset + 1)?]);
            if ethertype == ETHERTYPE_VLAN {
                offset += 4;
                ethertype = u16::from_be_bytes([*frame.get(offset)?, *frame.get(offset + 1)?]);
            }
            (ethertype == ETHERTYPE_IPV4).then(|| &frame[offset + 2..])
        }
        LINKTYPE_LINUX_SLL => {
            let protocol = u16::from_be_bytes([*frame.get(14)?, *frame.get(15)?]);
            (protocol == ETHERTYPE_IPV4).then(|| &frame[16..])
        }
        _ => None,
    }
}

#[cfg(test)]
#[path = "io_test.rs"]
mod tests;
