//! Decoder websocket frames
//!
//! Every frame is a JSON object with a numeric `packetId` selecting the
//! message kind:
//!
//! ```text
//! client → decoder   {"packetId":0}                     handshake request
//! decoder → client   {"packetId":0,"data":<unix-ts>}    handshake ack
//! decoder → client   {"packetId":1,"data":<Record>}     decoded packet
//! ```
//!
//! Any other id decodes to `Frame::Unknown` and is ignored by the reader.

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::model::Record;

/// Handshake request / acknowledgement
pub const HANDSHAKE_ID: u16 = 0;

/// Decoded packet
pub const PACKET_ID: u16 = 1;

/// Errors decoding a single inbound frame
#[derive(Error, Debug)]
pub enum FrameError {
    /// Not JSON, or not shaped like a frame/record
    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),

    /// Handshake ack whose `data` is not a timestamp
    #[error("handshake ack without a timestamp")]
    MissingTimestamp,
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    HandshakeAck { timestamp: u64 },
    Packet(Box<Record>),
    Unknown(u16),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "packetId")]
    packet_id: u16,
    #[serde(default)]
    data: serde_json::Value,
}

impl Frame {
    /// Decode a text frame.
    pub fn decode(text: &str) -> Result<Self, FrameError> {
        let envelope: Envelope = serde_json::from_str(text)?;

        match envelope.packet_id {
            HANDSHAKE_ID => {
                let timestamp = envelope
                    .data
                    .as_u64()
                    .or_else(|| envelope.data.as_f64().map(|ts| ts as u64))
                    .ok_or(FrameError::MissingTimestamp)?;
                Ok(Frame::HandshakeAck { timestamp })
            }
            PACKET_ID => {
                let record: Record = serde_json::from_value(envelope.data)?;
                Ok(Frame::Packet(Box::new(record)))
            }
            other => Ok(Frame::Unknown(other)),
        }
    }

    /// Encode as a text frame, the way the decoder sends it.
    pub fn encode(&self) -> String {
        match self {
            Frame::HandshakeAck { timestamp } => {
                json!({ "packetId": HANDSHAKE_ID, "data": timestamp }).to_string()
            }
            Frame::Packet(record) => {
                json!({ "packetId": PACKET_ID, "data": record }).to_string()
            }
            Frame::Unknown(id) => json!({ "packetId": id }).to_string(),
        }
    }
}

/// The request sent right after the websocket opens.
pub fn handshake_request() -> String {
    json!({ "packetId": HANDSHAKE_ID }).to_string()
}

#[cfg(test)]
#[path = "protocol_test.rs"]
mod tests;
