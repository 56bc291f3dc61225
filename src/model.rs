//! Packet records as delivered by the decoder.
//!
//! Field names on the wire follow the decoder's visualizer packet format
//! (`time`, `source`, `packetId`, ...). The Rust names describe what the
//! fields mean to the viewer.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Which side of the connection produced the original wire packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Client,
    Server,
}

impl Origin {
    /// The other end of the conversation.
    pub fn opposite(self) -> Self {
        match self {
            Origin::Client => Origin::Server,
            Origin::Server => Origin::Client,
        }
    }
}

impl Display for Origin {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Client => write!(f, "client"),
            Origin::Server => write!(f, "server"),
        }
    }
}

/// Stable position of a record inside one store session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ordinal(pub usize);

impl Ordinal {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl Display for Ordinal {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One captured packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Seconds since the capture started, measured at local receipt.
    #[serde(rename = "time", default)]
    pub arrival_time: f64,

    #[serde(rename = "source")]
    pub origin: Origin,

    #[serde(rename = "packetId")]
    pub type_id: u16,

    /// Decoded packet name. Undecoded packets carry the id as text.
    #[serde(rename = "packetName")]
    pub type_name: String,

    /// Length of the original payload in bytes.
    #[serde(rename = "length")]
    pub byte_length: u64,

    /// The decoded payload as JSON text. Parsed on demand, never mutated.
    #[serde(rename = "data", default)]
    pub content: String,

    /// Base64 copy of the original bytes, when the source provided it.
    #[serde(rename = "binary", default, skip_serializing_if = "Option::is_none")]
    pub raw_binary: Option<String>,

    /// Assigned by the packet store on append.
    #[serde(rename = "index", default, skip_serializing_if = "Option::is_none")]
    pub ordinal: Option<Ordinal>,
}

impl Record {
    /// Name used for records that synthesize the session start.
    pub const HANDSHAKE_NAME: &'static str = "Session Handshake";

    /// Creates an undecoded record: the name is the id and there is no content.
    pub fn undecoded(type_id: u16, origin: Origin, byte_length: u64, arrival_time: f64) -> Self {
        Self {
            arrival_time,
            origin,
            type_id,
            type_name: type_id.to_string(),
            byte_length,
            content: String::new(),
            raw_binary: None,
            ordinal: None,
        }
    }

    /// The synthetic zeroth record announcing a websocket session start.
    pub fn handshake(timestamp: u64, target: &str) -> Self {
        let content = serde_json::json!({
            "timestamp": timestamp,
            "target": target,
        });

        Self {
            arrival_time: 0.0,
            origin: Origin::Server,
            type_id: 0,
            type_name: Self::HANDSHAKE_NAME.to_string(),
            byte_length: 0,
            content: content.to_string(),
            raw_binary: None,
            ordinal: None,
        }
    }

    pub fn is_handshake(&self) -> bool {
        self.byte_length == 0 && self.type_name == Self::HANDSHAKE_NAME
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.3}s] [{} -> {}] {} {} of length {}",
            self.arrival_time,
            self.origin,
            self.origin.opposite(),
            self.type_id,
            self.type_name,
            self.byte_length
        )
    }
}
