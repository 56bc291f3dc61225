//! Decoder websocket reader
//!
//! Connects to `ws://<target>`, sends the handshake request and forwards
//! decoded packets into the feed. The handshake ack is turned into one
//! synthetic "Session Handshake" record. Malformed frames are dropped and
//! logged; they never end the feed. There is no reconnection: when the
//! socket closes (or never opens) the feed reports `Closed` and goes quiet.

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::model::Record;
use crate::transport::protocol::{self, Frame};
use crate::transport::{ConnectionState, FeedSender};

/// Read from the decoder at `target` (`host:port`) until the socket closes.
pub async fn run(target: String, feed: FeedSender) {
    let url = format!("ws://{target}");

    let mut stream = match connect_async(url.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            warn!(%target, error = %e, "failed to connect to decoder");
            feed.state(ConnectionState::Closed);
            return;
        }
    };

    info!(%target, "connected to decoder");
    feed.state(ConnectionState::Open);

    if let Err(e) = stream.send(Message::Text(protocol::handshake_request())).await {
        warn!(%target, error = %e, "failed to send handshake request");
        feed.state(ConnectionState::Closed);
        return;
    }

    let mut handshaken = false;

    while let Some(message) = stream.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "dropping non UTF-8 binary frame");
                    continue;
                }
            },
            Ok(Message::Close(frame)) => {
                debug!(?frame, "decoder closed the connection");
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                warn!(%target, error = %e, "websocket read failed");
                break;
            }
        };

        let delivered = match Frame::decode(&text) {
            Ok(Frame::HandshakeAck { timestamp }) if !handshaken => {
                handshaken = true;
                info!(timestamp, "decoder session started");
                feed.record(Record::handshake(timestamp, &target))
            }
            Ok(Frame::HandshakeAck { .. }) => {
                debug!("ignoring repeated handshake ack");
                true
            }
            Ok(Frame::Packet(record)) => feed.record(*record),
            Ok(Frame::Unknown(packet_id)) => {
                debug!(packet_id, "ignoring frame with unknown packet id");
                true
            }
            Err(e) => {
                warn!(error = %e, "dropping malformed frame");
                true
            }
        };

        if !delivered {
            debug!("feed consumer gone, closing decoder connection");
            break;
        }
    }

    feed.state(ConnectionState::Closed);
}

#[cfg(test)]
#[path = "socket_test.rs"]
mod tests;
