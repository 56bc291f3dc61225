//! Tests for decoder frames

use super::*;
use crate::model::Origin;

#[test]
fn test_handshake_request_shape() {
    let value: serde_json::Value = serde_json::from_str(&handshake_request()).unwrap();
    assert_eq!(value, serde_json::json!({ "packetId": 0 }));
}

#[test]
fn test_decode_handshake_ack() {
    let frame = Frame::decode(r#"{"packetId":0,"data":1700000000}"#).unwrap();
    assert_eq!(frame, Frame::HandshakeAck { timestamp: 1_700_000_000 });
}

#[test]
fn test_decode_handshake_ack_with_fractional_timestamp() {
    let frame = Frame::decode(r#"{"packetId":0,"data":1700000000.75}"#).unwrap();
    assert_eq!(frame, Frame::HandshakeAck { timestamp: 1_700_000_000 });
}

#[test]
fn test_decode_handshake_ack_without_timestamp() {
    let err = Frame::decode(r#"{"packetId":0}"#).unwrap_err();
    assert!(matches!(err, FrameError::MissingTimestamp));
}

#[test]
fn test_decode_packet() {
    let text = r#"{"packetId":1,"data":{
        "time": 0.5, "source": "server", "packetId": 112,
        "packetName": "SceneEntityAppearNotify", "length": 64, "data": "{}"
    }}"#;

    match Frame::decode(text).unwrap() {
        Frame::Packet(record) => {
            assert_eq!(record.type_id, 112);
            assert_eq!(record.origin, Origin::Server);
            assert_eq!(record.byte_length, 64);
        }
        other => panic!("unexpected frame: {other:?}"),
    }
}

#[test]
fn test_decode_unknown_id() {
    let frame = Frame::decode(r#"{"packetId":7,"data":"whatever"}"#).unwrap();
    assert_eq!(frame, Frame::Unknown(7));
}

#[test]
fn test_decode_malformed() {
    assert!(matches!(Frame::decode("{not json"), Err(FrameError::Json(_))));
    assert!(matches!(Frame::decode(r#"{"data":1}"#), Err(FrameError::Json(_))));
    // Packet frame whose record is incomplete
    assert!(matches!(
        Frame::decode(r#"{"packetId":1,"data":{"packetId":3}}"#),
        Err(FrameError::Json(_))
    ));
}

#[test]
fn test_encoded_frames_decode_back() {
    let record = Record::undecoded(9, Origin::Client, 2, 1.0);
    let frames = [
        Frame::HandshakeAck { timestamp: 42 },
        Frame::Packet(Box::new(record)),
        Frame::Unknown(3),
    ];

    for frame in frames {
        assert_eq!(Frame::decode(&frame.encode()).unwrap(), frame);
    }
}
