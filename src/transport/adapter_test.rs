//! Tests for source switching

use std::time::Duration;

use super::*;
use crate::model::Origin;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::{accept_async, tungstenite::Message};

const CHANNEL: &str = "test://visualizer";

fn make_adapter() -> (
    TransportAdapter,
    Arc<EventBus>,
    mpsc::UnboundedReceiver<FeedEvent>,
) {
    let bus = Arc::new(EventBus::new());
    let (tx, rx) = mpsc::unbounded_channel();
    (TransportAdapter::new(Arc::clone(&bus), CHANNEL, tx), bus, rx)
}

fn drain(rx: &mut mpsc::UnboundedReceiver<FeedEvent>) -> Vec<FeedEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

// ============================================================================
// Targets
// ============================================================================

#[test]
fn test_target_from_address() {
    assert_eq!(Target::from_address(None), Target::Bus);
    assert_eq!(Target::from_address(Some("  ")), Target::Bus);
    assert_eq!(
        Target::from_address(Some("127.0.0.1:1234")),
        Target::Socket("127.0.0.1:1234".to_string())
    );
    assert_eq!(Target::Socket("h:1".into()).to_string(), "ws://h:1");
}

// ============================================================================
// Bus attachment
// ============================================================================

#[test]
fn test_bus_attach_reports_open() {
    let (mut adapter, bus, mut rx) = make_adapter();
    let id = adapter.switch(Target::Bus);

    let states: Vec<_> = drain(&mut rx).into_iter().map(|e| (e.subscription, e.kind)).collect();
    assert_eq!(
        states,
        vec![
            (id, FeedEventKind::State(ConnectionState::Connecting)),
            (id, FeedEventKind::State(ConnectionState::Open)),
        ]
    );
    assert_eq!(bus.subscriber_count(CHANNEL), 1);
    assert!(adapter.is_current(id));
}

#[test]
fn test_bus_open_precedes_concurrent_records() {
    use std::sync::atomic::{AtomicBool, Ordering};

    let (mut adapter, bus, mut rx) = make_adapter();
    let stop = Arc::new(AtomicBool::new(false));

    let publisher = {
        let bus = Arc::clone(&bus);
        let stop = Arc::clone(&stop);
        std::thread::spawn(move || {
            let mut sent = 0u16;
            while !stop.load(Ordering::Relaxed) {
                bus.publish(CHANNEL, Record::undecoded(sent, Origin::Client, 1, 0.0));
                sent = sent.wrapping_add(1);
            }
        })
    };

    let mut ids = Vec::new();
    for _ in 0..50 {
        ids.push(adapter.switch(Target::Bus));
    }
    // Nothing published before the switch returns may be lost
    bus.publish(CHANNEL, Record::undecoded(u16::MAX, Origin::Server, 1, 0.0));
    stop.store(true, Ordering::Relaxed);
    publisher.join().unwrap();

    let events = drain(&mut rx);
    for id in ids {
        let kinds: Vec<_> = events
            .iter()
            .filter(|e| e.subscription == id)
            .map(|e| &e.kind)
            .collect();
        let open = kinds
            .iter()
            .position(|k| **k == FeedEventKind::State(ConnectionState::Open))
            .expect("every bus attachment reports open");
        let first_record = kinds.iter().position(|k| matches!(k, FeedEventKind::Record(_)));
        if let Some(first_record) = first_record {
            assert!(open < first_record, "record delivered before open");
        }
    }

    let last = adapter.current().unwrap();
    assert!(events.iter().any(|e| e.subscription == last
        && matches!(&e.kind, FeedEventKind::Record(r) if r.type_id == u16::MAX)));
}

#[test]
fn test_rebinding_bus_keeps_one_subscription() {
    let (mut adapter, bus, mut rx) = make_adapter();
    let first = adapter.switch(Target::Bus);
    let second = adapter.switch(Target::Bus);
    assert_ne!(first, second);
    assert_eq!(bus.subscriber_count(CHANNEL), 1);

    drain(&mut rx);
    bus.publish(CHANNEL, Record::undecoded(1, Origin::Client, 1, 0.0));

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].subscription, second);
}

#[test]
fn test_drop_detaches_from_bus() {
    let (mut adapter, bus, _rx) = make_adapter();
    adapter.switch(Target::Bus);
    assert_eq!(bus.subscriber_count(CHANNEL), 1);

    drop(adapter);
    assert_eq!(bus.subscriber_count(CHANNEL), 0);
}

#[test]
fn test_detach_without_source() {
    let (mut adapter, _bus, _rx) = make_adapter();
    assert!(!adapter.detach());
    assert_eq!(adapter.current(), None);
}

// ============================================================================
// Socket → bus
// ============================================================================

#[tokio::test]
async fn test_switch_socket_to_bus() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let (gone_tx, gone_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(tcp).await.unwrap();
        let _ = ws.next().await;
        let ack = Frame::HandshakeAck { timestamp: 5 }.encode();
        ws.send(Message::Text(ack)).await.unwrap();

        // Wait for the viewer to tear the connection down
        while let Some(Ok(_)) = ws.next().await {}
        let _ = gone_tx.send(());
    });

    let (mut adapter, bus, mut rx) = make_adapter();
    let socket_id = adapter.switch(Target::Socket(address));

    // Wait for the synthetic handshake record from the socket
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        if matches!(event.kind, FeedEventKind::Record(_)) {
            assert_eq!(event.subscription, socket_id);
            break;
        }
    }

    let bus_id = adapter.switch(Target::Bus);
    assert_ne!(socket_id, bus_id);

    tokio::time::timeout(Duration::from_secs(5), gone_rx)
        .await
        .expect("socket was not torn down")
        .unwrap();

    assert_eq!(bus.subscriber_count(CHANNEL), 1);
    assert_eq!(bus.publish(CHANNEL, Record::undecoded(3, Origin::Server, 2, 0.0)), 1);

    let bus_records: Vec<_> = drain(&mut rx)
        .into_iter()
        .filter(|e| e.subscription == bus_id && matches!(e.kind, FeedEventKind::Record(_)))
        .collect();
    assert_eq!(bus_records.len(), 1);

    assert!(adapter.detach());
    assert!(!adapter.detach());
    assert_eq!(bus.subscriber_count(CHANNEL), 0);
}
