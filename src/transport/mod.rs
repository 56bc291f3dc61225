//! Live packet sources
//!
//! Two sources are supported and only one is attached at a time:
//!
//! - a decoder websocket (`Target::Socket`), see [`socket`]
//! - the in-process [`EventBus`] (`Target::Bus`)
//!
//! Both push [`FeedEvent`]s into the same unbounded channel that the session
//! drains. Each event is tagged with the subscription that produced it, so
//! after a switch the session can drop anything a torn-down source still
//! managed to send.

pub mod bus;
pub mod protocol;
pub mod socket;

use std::fmt::{self, Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::model::Record;

pub use bus::EventBus;
pub use protocol::{Frame, FrameError};

/// Counter for generating unique subscription IDs
static SUBSCRIPTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identifies one attachment of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn next() -> Self {
        Self(SUBSCRIPTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Display for SubscriptionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Where packets come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Decoder websocket at `host:port`
    Socket(String),
    /// Local event bus
    Bus,
}

impl Target {
    /// A blank or missing address selects the bus.
    pub fn from_address(address: Option<&str>) -> Self {
        match address.map(str::trim) {
            Some(address) if !address.is_empty() => Target::Socket(address.to_string()),
            _ => Target::Bus,
        }
    }

    pub fn address(&self) -> Option<&str> {
        match self {
            Target::Socket(address) => Some(address),
            Target::Bus => None,
        }
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Target::Socket(address) => write!(f, "ws://{address}"),
            Target::Bus => write!(f, "local bus"),
        }
    }
}

/// Lifecycle of an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

impl Display for ConnectionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Open => write!(f, "open"),
            ConnectionState::Closed => write!(f, "closed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedEventKind {
    State(ConnectionState),
    Record(Record),
}

/// One item of the packet feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEvent {
    pub subscription: SubscriptionId,
    pub kind: FeedEventKind,
}

/// Sending half of the feed, bound to one subscription.
#[derive(Debug, Clone)]
pub struct FeedSender {
    id: SubscriptionId,
    tx: mpsc::UnboundedSender<FeedEvent>,
}

impl FeedSender {
    pub fn new(id: SubscriptionId, tx: mpsc::UnboundedSender<FeedEvent>) -> Self {
        Self { id, tx }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns false once the feed consumer is gone.
    pub fn record(&self, record: Record) -> bool {
        self.send(FeedEventKind::Record(record))
    }

    pub fn state(&self, state: ConnectionState) -> bool {
        self.send(FeedEventKind::State(state))
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn send(&self, kind: FeedEventKind) -> bool {
        self.tx
            .send(FeedEvent {
                subscription: self.id,
                kind,
            })
            .is_ok()
    }
}

#[derive(Debug)]
enum Attachment {
    Socket(JoinHandle<()>),
    Bus,
}

#[derive(Debug)]
struct Subscription {
    id: SubscriptionId,
    target: Target,
    attachment: Attachment,
}

/// Attaches exactly one source at a time to the feed.
#[derive(Debug)]
pub struct TransportAdapter {
    bus: Arc<EventBus>,
    bus_channel: String,
    tx: mpsc::UnboundedSender<FeedEvent>,
    current: Option<Subscription>,
}

impl TransportAdapter {
    pub fn new(
        bus: Arc<EventBus>,
        bus_channel: impl Into<String>,
        tx: mpsc::UnboundedSender<FeedEvent>,
    ) -> Self {
        Self {
            bus,
            bus_channel: bus_channel.into(),
            tx,
            current: None,
        }
    }

    /// Tear down the current source and attach `target`.
    ///
    /// Must be called from within a tokio runtime when `target` is a socket.
    pub fn switch(&mut self, target: Target) -> SubscriptionId {
        self.detach();

        let id = SubscriptionId::next();
        let feed = FeedSender::new(id, self.tx.clone());
        feed.state(ConnectionState::Connecting);

        let attachment = match &target {
            Target::Socket(address) => {
                Attachment::Socket(tokio::spawn(socket::run(address.clone(), feed)))
            }
            Target::Bus => {
                // Open resets the store, so it must precede any bus record
                feed.state(ConnectionState::Open);
                self.bus.subscribe(&self.bus_channel, feed.clone());
                Attachment::Bus
            }
        };

        info!(subscription = %id, %target, "attached packet source");
        self.current = Some(Subscription {
            id,
            target,
            attachment,
        });
        id
    }

    /// Tear down the current source, if any.
    ///
    /// Returns whether something was attached.
    pub fn detach(&mut self) -> bool {
        let Some(subscription) = self.current.take() else {
            return false;
        };

        match subscription.attachment {
            Attachment::Socket(handle) => handle.abort(),
            Attachment::Bus => {
                self.bus.unsubscribe(subscription.id);
            }
        }

        debug!(subscription = %subscription.id, target = %subscription.target, "detached packet source");
        true
    }

    pub fn current(&self) -> Option<SubscriptionId> {
        self.current.as_ref().map(|s| s.id)
    }

    pub fn target(&self) -> Option<&Target> {
        self.current.as_ref().map(|s| &s.target)
    }

    #[inline]
    pub fn is_current(&self, id: SubscriptionId) -> bool {
        self.current() == Some(id)
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn bus_channel(&self) -> &str {
        &self.bus_channel
    }
}

impl Drop for TransportAdapter {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
#[path = "adapter_test.rs"]
mod tests;
