//! In-process event bus
//!
//! Named channels carrying `Record`s from in-process producers (e.g. a dump
//! replay) to whichever viewer session is attached. Subscribers are feed
//! senders, so a published record goes straight into the session's feed
//! channel. Unsubscribing is synchronous: once `unsubscribe` returns, no
//! later `publish` reaches that subscription.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::trace;

use crate::model::Record;
use crate::transport::{FeedSender, SubscriptionId};

/// Named-channel fan-out of records.
#[derive(Debug, Default)]
pub struct EventBus {
    channels: RwLock<HashMap<String, Vec<FeedSender>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a feed on a channel.
    pub fn subscribe(&self, channel: &str, feed: FeedSender) {
        self.channels
            .write()
            .entry(channel.to_string())
            .or_default()
            .push(feed);
    }

    /// Remove a subscription from every channel.
    ///
    /// Returns whether it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut channels = self.channels.write();
        let mut removed = false;

        for feeds in channels.values_mut() {
            let before = feeds.len();
            feeds.retain(|feed| feed.id() != id);
            removed |= feeds.len() != before;
        }
        channels.retain(|_, feeds| !feeds.is_empty());

        removed
    }

    /// Deliver a record to every subscriber of `channel`.
    ///
    /// Returns the number of subscribers reached. Subscribers whose feed
    /// consumer has gone away are dropped.
    pub fn publish(&self, channel: &str, record: Record) -> usize {
        let mut stale = false;
        let delivered = {
            let channels = self.channels.read();
            let Some(feeds) = channels.get(channel) else {
                trace!(channel, "no subscribers for bus event");
                return 0;
            };

            let mut delivered = 0;
            for feed in feeds {
                if feed.record(record.clone()) {
                    delivered += 1;
                } else {
                    stale = true;
                }
            }
            delivered
        };

        if stale {
            let mut channels = self.channels.write();
            if let Some(feeds) = channels.get_mut(channel) {
                feeds.retain(|feed| !feed.is_closed());
            }
        }

        delivered
    }

    /// Number of subscriptions on a channel.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels.read().get(channel).map_or(0, Vec::len)
    }
}

#[cfg(test)]
#[path = "bus_test.rs"]
mod tests;
