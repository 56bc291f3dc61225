//! Dump replay onto the local event bus
//!
//! Plays a recorded dump back through an [`EventBus`] channel so a viewer
//! attached to the bus sees it as a live feed.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::model::Record;
use crate::transport::EventBus;

/// How fast records are published.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pace {
    /// Honour the gaps between recorded arrival times
    Recorded,
    /// Publish everything back to back
    Immediate,
}

/// Publish `records` on `channel`; returns how many reached a subscriber.
pub async fn run(bus: Arc<EventBus>, channel: String, records: Vec<Record>, pace: Pace) -> usize {
    info!(%channel, count = records.len(), ?pace, "starting dump replay");

    let mut previous_time = records.first().map_or(0.0, |r| r.arrival_time);
    let mut delivered = 0;

    for mut record in records {
        if pace == Pace::Recorded {
            let gap = record.arrival_time - previous_time;
            if gap > 0.0 {
                match Duration::try_from_secs_f64(gap) {
                    Ok(wait) => tokio::time::sleep(wait).await,
                    Err(_) => warn!(gap, type_id = record.type_id, "gap out of range, not waiting"),
                }
            }
            previous_time = record.arrival_time;
        }

        // Ordinals belong to the receiving store
        record.ordinal = None;
        if bus.publish(&channel, record) > 0 {
            delivered += 1;
        }
    }

    debug!(%channel, delivered, "dump replay finished");
    delivered
}
