//! The viewer session: one store, one attached source, one filter.
//!
//! The session is the single consumer of the packet feed. Producers (the
//! websocket task, bus publishers) only push [`FeedEvent`]s into a channel;
//! [`Session::poll`] drains it, appends to the store and re-derives the
//! filtered view once per tick.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use crate::clipboard::{self, CopyAction};
use crate::config::{CaptureConfig, Config};
use crate::error::{Result, ViewerError};
use crate::filter::{CombinePolicy, FilterState};
use crate::io;
use crate::model::{Ordinal, Record};
use crate::store::PacketStore;
use crate::transport::{
    ConnectionState, EventBus, FeedEvent, FeedEventKind, SubscriptionId, Target, TransportAdapter,
};
use crate::view::{FilteredView, ViewSync};

/// The currently attached source as the operator sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub target: Target,
    pub state: ConnectionState,
    /// Decoder-side unix timestamp from the handshake ack
    pub established_at: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Alert,
}

/// One-line message for the status bar.
#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub level: StatusLevel,
    pub message: String,
}

pub struct Session {
    store: PacketStore,
    adapter: TransportAdapter,
    rx: mpsc::UnboundedReceiver<FeedEvent>,
    connection: Option<Connection>,

    filter: FilterState,
    view: FilteredView,
    sync: ViewSync,
    /// Store or filter changed since the last projection
    dirty: bool,

    capture: CaptureConfig,
    dump_dir: PathBuf,
    status: Option<Status>,
}

impl Session {
    pub fn new(bus: Arc<EventBus>, config: &Config) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let adapter = TransportAdapter::new(bus, config.transport.bus_channel.clone(), tx);

        Self {
            store: PacketStore::new(),
            adapter,
            rx,
            connection: None,
            filter: FilterState::new("", "", config.filter.combine),
            view: FilteredView::default(),
            sync: ViewSync::new(),
            dirty: false,
            capture: config.capture.clone(),
            dump_dir: config.export.dump_dir.clone(),
            status: None,
        }
    }

    // ========================================================================
    // Feed
    // ========================================================================

    /// Switch to another packet source.
    ///
    /// The store is kept until the new source reports `Open`.
    pub fn connect(&mut self, target: Target) -> SubscriptionId {
        self.connection = Some(Connection {
            target: target.clone(),
            state: ConnectionState::Connecting,
            established_at: None,
        });
        self.set_status(StatusLevel::Info, format!("connecting to {target}"));
        self.adapter.switch(target)
    }

    /// Detach the current source; the store is left as is.
    pub fn disconnect(&mut self) {
        if self.adapter.detach() {
            if let Some(connection) = &mut self.connection {
                connection.state = ConnectionState::Closed;
            }
        }
    }

    /// Apply one feed event. Returns false when it came from a stale source.
    pub fn handle_feed(&mut self, event: FeedEvent) -> bool {
        if !self.adapter.is_current(event.subscription) {
            trace!(subscription = %event.subscription, "dropping event from detached source");
            return false;
        }

        match event.kind {
            FeedEventKind::State(state) => self.apply_state(state),
            FeedEventKind::Record(record) => {
                // Only the websocket source synthesizes handshakes
                if record.is_handshake() {
                    if let Some(connection) = &mut self.connection {
                        if matches!(connection.target, Target::Socket(_)) {
                            connection.established_at = handshake_timestamp(&record);
                        }
                    }
                }
                self.store.append(record);
            }
        }

        self.dirty = true;
        true
    }

    fn apply_state(&mut self, state: ConnectionState) {
        let Some(connection) = &mut self.connection else {
            return;
        };
        connection.state = state;
        let target = connection.target.to_string();

        match state {
            ConnectionState::Connecting => {}
            ConnectionState::Open => {
                info!(%target, "source open, starting a new capture");
                self.reset_store();
                self.set_status(StatusLevel::Info, format!("connected to {target}"));
            }
            ConnectionState::Closed => {
                warn!(%target, "source closed");
                self.set_status(StatusLevel::Alert, format!("disconnected from {target}"));
            }
        }
    }

    /// Drain pending feed events and re-derive the view if anything changed.
    ///
    /// Returns the number of events applied.
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.rx.try_recv() {
            if self.handle_feed(event) {
                applied += 1;
            }
        }

        if self.dirty {
            self.refilter();
        }
        applied
    }

    /// Wait for the next feed event and apply it.
    ///
    /// Returns `None` once the feed can no longer deliver anything.
    pub async fn next_event(&mut self) -> Option<bool> {
        let event = self.rx.recv().await?;
        Some(self.handle_feed(event))
    }

    // ========================================================================
    // Filtering and selection
    // ========================================================================

    /// Re-project the store through the current filter.
    pub fn refilter(&mut self) {
        self.view = FilteredView::project(&self.store.snapshot(), &self.filter);
        self.sync.refresh(&self.view);
        self.dirty = false;
    }

    pub fn set_name_filter(&mut self, name: &str) {
        let content = self.filter.content().to_string();
        self.update_filter(name, &content, self.filter.combine());
    }

    pub fn set_content_filter(&mut self, content: &str) {
        let name = self.filter.name().to_string();
        self.update_filter(&name, content, self.filter.combine());
    }

    pub fn set_combine(&mut self, combine: CombinePolicy) {
        let name = self.filter.name().to_string();
        let content = self.filter.content().to_string();
        self.update_filter(&name, &content, combine);
    }

    pub fn toggle_combine(&mut self) -> CombinePolicy {
        let combine = self.filter.combine().toggled();
        self.set_combine(combine);
        combine
    }

    fn update_filter(&mut self, name: &str, content: &str, combine: CombinePolicy) {
        self.filter = FilterState::new(name, content, combine);
        if let Some(e) = self.filter.query_error().map(ToString::to_string) {
            debug!(error = %e, "content filter matches nothing");
            self.set_status(StatusLevel::Alert, format!("content filter: {e}"));
        }
        self.dirty = true;
    }

    pub fn select_filtered(&mut self, position: usize) -> Option<Ordinal> {
        self.sync.select_filtered(&self.view, position)
    }

    pub fn select_full(&mut self, ordinal: Ordinal) {
        if ordinal.index() < self.store.len() {
            self.sync.select_full(&self.view, ordinal);
        }
    }

    pub fn set_full_offset(&mut self, offset: usize) {
        self.sync.set_full_offset(offset);
    }

    pub fn selected_record(&self) -> Option<&Arc<Record>> {
        self.sync.selected().and_then(|ordinal| self.store.get(ordinal))
    }

    // ========================================================================
    // Operator actions
    // ========================================================================

    /// Drop every record and start numbering from zero.
    pub fn clear(&mut self) {
        self.reset_store();
        self.set_status(StatusLevel::Info, "cleared");
    }

    fn reset_store(&mut self) {
        self.store.reset();
        self.sync.invalidate();
        self.dirty = true;
    }

    /// Append every record of a dump or capture file.
    ///
    /// A file that fails to load leaves the store untouched.
    pub fn import(&mut self, path: &Path) -> Result<usize> {
        let records = io::load(path, &self.capture).inspect_err(|e| {
            error!(path = %path.display(), error = %e, "import failed");
            self.set_status(StatusLevel::Alert, format!("import failed: {e}"));
        })?;

        let count = records.len();
        for record in records {
            self.store.append(record);
        }
        self.dirty = true;

        if self.awaiting_open() {
            warn!(path = %path.display(), count, "imported while connecting; open will clear the store");
            self.set_status(
                StatusLevel::Alert,
                format!("imported {count} packets, cleared once the source opens"),
            );
        } else {
            self.set_status(StatusLevel::Info, format!("imported {count} packets"));
        }
        Ok(count)
    }

    /// Whether the attached source has yet to report `Open`.
    pub fn awaiting_open(&self) -> bool {
        self.connection
            .as_ref()
            .is_some_and(|c| c.state == ConnectionState::Connecting)
    }

    /// Write the whole store to a new dump file.
    pub fn export(&mut self) -> Result<PathBuf> {
        let snapshot = self.store.snapshot();
        let path = io::export(snapshot.records(), &self.dump_dir).inspect_err(|e| {
            error!(error = %e, "export failed");
            self.set_status(StatusLevel::Alert, format!("export failed: {e}"));
        })?;

        self.set_status(StatusLevel::Info, format!("saved {}", path.display()));
        Ok(path)
    }

    /// The text `action` copies from the selected record.
    pub fn copy(&mut self, action: CopyAction) -> Result<String> {
        let Some(text) = self
            .selected_record()
            .map(|record| clipboard::copy_text(action, record))
        else {
            self.set_status(StatusLevel::Alert, "nothing selected");
            return Err(ViewerError::NothingSelected);
        };

        self.set_status(StatusLevel::Info, format!("copied {}", action.label()));
        Ok(text)
    }

    pub fn set_status(&mut self, level: StatusLevel, message: impl Into<String>) {
        self.status = Some(Status {
            level,
            message: message.into(),
        });
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn store(&self) -> &PacketStore {
        &self.store
    }

    pub fn view(&self) -> &FilteredView {
        &self.view
    }

    pub fn sync(&self) -> &ViewSync {
        &self.sync
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn connection(&self) -> Option<&Connection> {
        self.connection.as_ref()
    }

    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        self.adapter.bus()
    }

    pub fn bus_channel(&self) -> &str {
        self.adapter.bus_channel()
    }

    pub fn dump_dir(&self) -> &Path {
        &self.dump_dir
    }
}

fn handshake_timestamp(record: &Record) -> Option<u64> {
    serde_json::from_str::<serde_json::Value>(&record.content)
        .ok()?
        .get("timestamp")?
        .as_u64()
}
