//! pktvis: a live viewer for decoded packet streams
//!
//! Records arrive from a decoder websocket or the in-process event bus, are
//! kept in an append-only [`store::PacketStore`] and shown through a
//! name/content filter. See [`filter::query`] for the content query syntax.

pub mod clipboard;
pub mod config;
pub mod error;
pub mod filter;
pub mod io;
pub mod model;
pub mod replay;
pub mod session;
pub mod store;
pub mod transport;
pub mod tui;
pub mod view;

pub use config::Config;
pub use error::{Result, ViewerError};
pub use model::{Ordinal, Origin, Record};
pub use session::Session;
