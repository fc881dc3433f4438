//! # tvh-live-bridge
//!
//! Live-TV bridge between a media-server host and a Tvheadend DVR backend
//! speaking the asynchronous HTSP protocol.
//!
//! One [`session::ConnectionSession`] owns the backend connection. The
//! backend pushes a full dump of channels, DVR entries, series rules and
//! tuner status after login and then streams changes; the session routes
//! them into in-memory tables. Host reads wait for the initial dump and
//! project the tables; host commands are sent as RPCs bounded by a
//! deadline.
//!
//! ## Architecture
//!
//! ```text
//! Host (media server) / diagnostic router (api/)
//!     │
//!     ├── LiveTvService (service/)
//!     │
//!     ├── ConnectionSession + run_with_timeout (session/)
//!     │
//!     ├── Channel / Recording / SeriesRule / Tuner sync (sync/)
//!     ├── Entities, projections, EventBus (domain/)
//!     │
//!     └── Message bag, events, commands, Transport seam (protocol/)
//! ```
//!
//! The HTSP socket and binary codec are not part of this crate: the host
//! supplies them through [`protocol::Connector`] and [`protocol::Transport`].

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod service;
pub mod session;
pub mod sync;
