//! Protocol boundary: message bag, typed events, commands, transport seam.
//!
//! The HTSP wire codec and socket handling are supplied by the host through
//! [`Connector`] and [`Transport`]. This module only shapes what crosses
//! that seam.

pub mod commands;
pub mod event;
pub mod message;
pub mod transport;

pub use commands::{CommandReply, EpgEventFields, Ticket, TicketTarget};
pub use event::{AutorecFields, BackendEvent, ChannelFields, DvrEntryFields, TunerFields};
pub use message::{Field, HtspMessage};
pub use transport::{
    Connector, DiskSpace, PendingResponse, ResponseHandler, ServerInfo, SignalSender, Transport,
    TransportSignal, response_channel,
};
