//! Typed inbound events decoded once at the transport boundary.
//!
//! [`BackendEvent::decode`] turns a pushed [`HtspMessage`] into one closed
//! variant per known kind. Every field except the entity id is optional:
//! absent stays `None`, and a field of the wrong type is logged and also
//! decoded as `None`, so the rest of the event still applies.

use tracing::warn;

use super::message::{Field, HtspMessage};
use crate::error::BridgeError;

/// Fields carried by `channelAdd` / `channelUpdate`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelFields {
    /// Backend channel id.
    pub id: u32,
    /// Major channel number; may be zero or negative for hidden channels.
    pub number: Option<i64>,
    /// Minor channel number.
    pub number_minor: Option<u32>,
    /// Display name.
    pub name: Option<String>,
    /// Absolute URL or opaque image-cache token.
    pub icon: Option<String>,
    /// Service type strings of the channel's services (`"SDTV"`, `"Radio"`, …).
    pub service_types: Option<Vec<String>>,
}

/// Fields carried by `dvrEntryAdd` / `dvrEntryUpdate`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DvrEntryFields {
    /// Backend DVR entry id.
    pub id: u32,
    /// Channel id.
    pub channel: Option<u32>,
    /// Start time, Unix epoch seconds.
    pub start: Option<i64>,
    /// Stop time, Unix epoch seconds.
    pub stop: Option<i64>,
    /// Programme title.
    pub title: Option<String>,
    /// Episode title.
    pub subtitle: Option<String>,
    /// Short summary.
    pub summary: Option<String>,
    /// Long description.
    pub description: Option<String>,
    /// Backend state string (`scheduled`, `recording`, `completed`, …).
    pub state: Option<String>,
    /// Backend error text for failed recordings.
    pub error: Option<String>,
    /// Id of the series rule that created this entry.
    pub autorec_id: Option<String>,
    /// Programme-guide event id.
    pub event_id: Option<u32>,
    /// Priority (0–4).
    pub priority: Option<u32>,
    /// Pre-padding in minutes.
    pub start_extra: Option<i64>,
    /// Post-padding in minutes.
    pub stop_extra: Option<i64>,
}

/// Fields carried by `autorecEntryAdd` / `autorecEntryUpdate`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutorecFields {
    /// Backend rule id.
    pub id: String,
    /// Rule name.
    pub name: Option<String>,
    /// Title match expression.
    pub title: Option<String>,
    /// Whether the rule is active.
    pub enabled: Option<bool>,
    /// Day-of-week bitmask, Monday = bit 0.
    pub days_of_week: Option<u32>,
    /// Pre-padding in minutes.
    pub start_extra: Option<i64>,
    /// Post-padding in minutes.
    pub stop_extra: Option<i64>,
    /// Priority (0–4).
    pub priority: Option<u32>,
    /// Channel restriction; `None` means any channel.
    pub channel: Option<u32>,
    /// Start window opening, minutes after midnight.
    pub start: Option<i64>,
    /// Start window closing, minutes after midnight.
    pub start_window: Option<i64>,
}

/// One tuner line of a `tunerInfo` event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TunerFields {
    /// Channel the tuner is serving, if any.
    pub channel: Option<u32>,
    /// Service name on the mux.
    pub service: String,
    /// Adapter name (`"DVB-T #0"`).
    pub adapter: Option<String>,
    /// Backend state string (`idle`, `live`, `recording`).
    pub status: Option<String>,
    /// Programme being received.
    pub program: Option<String>,
}

/// A decoded inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    /// A channel appeared.
    ChannelAdd(ChannelFields),
    /// Some channel fields changed.
    ChannelUpdate(ChannelFields),
    /// A channel was removed.
    ChannelDelete(u32),
    /// A DVR entry appeared.
    DvrEntryAdd(DvrEntryFields),
    /// Some DVR entry fields changed.
    DvrEntryUpdate(DvrEntryFields),
    /// A DVR entry was removed.
    DvrEntryDelete(u32),
    /// A series rule appeared.
    AutorecEntryAdd(AutorecFields),
    /// Some series rule fields changed.
    AutorecEntryUpdate(AutorecFields),
    /// A series rule was removed.
    AutorecEntryDelete(String),
    /// Full tuner status; replaces the previous one.
    TunerInfo(Vec<TunerFields>),
    /// End of the bulk dump.
    InitialSyncCompleted,
    /// A kind this bridge does not track (tags, EPG pushes, statistics).
    Ignored(String),
}

impl BackendEvent {
    /// Decodes a pushed message.
    ///
    /// Returns `None` when the message has no method or lacks the id of the
    /// entity it refers to; both cases are logged.
    #[must_use]
    pub fn decode(msg: &HtspMessage) -> Option<Self> {
        let Some(method) = msg.method() else {
            warn!("inbound message without method");
            return None;
        };

        let event = match method {
            "channelAdd" => Self::ChannelAdd(channel_fields(msg)?),
            "channelUpdate" => Self::ChannelUpdate(channel_fields(msg)?),
            "channelDelete" => Self::ChannelDelete(required_u32(msg, "channelId")?),
            "dvrEntryAdd" => Self::DvrEntryAdd(dvr_entry_fields(msg)?),
            "dvrEntryUpdate" => Self::DvrEntryUpdate(dvr_entry_fields(msg)?),
            "dvrEntryDelete" => Self::DvrEntryDelete(required_u32(msg, "id")?),
            "autorecEntryAdd" => Self::AutorecEntryAdd(autorec_fields(msg)?),
            "autorecEntryUpdate" => Self::AutorecEntryUpdate(autorec_fields(msg)?),
            "autorecEntryDelete" => Self::AutorecEntryDelete(required_str(msg, "id")?),
            "tunerInfo" => Self::TunerInfo(tuner_fields(msg)),
            "initialSyncCompleted" => Self::InitialSyncCompleted,
            other => Self::Ignored(other.to_string()),
        };
        Some(event)
    }

    /// Wire name of the event kind.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::ChannelAdd(_) => "channelAdd",
            Self::ChannelUpdate(_) => "channelUpdate",
            Self::ChannelDelete(_) => "channelDelete",
            Self::DvrEntryAdd(_) => "dvrEntryAdd",
            Self::DvrEntryUpdate(_) => "dvrEntryUpdate",
            Self::DvrEntryDelete(_) => "dvrEntryDelete",
            Self::AutorecEntryAdd(_) => "autorecEntryAdd",
            Self::AutorecEntryUpdate(_) => "autorecEntryUpdate",
            Self::AutorecEntryDelete(_) => "autorecEntryDelete",
            Self::TunerInfo(_) => "tunerInfo",
            Self::InitialSyncCompleted => "initialSyncCompleted",
            Self::Ignored(kind) => kind,
        }
    }
}

/// Logs a malformed field and degrades it to absent.
fn lenient<T>(msg: &HtspMessage, result: Result<Option<T>, BridgeError>) -> Option<T> {
    match result {
        Ok(value) => value,
        Err(err) => {
            warn!(method = msg.method().unwrap_or("-"), %err, "ignoring malformed field");
            None
        }
    }
}

fn opt_string(msg: &HtspMessage, name: &str) -> Option<String> {
    lenient(msg, msg.str(name)).map(str::to_string)
}

fn required_u32(msg: &HtspMessage, name: &str) -> Option<u32> {
    let id = lenient(msg, msg.u32(name));
    if id.is_none() {
        warn!(method = msg.method().unwrap_or("-"), field = name, "event without id dropped");
    }
    id
}

fn required_str(msg: &HtspMessage, name: &str) -> Option<String> {
    let id = opt_string(msg, name);
    if id.is_none() {
        warn!(method = msg.method().unwrap_or("-"), field = name, "event without id dropped");
    }
    id
}

fn channel_fields(msg: &HtspMessage) -> Option<ChannelFields> {
    let id = required_u32(msg, "channelId")?;
    let service_types = lenient(msg, msg.list("services")).map(|services| {
        services
            .iter()
            .filter_map(|service| match service {
                Field::Map(service) => lenient(service, service.str("type")).map(str::to_string),
                other => {
                    warn!(
                        channel_id = id,
                        found = other.type_name(),
                        "service entry is not a map"
                    );
                    None
                }
            })
            .collect()
    });

    Some(ChannelFields {
        id,
        number: lenient(msg, msg.s64("channelNumber")),
        number_minor: lenient(msg, msg.u32("channelNumberMinor")),
        name: opt_string(msg, "channelName"),
        icon: opt_string(msg, "channelIcon"),
        service_types,
    })
}

fn dvr_entry_fields(msg: &HtspMessage) -> Option<DvrEntryFields> {
    Some(DvrEntryFields {
        id: required_u32(msg, "id")?,
        channel: lenient(msg, msg.u32("channel")),
        start: lenient(msg, msg.s64("start")),
        stop: lenient(msg, msg.s64("stop")),
        title: opt_string(msg, "title"),
        subtitle: opt_string(msg, "subtitle"),
        summary: opt_string(msg, "summary"),
        description: opt_string(msg, "description"),
        state: opt_string(msg, "state"),
        error: opt_string(msg, "error"),
        autorec_id: opt_string(msg, "autorecId"),
        event_id: lenient(msg, msg.u32("eventId")),
        priority: lenient(msg, msg.u32("priority")),
        start_extra: lenient(msg, msg.s64("startExtra")),
        stop_extra: lenient(msg, msg.s64("stopExtra")),
    })
}

fn autorec_fields(msg: &HtspMessage) -> Option<AutorecFields> {
    Some(AutorecFields {
        id: required_str(msg, "id")?,
        name: opt_string(msg, "name"),
        title: opt_string(msg, "title"),
        enabled: lenient(msg, msg.s64("enabled")).map(|v| v != 0),
        days_of_week: lenient(msg, msg.u32("daysOfWeek")),
        start_extra: lenient(msg, msg.s64("startExtra")),
        stop_extra: lenient(msg, msg.s64("stopExtra")),
        priority: lenient(msg, msg.u32("priority")),
        channel: lenient(msg, msg.u32("channel")),
        start: lenient(msg, msg.s64("start")),
        start_window: lenient(msg, msg.s64("startWindow")),
    })
}

fn tuner_fields(msg: &HtspMessage) -> Vec<TunerFields> {
    let Some(entries) = lenient(msg, msg.list("tuners")) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            let Field::Map(entry) = entry else {
                warn!(found = entry.type_name(), "tuner entry is not a map");
                return None;
            };
            let service = opt_string(entry, "service")?;
            Some(TunerFields {
                channel: lenient(entry, entry.u32("channelId")),
                service,
                adapter: opt_string(entry, "adapter"),
                status: opt_string(entry, "status"),
                program: opt_string(entry, "program"),
            })
        })
        .collect()
}
