//! Outgoing command builders and reply decoding.

use tracing::warn;

use super::message::{Field, HtspMessage};
use crate::error::BridgeError;

/// Parameters of an `addDvrEntry` command.
///
/// Either `event_id` (record a guide event) or the channel/start/stop
/// triple (manual timer) identifies what to record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddDvrEntry {
    /// Guide event to record.
    pub event_id: Option<u32>,
    /// Channel for manual timers.
    pub channel_id: Option<u32>,
    /// Start, Unix epoch seconds.
    pub start: Option<i64>,
    /// Stop, Unix epoch seconds.
    pub stop: Option<i64>,
    /// Title for manual timers.
    pub title: Option<String>,
    /// Description for manual timers.
    pub description: Option<String>,
    /// Priority (0–4).
    pub priority: u32,
    /// Pre-padding in minutes.
    pub start_extra: i64,
    /// Post-padding in minutes.
    pub stop_extra: i64,
    /// Recording profile name.
    pub config_name: Option<String>,
}

/// Parameters of an `updateDvrEntry` command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateDvrEntry {
    /// Entry to update.
    pub id: u32,
    /// New start, Unix epoch seconds.
    pub start: Option<i64>,
    /// New stop, Unix epoch seconds.
    pub stop: Option<i64>,
    /// New title.
    pub title: Option<String>,
    /// New priority.
    pub priority: Option<u32>,
    /// New pre-padding in minutes.
    pub start_extra: Option<i64>,
    /// New post-padding in minutes.
    pub stop_extra: Option<i64>,
}

/// Parameters of an `addAutorecEntry` command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddAutorecEntry {
    /// Title match expression.
    pub title: String,
    /// Rule name.
    pub name: Option<String>,
    /// Channel restriction; `None` records on any channel.
    pub channel_id: Option<u32>,
    /// Day-of-week bitmask, Monday = bit 0.
    pub days_of_week: u32,
    /// Start window opening, minutes after midnight.
    pub start: Option<i64>,
    /// Pre-padding in minutes.
    pub start_extra: i64,
    /// Post-padding in minutes.
    pub stop_extra: i64,
    /// Priority (0–4).
    pub priority: u32,
    /// Recording profile name.
    pub config_name: Option<String>,
}

/// What a ticket is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketTarget {
    /// Live channel stream.
    Channel(u32),
    /// Recorded file.
    Recording(u32),
}

/// Builds an `addDvrEntry` message.
#[must_use]
pub fn add_dvr_entry(req: &AddDvrEntry) -> HtspMessage {
    let mut msg = HtspMessage::new("addDvrEntry")
        .with("priority", req.priority)
        .with("startExtra", req.start_extra)
        .with("stopExtra", req.stop_extra);
    if let Some(event_id) = req.event_id {
        msg.put("eventId", event_id);
    }
    if let Some(channel_id) = req.channel_id {
        msg.put("channelId", channel_id);
    }
    if let Some(start) = req.start {
        msg.put("start", start);
    }
    if let Some(stop) = req.stop {
        msg.put("stop", stop);
    }
    if let Some(title) = &req.title {
        msg.put("title", title.as_str());
    }
    if let Some(description) = &req.description {
        msg.put("description", description.as_str());
    }
    put_profile(&mut msg, req.config_name.as_deref());
    msg
}

/// Builds an `updateDvrEntry` message carrying only the changed fields.
#[must_use]
pub fn update_dvr_entry(req: &UpdateDvrEntry) -> HtspMessage {
    let mut msg = HtspMessage::new("updateDvrEntry").with("id", req.id);
    if let Some(start) = req.start {
        msg.put("start", start);
    }
    if let Some(stop) = req.stop {
        msg.put("stop", stop);
    }
    if let Some(title) = &req.title {
        msg.put("title", title.as_str());
    }
    if let Some(priority) = req.priority {
        msg.put("priority", priority);
    }
    if let Some(start_extra) = req.start_extra {
        msg.put("startExtra", start_extra);
    }
    if let Some(stop_extra) = req.stop_extra {
        msg.put("stopExtra", stop_extra);
    }
    msg
}

/// Builds a `cancelDvrEntry` message (stops a running recording).
#[must_use]
pub fn cancel_dvr_entry(id: u32) -> HtspMessage {
    HtspMessage::new("cancelDvrEntry").with("id", id)
}

/// Builds a `deleteDvrEntry` message (removes a timer or recording).
#[must_use]
pub fn delete_dvr_entry(id: u32) -> HtspMessage {
    HtspMessage::new("deleteDvrEntry").with("id", id)
}

/// Builds an `addAutorecEntry` message.
#[must_use]
pub fn add_autorec_entry(req: &AddAutorecEntry) -> HtspMessage {
    let mut msg = HtspMessage::new("addAutorecEntry")
        .with("title", req.title.as_str())
        .with("daysOfWeek", req.days_of_week)
        .with("startExtra", req.start_extra)
        .with("stopExtra", req.stop_extra)
        .with("priority", req.priority)
        .with("enabled", true);
    if let Some(name) = &req.name {
        msg.put("name", name.as_str());
    }
    if let Some(channel_id) = req.channel_id {
        msg.put("channelId", channel_id);
    }
    if let Some(start) = req.start {
        msg.put("start", start);
    }
    put_profile(&mut msg, req.config_name.as_deref());
    msg
}

/// Builds a `deleteAutorecEntry` message.
#[must_use]
pub fn delete_autorec_entry(id: &str) -> HtspMessage {
    HtspMessage::new("deleteAutorecEntry").with("id", id)
}

/// Builds a `getEvents` message for one channel up to `max_time`
/// (Unix epoch seconds).
#[must_use]
pub fn get_events(channel_id: u32, max_time: i64) -> HtspMessage {
    HtspMessage::new("getEvents")
        .with("channelId", channel_id)
        .with("maxTime", max_time)
}

/// Builds a `getTicket` message.
#[must_use]
pub fn get_ticket(target: TicketTarget) -> HtspMessage {
    match target {
        TicketTarget::Channel(id) => HtspMessage::new("getTicket").with("channelId", id),
        TicketTarget::Recording(id) => HtspMessage::new("getTicket").with("dvrId", id),
    }
}

fn put_profile(msg: &mut HtspMessage, profile: Option<&str>) {
    if let Some(profile) = profile.filter(|p| !p.is_empty()) {
        msg.put("configName", profile);
    }
}

/// Decoded generic command reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    /// Whether the backend reports success.
    pub success: bool,
    /// Id of a created entity, normalised to a string.
    pub id: Option<String>,
}

impl CommandReply {
    /// Decodes a command reply.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::CommandRejected`] if the reply carries an
    /// `error` field or reports `success = 0`.
    pub fn parse(method: &str, reply: &HtspMessage) -> Result<Self, BridgeError> {
        if let Some(reason) = reply.str("error")? {
            return Err(BridgeError::CommandRejected {
                method: method.to_string(),
                reason: reason.to_string(),
            });
        }
        let success = reply.s64("success")?.is_none_or(|v| v != 0);
        if !success {
            return Err(BridgeError::CommandRejected {
                method: method.to_string(),
                reason: "backend reported failure".to_string(),
            });
        }
        let id = match reply.field("id") {
            Some(Field::S64(id)) => Some(id.to_string()),
            Some(Field::Str(id)) => Some(id.clone()),
            _ => None,
        };
        Ok(Self { success, id })
    }
}

/// Decoded `getTicket` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    /// HTTP path of the stream, relative to the web root.
    pub path: String,
    /// Single-use access ticket.
    pub ticket: String,
}

impl Ticket {
    /// Decodes a `getTicket` reply.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::MalformedField`] if `path` or `ticket` is
    /// missing, or [`BridgeError::CommandRejected`] for an error reply.
    pub fn parse(reply: &HtspMessage) -> Result<Self, BridgeError> {
        CommandReply::parse("getTicket", reply)?;
        let path = reply.str("path")?.ok_or(BridgeError::MalformedField {
            field: "path".to_string(),
            expected: "str",
        })?;
        let ticket = reply.str("ticket")?.ok_or(BridgeError::MalformedField {
            field: "ticket".to_string(),
            expected: "str",
        })?;
        Ok(Self {
            path: path.to_string(),
            ticket: ticket.to_string(),
        })
    }
}

/// One guide event from a `getEvents` reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpgEventFields {
    /// Guide event id.
    pub event_id: u32,
    /// Channel id.
    pub channel: u32,
    /// Start, Unix epoch seconds.
    pub start: i64,
    /// Stop, Unix epoch seconds.
    pub stop: i64,
    /// Title.
    pub title: Option<String>,
    /// Episode title.
    pub subtitle: Option<String>,
    /// Short summary.
    pub summary: Option<String>,
    /// Long description.
    pub description: Option<String>,
    /// Image URL.
    pub image: Option<String>,
    /// DVB content type nibble pair.
    pub content_type: Option<u32>,
    /// Season number.
    pub season_number: Option<u32>,
    /// Episode number.
    pub episode_number: Option<u32>,
}

/// Decodes the `events` list of a `getEvents` reply.
///
/// Events missing id, channel, start or stop are skipped with a warning;
/// malformed optional fields degrade to `None`.
///
/// # Errors
///
/// Returns [`BridgeError::CommandRejected`] for an error reply.
pub fn parse_events(reply: &HtspMessage) -> Result<Vec<EpgEventFields>, BridgeError> {
    CommandReply::parse("getEvents", reply)?;
    let events = match reply.list("events") {
        Ok(Some(events)) => events,
        Ok(None) => return Ok(Vec::new()),
        Err(err) => {
            warn!(%err, "getEvents reply without usable events list");
            return Ok(Vec::new());
        }
    };

    Ok(events
        .iter()
        .filter_map(|event| {
            let Field::Map(event) = event else {
                return None;
            };
            let required = (
                event.u32("eventId").ok().flatten(),
                event.u32("channelId").ok().flatten(),
                event.s64("start").ok().flatten(),
                event.s64("stop").ok().flatten(),
            );
            let (Some(event_id), Some(channel), Some(start), Some(stop)) = required else {
                warn!("skipping guide event without id, channel or times");
                return None;
            };
            let text = |name: &str| event.str(name).ok().flatten().map(str::to_string);
            Some(EpgEventFields {
                event_id,
                channel,
                start,
                stop,
                title: text("title"),
                subtitle: text("subtitle"),
                summary: text("summary"),
                description: text("description"),
                image: text("image"),
                content_type: event.u32("contentType").ok().flatten(),
                season_number: event.u32("seasonNumber").ok().flatten(),
                episode_number: event.u32("episodeNumber").ok().flatten(),
            })
        })
        .collect())
}
