//! Series rule (autorec) entity and projection.

use chrono::Weekday;
use serde::Serialize;

use super::days;
use crate::protocol::AutorecFields;

/// Stored series rule, mirroring the wire fields and units.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeriesRuleEntry {
    /// Backend rule id.
    pub id: String,
    /// Rule name.
    pub name: String,
    /// Title match expression.
    pub title: String,
    /// Whether the rule is active; `None` until the backend reports it.
    pub enabled: Option<bool>,
    /// Day-of-week bitmask, Monday = bit 0.
    pub days_of_week: u32,
    /// Pre-padding in minutes.
    pub start_extra: i64,
    /// Post-padding in minutes.
    pub stop_extra: i64,
    /// Priority (0–4).
    pub priority: u32,
    /// Channel restriction; `None` means any channel.
    pub channel: Option<u32>,
    /// Start window opening, minutes after midnight; negative means any.
    pub start: Option<i64>,
    /// Start window closing, minutes after midnight.
    pub start_window: Option<i64>,
}

impl SeriesRuleEntry {
    /// Builds a new rule from an add event; absent fields keep defaults.
    #[must_use]
    pub fn from_fields(fields: &AutorecFields) -> Self {
        let mut entry = Self {
            id: fields.id.clone(),
            ..Self::default()
        };
        entry.merge(fields);
        entry
    }

    /// Overwrites the fields present in `fields`. A channel id of zero
    /// lifts the channel restriction.
    pub fn merge(&mut self, fields: &AutorecFields) {
        if let Some(name) = &fields.name {
            self.name.clone_from(name);
        }
        if let Some(title) = &fields.title {
            self.title.clone_from(title);
        }
        if let Some(enabled) = fields.enabled {
            self.enabled = Some(enabled);
        }
        if let Some(days_of_week) = fields.days_of_week {
            self.days_of_week = days_of_week;
        }
        if let Some(start_extra) = fields.start_extra {
            self.start_extra = start_extra;
        }
        if let Some(stop_extra) = fields.stop_extra {
            self.stop_extra = stop_extra;
        }
        if let Some(priority) = fields.priority {
            self.priority = priority;
        }
        if let Some(channel) = fields.channel {
            self.channel = (channel != 0).then_some(channel);
        }
        if let Some(start) = fields.start {
            self.start = Some(start);
        }
        if let Some(start_window) = fields.start_window {
            self.start_window = Some(start_window);
        }
    }

    /// Projects into the host shape, converting days and padding.
    #[must_use]
    pub fn to_series_timer_info(&self) -> SeriesTimerInfo {
        let name = if self.name.is_empty() {
            self.title.clone()
        } else {
            self.name.clone()
        };
        SeriesTimerInfo {
            id: self.id.clone(),
            name,
            title: self.title.clone(),
            channel_id: self.channel.map(|id| id.to_string()),
            record_any_channel: self.channel.is_none(),
            days: days::decode(self.days_of_week),
            start_minutes: self.start.filter(|m| *m >= 0),
            pre_padding_seconds: self.start_extra.saturating_mul(60),
            post_padding_seconds: self.stop_extra.saturating_mul(60),
            priority: self.priority,
            enabled: self.enabled.unwrap_or(true),
        }
    }
}

/// Host-facing series rule projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesTimerInfo {
    /// Backend rule id.
    pub id: String,
    /// Rule name, falling back to the title.
    pub name: String,
    /// Title match expression.
    pub title: String,
    /// Channel restriction.
    pub channel_id: Option<String>,
    /// `true` when not restricted to one channel.
    pub record_any_channel: bool,
    /// Days the rule may fire on, Monday first.
    pub days: Vec<Weekday>,
    /// Start window opening in minutes after midnight, if restricted.
    pub start_minutes: Option<i64>,
    /// Pre-padding in seconds.
    pub pre_padding_seconds: i64,
    /// Post-padding in seconds.
    pub post_padding_seconds: i64,
    /// Priority (0–4).
    pub priority: u32,
    /// Whether the rule is active.
    pub enabled: bool,
}
