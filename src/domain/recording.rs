//! DVR entry entity with its recording and pending-timer projections.
//!
//! One stored [`RecordingEntry`] backs both views: entries whose status is
//! [`RecordingStatus::New`] are pending timers, everything else is a
//! recording.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::protocol::DvrEntryFields;

/// Recording lifecycle as seen by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingStatus {
    /// Scheduled, not started yet.
    New,
    /// Currently recording.
    InProgress,
    /// Finished successfully.
    Completed,
    /// Missed, invalid or failed.
    Error,
}

impl RecordingStatus {
    /// Derives the status from the backend state string.
    ///
    /// An empty state (never reported) counts as scheduled.
    #[must_use]
    pub fn from_state(state: &str) -> Self {
        match state.to_ascii_lowercase().as_str() {
            "" | "scheduled" => Self::New,
            "recording" => Self::InProgress,
            "completed" => Self::Completed,
            _ => Self::Error,
        }
    }
}

/// Converts Unix epoch seconds to UTC, clamping unrepresentable values to
/// the epoch.
#[must_use]
pub fn utc_from_epoch(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

/// Stored DVR entry state, mirroring the wire fields and units.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingEntry {
    /// Backend entry id.
    pub id: u32,
    /// Channel id.
    pub channel: u32,
    /// Start, Unix epoch seconds.
    pub start: i64,
    /// Stop, Unix epoch seconds.
    pub stop: i64,
    /// Title.
    pub title: String,
    /// Episode title.
    pub subtitle: Option<String>,
    /// Short summary.
    pub summary: Option<String>,
    /// Long description.
    pub description: Option<String>,
    /// Backend state string.
    pub state: String,
    /// Backend error text.
    pub error: Option<String>,
    /// Series rule back-reference.
    pub autorec_id: Option<String>,
    /// Guide event back-reference.
    pub event_id: Option<u32>,
    /// Priority (0–4).
    pub priority: u32,
    /// Pre-padding in minutes.
    pub start_extra: i64,
    /// Post-padding in minutes.
    pub stop_extra: i64,
}

impl RecordingEntry {
    /// Builds a new entry from an add event; absent fields keep defaults.
    #[must_use]
    pub fn from_fields(fields: &DvrEntryFields) -> Self {
        let mut entry = Self {
            id: fields.id,
            ..Self::default()
        };
        entry.merge(fields);
        entry
    }

    /// Overwrites the fields present in `fields`.
    ///
    /// Empty strings for the optional text fields and back-references clear
    /// them, which is how the backend reports an unset value.
    pub fn merge(&mut self, fields: &DvrEntryFields) {
        if let Some(channel) = fields.channel {
            self.channel = channel;
        }
        if let Some(start) = fields.start {
            self.start = start;
        }
        if let Some(stop) = fields.stop {
            self.stop = stop;
        }
        if let Some(title) = &fields.title {
            self.title.clone_from(title);
        }
        if let Some(state) = &fields.state {
            self.state.clone_from(state);
        }
        if let Some(priority) = fields.priority {
            self.priority = priority;
        }
        if let Some(start_extra) = fields.start_extra {
            self.start_extra = start_extra;
        }
        if let Some(stop_extra) = fields.stop_extra {
            self.stop_extra = stop_extra;
        }
        if let Some(event_id) = fields.event_id {
            self.event_id = (event_id != 0).then_some(event_id);
        }
        merge_text(&mut self.subtitle, fields.subtitle.as_ref());
        merge_text(&mut self.summary, fields.summary.as_ref());
        merge_text(&mut self.description, fields.description.as_ref());
        merge_text(&mut self.error, fields.error.as_ref());
        merge_text(&mut self.autorec_id, fields.autorec_id.as_ref());
    }

    /// Status derived from the stored state.
    #[must_use]
    pub fn status(&self) -> RecordingStatus {
        RecordingStatus::from_state(&self.state)
    }

    fn overview(&self) -> Option<String> {
        self.description
            .clone()
            .or_else(|| self.summary.clone())
    }

    /// Projects into the recordings view.
    #[must_use]
    pub fn to_recording_info(&self) -> RecordingInfo {
        RecordingInfo {
            id: self.id.to_string(),
            channel_id: self.channel.to_string(),
            start_date: utc_from_epoch(self.start),
            end_date: utc_from_epoch(self.stop),
            name: self.title.clone(),
            episode_title: self.subtitle.clone(),
            overview: self.overview(),
            status: self.status(),
            series_timer_id: self.autorec_id.clone(),
            program_id: self.event_id.map(|id| id.to_string()),
        }
    }

    /// Projects into the pending-timers view; padding is converted to
    /// seconds here.
    #[must_use]
    pub fn to_timer_info(&self) -> TimerInfo {
        TimerInfo {
            id: self.id.to_string(),
            channel_id: self.channel.to_string(),
            start_date: utc_from_epoch(self.start),
            end_date: utc_from_epoch(self.stop),
            name: self.title.clone(),
            overview: self.overview(),
            status: self.status(),
            series_timer_id: self.autorec_id.clone(),
            program_id: self.event_id.map(|id| id.to_string()),
            priority: self.priority,
            pre_padding_seconds: self.start_extra.saturating_mul(60),
            post_padding_seconds: self.stop_extra.saturating_mul(60),
        }
    }
}

fn merge_text(slot: &mut Option<String>, value: Option<&String>) {
    if let Some(value) = value {
        *slot = (!value.is_empty()).then(|| value.clone());
    }
}

/// Host-facing recording projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordingInfo {
    /// Backend entry id.
    pub id: String,
    /// Channel id.
    pub channel_id: String,
    /// Start (UTC).
    pub start_date: DateTime<Utc>,
    /// End (UTC).
    pub end_date: DateTime<Utc>,
    /// Title.
    pub name: String,
    /// Episode title.
    pub episode_title: Option<String>,
    /// Description, falling back to the summary.
    pub overview: Option<String>,
    /// Derived status.
    pub status: RecordingStatus,
    /// Series rule that created the recording.
    pub series_timer_id: Option<String>,
    /// Guide event the recording was made from.
    pub program_id: Option<String>,
}

/// Host-facing pending-timer projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimerInfo {
    /// Backend entry id.
    pub id: String,
    /// Channel id.
    pub channel_id: String,
    /// Start (UTC).
    pub start_date: DateTime<Utc>,
    /// End (UTC).
    pub end_date: DateTime<Utc>,
    /// Title.
    pub name: String,
    /// Description, falling back to the summary.
    pub overview: Option<String>,
    /// Always [`RecordingStatus::New`] in this view.
    pub status: RecordingStatus,
    /// Series rule that created the timer.
    pub series_timer_id: Option<String>,
    /// Guide event the timer records.
    pub program_id: Option<String>,
    /// Priority (0–4).
    pub priority: u32,
    /// Pre-padding in seconds.
    pub pre_padding_seconds: i64,
    /// Post-padding in seconds.
    pub post_padding_seconds: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduled() -> DvrEntryFields {
        DvrEntryFields {
            id: 10,
            channel: Some(1),
            start: Some(0),
            stop: Some(3600),
            title: Some("Show".to_string()),
            state: Some("scheduled".to_string()),
            start_extra: Some(2),
            stop_extra: Some(5),
            ..DvrEntryFields::default()
        }
    }

    #[test]
    fn status_from_backend_state() {
        assert_eq!(RecordingStatus::from_state("scheduled"), RecordingStatus::New);
        assert_eq!(RecordingStatus::from_state(""), RecordingStatus::New);
        assert_eq!(
            RecordingStatus::from_state("recording"),
            RecordingStatus::InProgress
        );
        assert_eq!(
            RecordingStatus::from_state("Completed"),
            RecordingStatus::Completed
        );
        assert_eq!(RecordingStatus::from_state("missed"), RecordingStatus::Error);
        assert_eq!(RecordingStatus::from_state("invalid"), RecordingStatus::Error);
    }

    #[test]
    fn timer_projection_converts_padding_to_seconds() {
        let entry = RecordingEntry::from_fields(&scheduled());
        let timer = entry.to_timer_info();
        assert_eq!(timer.id, "10");
        assert_eq!(timer.pre_padding_seconds, 120);
        assert_eq!(timer.post_padding_seconds, 300);
        assert_eq!(timer.end_date.timestamp(), 3600);
        assert_eq!(entry.start_extra, 2);
    }

    #[test]
    fn merge_keeps_absent_fields_and_clears_empty_text() {
        let mut entry = RecordingEntry::from_fields(&DvrEntryFields {
            summary: Some("Short".to_string()),
            autorec_id: Some("rule-1".to_string()),
            ..scheduled()
        });
        entry.merge(&DvrEntryFields {
            id: 10,
            state: Some("completed".to_string()),
            autorec_id: Some(String::new()),
            ..DvrEntryFields::default()
        });
        assert_eq!(entry.title, "Show");
        assert_eq!(entry.status(), RecordingStatus::Completed);
        assert_eq!(entry.autorec_id, None);
        assert_eq!(entry.summary.as_deref(), Some("Short"));
    }

    #[test]
    fn overview_prefers_description() {
        let entry = RecordingEntry::from_fields(&DvrEntryFields {
            summary: Some("Short".to_string()),
            description: Some("Long".to_string()),
            ..scheduled()
        });
        assert_eq!(entry.to_recording_info().overview.as_deref(), Some("Long"));
    }
}
