//! Program-guide entries fetched on demand with `getEvents`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::recording::utc_from_epoch;
use crate::protocol::EpgEventFields;

/// DVB content genre, from the high nibble of the content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Genre {
    /// Movie / drama.
    Movie,
    /// News / current affairs.
    News,
    /// Show / game show.
    Show,
    /// Sports.
    Sports,
    /// Children's / youth programmes.
    Children,
    /// Music / ballet / dance.
    Music,
    /// Arts / culture.
    Arts,
    /// Social / political issues / economics.
    Social,
    /// Education / science / factual.
    Education,
    /// Leisure hobbies.
    Leisure,
}

impl Genre {
    /// Maps a DVB content type (major nibble in bits 4–7).
    #[must_use]
    pub fn from_content_type(content_type: u32) -> Option<Self> {
        match (content_type >> 4) & 0x0f {
            0x1 => Some(Self::Movie),
            0x2 => Some(Self::News),
            0x3 => Some(Self::Show),
            0x4 => Some(Self::Sports),
            0x5 => Some(Self::Children),
            0x6 => Some(Self::Music),
            0x7 => Some(Self::Arts),
            0x8 => Some(Self::Social),
            0x9 => Some(Self::Education),
            0xa => Some(Self::Leisure),
            _ => None,
        }
    }
}

/// Host-facing guide entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgramInfo {
    /// Guide event id.
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
    /// Image URL.
    pub image_url: Option<String>,
    /// Genre, when the backend classified the event.
    pub genre: Option<Genre>,
    /// Season number.
    pub season_number: Option<u32>,
    /// Episode number.
    pub episode_number: Option<u32>,
}

impl ProgramInfo {
    /// Returns `true` if the entry overlaps `[start, end)`.
    #[must_use]
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_date < end && self.end_date > start
    }
}

impl From<EpgEventFields> for ProgramInfo {
    fn from(event: EpgEventFields) -> Self {
        Self {
            id: event.event_id.to_string(),
            channel_id: event.channel.to_string(),
            start_date: utc_from_epoch(event.start),
            end_date: utc_from_epoch(event.stop),
            name: event.title.unwrap_or_default(),
            episode_title: event.subtitle,
            overview: event.description.or(event.summary),
            image_url: event.image,
            genre: event.content_type.and_then(Genre::from_content_type),
            season_number: event.season_number.filter(|n| *n > 0),
            episode_number: event.episode_number.filter(|n| *n > 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genre_uses_major_nibble() {
        assert_eq!(Genre::from_content_type(0x10), Some(Genre::Movie));
        assert_eq!(Genre::from_content_type(0x43), Some(Genre::Sports));
        assert_eq!(Genre::from_content_type(0x00), None);
    }

    #[test]
    fn overlap_window_is_half_open() {
        let program = ProgramInfo::from(EpgEventFields {
            event_id: 1,
            channel: 2,
            start: 100,
            stop: 200,
            title: Some("Quiz".to_string()),
            ..EpgEventFields::default()
        });
        assert!(program.overlaps(utc_from_epoch(150), utc_from_epoch(300)));
        assert!(!program.overlaps(utc_from_epoch(200), utc_from_epoch(300)));
        assert!(!program.overlaps(utc_from_epoch(0), utc_from_epoch(100)));
    }
}
