//! Tuner status entity and projection.

use serde::Serialize;

use crate::protocol::TunerFields;

/// What a tuner is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TunerStatus {
    /// Idle.
    Available,
    /// Serving a live stream.
    LiveTv,
    /// Feeding a recording.
    RecordingTv,
}

impl TunerStatus {
    /// Derives the status from the backend state string; unknown is idle.
    #[must_use]
    pub fn from_state(state: Option<&str>) -> Self {
        match state.map(str::to_ascii_lowercase).as_deref() {
            Some("live") | Some("streaming") => Self::LiveTv,
            Some("recording") => Self::RecordingTv,
            _ => Self::Available,
        }
    }
}

/// Table key: a tuner line is identified by channel and service.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TunerKey {
    /// Channel id, zero when the tuner serves no channel.
    pub channel: u32,
    /// Service name.
    pub service: String,
}

/// Stored tuner line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunerEntry {
    /// Channel id, if any.
    pub channel: Option<u32>,
    /// Service name.
    pub service: String,
    /// Adapter name.
    pub adapter: Option<String>,
    /// Backend state string.
    pub status: Option<String>,
    /// Programme being received.
    pub program: Option<String>,
}

impl TunerEntry {
    /// Key of this line.
    #[must_use]
    pub fn key(&self) -> TunerKey {
        TunerKey {
            channel: self.channel.unwrap_or(0),
            service: self.service.clone(),
        }
    }

    /// Projects into the host shape.
    #[must_use]
    pub fn to_tuner_info(&self) -> TunerInfo {
        let key = self.key();
        TunerInfo {
            id: format!("{}:{}", key.channel, key.service),
            name: self
                .adapter
                .clone()
                .unwrap_or_else(|| self.service.clone()),
            channel_id: self.channel.map(|id| id.to_string()),
            service: self.service.clone(),
            status: TunerStatus::from_state(self.status.as_deref()),
            program_name: self.program.clone(),
        }
    }
}

impl From<TunerFields> for TunerEntry {
    fn from(fields: TunerFields) -> Self {
        Self {
            channel: fields.channel,
            service: fields.service,
            adapter: fields.adapter,
            status: fields.status,
            program: fields.program,
        }
    }
}

/// Host-facing tuner projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TunerInfo {
    /// `channel:service`.
    pub id: String,
    /// Adapter name, falling back to the service.
    pub name: String,
    /// Channel being served.
    pub channel_id: Option<String>,
    /// Service name.
    pub service: String,
    /// Derived status.
    pub status: TunerStatus,
    /// Programme being received.
    pub program_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_from_state() {
        assert_eq!(TunerStatus::from_state(Some("Live")), TunerStatus::LiveTv);
        assert_eq!(
            TunerStatus::from_state(Some("recording")),
            TunerStatus::RecordingTv
        );
        assert_eq!(TunerStatus::from_state(None), TunerStatus::Available);
    }

    #[test]
    fn projection_uses_channel_and_service_as_id() {
        let entry = TunerEntry::from(TunerFields {
            channel: Some(3),
            service: "Demo HD".to_string(),
            adapter: Some("DVB-T #0".to_string()),
            status: Some("recording".to_string()),
            program: None,
        });
        let info = entry.to_tuner_info();
        assert_eq!(info.id, "3:Demo HD");
        assert_eq!(info.name, "DVB-T #0");
        assert_eq!(info.status, TunerStatus::RecordingTv);
    }
}
