//! Session lifecycle events.
//!
//! Every session transition emits a [`SessionEvent`] through the
//! [`super::EventBus`]. The facade listens for
//! [`SessionEvent::DataSourceChanged`] to refresh whatever it cached from
//! the previous session.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::protocol::ServerInfo;

/// Event emitted on every session transition.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A transport was opened and authenticated.
    Connected {
        /// Id of the new session.
        session_id: Uuid,
        /// Server identification.
        server: ServerInfo,
        /// Connection timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The bulk dump finished; tables are complete.
    InitialSyncCompleted {
        /// Session that finished syncing.
        session_id: Uuid,
        /// Completion timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The transport failed and was discarded.
    ConnectionLost {
        /// Session that failed.
        session_id: Uuid,
        /// Failure description.
        reason: String,
        /// Failure timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Cached data from a previous session is stale.
    DataSourceChanged {
        /// Notification timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl SessionEvent {
    /// Returns the session id, if the event belongs to one.
    #[must_use]
    pub fn session_id(&self) -> Option<Uuid> {
        match self {
            Self::Connected { session_id, .. }
            | Self::InitialSyncCompleted { session_id, .. }
            | Self::ConnectionLost { session_id, .. } => Some(*session_id),
            Self::DataSourceChanged { .. } => None,
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::InitialSyncCompleted { .. } => "initial_sync_completed",
            Self::ConnectionLost { .. } => "connection_lost",
            Self::DataSourceChanged { .. } => "data_source_changed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_lost_serializes_with_tag() {
        let event = SessionEvent::ConnectionLost {
            session_id: Uuid::new_v4(),
            reason: "socket closed".to_string(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap_or_default();
        assert!(json.contains("\"event_type\":\"connection_lost\""));
        assert!(json.contains("socket closed"));
    }

    #[test]
    fn data_source_changed_has_no_session() {
        let event = SessionEvent::DataSourceChanged {
            timestamp: Utc::now(),
        };
        assert_eq!(event.session_id(), None);
        assert_eq!(event.event_type_str(), "data_source_changed");
    }
}
