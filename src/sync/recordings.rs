//! DVR entry synchronizer.
//!
//! One table serves two views: scheduled entries are pending timers, all
//! other entries are recordings. An entry moves between the views when an
//! update changes its state.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::table::SnapshotTable;
use crate::domain::{RecordingEntry, RecordingInfo, RecordingStatus, TimerInfo};
use crate::protocol::DvrEntryFields;

/// Keeps the DVR entry table.
#[derive(Debug)]
pub struct RecordingSync {
    entries: SnapshotTable<u32, RecordingEntry>,
}

impl Default for RecordingSync {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSync {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: SnapshotTable::new("recordings"),
        }
    }

    /// Applies a `dvrEntryAdd`.
    pub async fn add(&self, fields: &DvrEntryFields) {
        let _ = self
            .entries
            .insert_new(fields.id, || RecordingEntry::from_fields(fields))
            .await;
    }

    /// Applies a `dvrEntryUpdate`.
    pub async fn update(&self, fields: &DvrEntryFields) {
        let _ = self
            .entries
            .update(&fields.id, |entry| entry.merge(fields))
            .await;
    }

    /// Applies a `dvrEntryDelete`.
    pub async fn delete(&self, id: u32) {
        let _ = self.entries.remove(&id).await;
    }

    /// Drops every entry.
    pub async fn clean(&self) {
        let dropped = self.entries.clear().await;
        debug!(dropped, "recording table cleaned");
    }

    /// Builds the recordings view: in progress, completed and failed.
    pub async fn build_recordings(&self, cancel: &CancellationToken) -> Vec<RecordingInfo> {
        self.entries
            .project(cancel, |entry| {
                (entry.status() != RecordingStatus::New).then(|| entry.to_recording_info())
            })
            .await
    }

    /// Builds the pending-timers view: scheduled entries only.
    pub async fn build_timers(&self, cancel: &CancellationToken) -> Vec<TimerInfo> {
        self.entries
            .project(cancel, |entry| {
                (entry.status() == RecordingStatus::New).then(|| entry.to_timer_info())
            })
            .await
    }

    /// Returns the stored entry for `id`.
    pub async fn get(&self, id: u32) -> Option<RecordingEntry> {
        self.entries.get(&id).await
    }

    /// Number of stored entries across both views.
    pub async fn len(&self) -> usize {
        self.entries.len().await
    }

    /// Returns `true` if no entry is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.is_empty().await
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn scheduled_show() -> DvrEntryFields {
        DvrEntryFields {
            id: 10,
            channel: Some(1),
            start: Some(0),
            stop: Some(3600),
            title: Some("Show".to_string()),
            state: Some("scheduled".to_string()),
            ..DvrEntryFields::default()
        }
    }

    #[tokio::test]
    async fn scheduled_entry_is_a_pending_timer_only() {
        let sync = RecordingSync::new();
        sync.add(&scheduled_show()).await;
        let token = CancellationToken::new();

        let timers = sync.build_timers(&token).await;
        assert_eq!(timers.len(), 1);
        let Some(timer) = timers.first() else {
            panic!("timer missing");
        };
        assert_eq!(timer.id, "10");
        assert_eq!(timer.status, RecordingStatus::New);
        assert!(sync.build_recordings(&token).await.is_empty());
    }

    #[tokio::test]
    async fn completed_update_moves_entry_to_recordings() {
        let sync = RecordingSync::new();
        sync.add(&scheduled_show()).await;
        sync.update(&DvrEntryFields {
            id: 10,
            state: Some("completed".to_string()),
            ..DvrEntryFields::default()
        })
        .await;
        let token = CancellationToken::new();

        let recordings = sync.build_recordings(&token).await;
        let Some(recording) = recordings.first() else {
            panic!("recording missing");
        };
        assert_eq!(recording.status, RecordingStatus::Completed);
        assert_eq!(recording.name, "Show");
        assert!(sync.build_timers(&token).await.is_empty());
    }

    #[tokio::test]
    async fn add_update_delete_sequence() {
        let sync = RecordingSync::new();
        sync.add(&scheduled_show()).await;
        sync.update(&DvrEntryFields {
            id: 10,
            title: Some("Show (repeat)".to_string()),
            state: Some("recording".to_string()),
            ..DvrEntryFields::default()
        })
        .await;
        sync.update(&DvrEntryFields {
            id: 10,
            title: Some("Show (final)".to_string()),
            ..DvrEntryFields::default()
        })
        .await;

        let token = CancellationToken::new();
        let recordings = sync.build_recordings(&token).await;
        assert_eq!(
            recordings.first().map(|r| (r.name.as_str(), r.status)),
            Some(("Show (final)", RecordingStatus::InProgress))
        );

        sync.delete(10).await;
        assert!(sync.build_recordings(&token).await.is_empty());
        assert!(sync.build_timers(&token).await.is_empty());
    }

    #[tokio::test]
    async fn unknown_ids_are_noops() {
        let sync = RecordingSync::new();
        sync.update(&DvrEntryFields {
            id: 99,
            state: Some("completed".to_string()),
            ..DvrEntryFields::default()
        })
        .await;
        sync.delete(99).await;
        assert!(sync.is_empty().await);

        sync.add(&scheduled_show()).await;
        sync.delete(10).await;
        sync.delete(10).await;
        sync.update(&scheduled_show()).await;
        assert!(sync.is_empty().await);
    }
}
