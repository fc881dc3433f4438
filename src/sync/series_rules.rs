//! Series rule synchronizer.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::table::SnapshotTable;
use crate::domain::{SeriesRuleEntry, SeriesTimerInfo};
use crate::protocol::AutorecFields;

/// Keeps the series rule table.
#[derive(Debug)]
pub struct SeriesRuleSync {
    rules: SnapshotTable<String, SeriesRuleEntry>,
}

impl Default for SeriesRuleSync {
    fn default() -> Self {
        Self::new()
    }
}

impl SeriesRuleSync {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: SnapshotTable::new("series_rules"),
        }
    }

    /// Applies an `autorecEntryAdd`.
    pub async fn add(&self, fields: &AutorecFields) {
        let _ = self
            .rules
            .insert_new(fields.id.clone(), || SeriesRuleEntry::from_fields(fields))
            .await;
    }

    /// Applies an `autorecEntryUpdate`.
    pub async fn update(&self, fields: &AutorecFields) {
        let _ = self
            .rules
            .update(&fields.id, |rule| rule.merge(fields))
            .await;
    }

    /// Applies an `autorecEntryDelete`.
    pub async fn delete(&self, id: &str) {
        let _ = self.rules.remove(&id.to_string()).await;
    }

    /// Drops every rule.
    pub async fn clean(&self) {
        let dropped = self.rules.clear().await;
        debug!(dropped, "series rule table cleaned");
    }

    /// Builds the host projection.
    pub async fn build(&self, cancel: &CancellationToken) -> Vec<SeriesTimerInfo> {
        self.rules
            .project(cancel, |rule| Some(rule.to_series_timer_info()))
            .await
    }

    /// Returns the stored rule for `id`.
    pub async fn get(&self, id: &str) -> Option<SeriesRuleEntry> {
        self.rules.get(&id.to_string()).await
    }

    /// Number of stored rules.
    pub async fn len(&self) -> usize {
        self.rules.len().await
    }

    /// Returns `true` if no rule is stored.
    pub async fn is_empty(&self) -> bool {
        self.rules.is_empty().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn news_rule() -> AutorecFields {
        AutorecFields {
            id: "a1".to_string(),
            title: Some("News".to_string()),
            days_of_week: Some(0b001_1111),
            start_extra: Some(1),
            stop_extra: Some(2),
            priority: Some(2),
            ..AutorecFields::default()
        }
    }

    #[tokio::test]
    async fn update_merges_days_and_padding() {
        let sync = SeriesRuleSync::new();
        sync.add(&news_rule()).await;
        sync.update(&AutorecFields {
            id: "a1".to_string(),
            days_of_week: Some(0b100_0000),
            stop_extra: Some(15),
            ..AutorecFields::default()
        })
        .await;

        let rules = sync.build(&CancellationToken::new()).await;
        assert_eq!(rules.len(), 1);
        let first = rules.first().cloned();
        assert_eq!(first.as_ref().map(|r| r.days.clone()), Some(vec![Weekday::Sun]));
        assert_eq!(first.as_ref().map(|r| r.pre_padding_seconds), Some(60));
        assert_eq!(first.as_ref().map(|r| r.post_padding_seconds), Some(900));
        assert_eq!(first.map(|r| r.title), Some("News".to_string()));
    }

    #[tokio::test]
    async fn delete_removes_and_unknown_is_noop() {
        let sync = SeriesRuleSync::new();
        sync.add(&news_rule()).await;
        sync.delete("zz").await;
        assert_eq!(sync.len().await, 1);
        sync.delete("a1").await;
        assert!(sync.is_empty().await);
        assert!(sync.get("a1").await.is_none());
    }

    #[tokio::test]
    async fn clean_drops_everything() {
        let sync = SeriesRuleSync::new();
        sync.add(&news_rule()).await;
        sync.add(&AutorecFields {
            id: "a2".to_string(),
            ..news_rule()
        })
        .await;
        sync.clean().await;
        assert!(sync.build(&CancellationToken::new()).await.is_empty());
    }
}
