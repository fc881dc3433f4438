//! Tuner synchronizer: the table is rebuilt wholesale per `tunerInfo`.

use tokio_util::sync::CancellationToken;

use super::table::SnapshotTable;
use crate::domain::{TunerEntry, TunerInfo, TunerKey};
use crate::protocol::TunerFields;

/// Keeps the tuner table.
#[derive(Debug)]
pub struct TunerSync {
    tuners: SnapshotTable<TunerKey, TunerEntry>,
}

impl Default for TunerSync {
    fn default() -> Self {
        Self::new()
    }
}

impl TunerSync {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tuners: SnapshotTable::new("tuners"),
        }
    }

    /// Replaces the table with the lines of one `tunerInfo` event.
    pub async fn replace(&self, lines: Vec<TunerFields>) {
        let entries = lines.into_iter().map(|fields| {
            let entry = TunerEntry::from(fields);
            (entry.key(), entry)
        });
        self.tuners.replace_all(entries).await;
    }

    /// Drops every tuner line.
    pub async fn clean(&self) {
        let _ = self.tuners.clear().await;
    }

    /// Builds the host projection.
    pub async fn build(&self, cancel: &CancellationToken) -> Vec<TunerInfo> {
        self.tuners
            .project(cancel, |entry| Some(entry.to_tuner_info()))
            .await
    }
}
