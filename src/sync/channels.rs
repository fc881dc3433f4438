//! Channel synchronizer.
//!
//! Channels reported with a number of zero or below are hidden by the
//! backend's own convention and never enter the table; since updates only
//! touch known ids, a later positive number does not resurrect them.
//! Icons arrive either as absolute URLs, kept on the entry, or as opaque
//! image-cache tokens, kept in a side table keyed by channel id.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::table::SnapshotTable;
use crate::config::OtherChannelType;
use crate::domain::channel::channel_type_for;
use crate::domain::{ChannelEntry, ChannelInfo, IconRef};
use crate::protocol::ChannelFields;

/// Keeps the channel table and its icon-token side table.
#[derive(Debug)]
pub struct ChannelSync {
    channels: SnapshotTable<u32, ChannelEntry>,
    icon_tokens: SnapshotTable<u32, String>,
    other_channel_type: OtherChannelType,
}

impl ChannelSync {
    /// Creates empty tables; `other_channel_type` decides how services of
    /// type `other` are exposed.
    #[must_use]
    pub fn new(other_channel_type: OtherChannelType) -> Self {
        Self {
            channels: SnapshotTable::new("channels"),
            icon_tokens: SnapshotTable::new("channel_icons"),
            other_channel_type,
        }
    }

    /// Applies a `channelAdd`.
    pub async fn add(&self, fields: &ChannelFields) {
        if fields.number.unwrap_or(0) <= 0 {
            debug!(channel_id = fields.id, number = ?fields.number, "hidden channel skipped");
            return;
        }

        let icon = fields.icon.as_deref().and_then(IconRef::classify);
        let url = match &icon {
            Some(IconRef::Url(url)) => Some(url.clone()),
            _ => None,
        };
        let inserted = self
            .channels
            .insert_new(fields.id, || {
                let mut entry = ChannelEntry::from_fields(fields);
                entry.icon_url = url;
                entry
            })
            .await;

        if inserted && let Some(IconRef::Token(token)) = icon {
            self.icon_tokens.upsert(fields.id, token).await;
        }
    }

    /// Applies a `channelUpdate`.
    pub async fn update(&self, fields: &ChannelFields) {
        let icon = fields.icon.as_deref().map(IconRef::classify);
        let updated = self
            .channels
            .update(&fields.id, |entry| {
                entry.merge(fields);
                if let Some(icon) = &icon {
                    entry.icon_url = match icon {
                        Some(IconRef::Url(url)) => Some(url.clone()),
                        _ => None,
                    };
                }
            })
            .await;

        if !updated {
            return;
        }
        match icon {
            Some(Some(IconRef::Token(token))) => self.icon_tokens.upsert(fields.id, token).await,
            Some(_) => {
                let _ = self.icon_tokens.remove(&fields.id).await;
            }
            None => {}
        }
    }

    /// Applies a `channelDelete`.
    pub async fn delete(&self, id: u32) {
        let _ = self.channels.remove(&id).await;
        let _ = self.icon_tokens.remove(&id).await;
    }

    /// Drops every channel and icon token.
    pub async fn clean(&self) {
        let dropped = self.channels.clear().await;
        let _ = self.icon_tokens.clear().await;
        debug!(dropped, "channel table cleaned");
    }

    /// Builds the host projection. Channels mapped to "ignore" are left out.
    pub async fn build(&self, cancel: &CancellationToken) -> Vec<ChannelInfo> {
        let with_token = self.icon_tokens.keys().await;
        let other = self.other_channel_type;
        self.channels
            .project(cancel, |entry| {
                let channel_type = channel_type_for(&entry.service_types, other)?;
                Some(ChannelInfo {
                    id: entry.id.to_string(),
                    name: entry.name.clone(),
                    number: entry.display_number(),
                    channel_type,
                    image_url: entry.icon_url.clone(),
                    has_image: entry.icon_url.is_some() || with_token.contains(&entry.id),
                })
            })
            .await
    }

    /// Looks up where a channel's icon comes from.
    pub async fn icon(&self, id: u32) -> Option<IconRef> {
        let entry = self.channels.get(&id).await?;
        if let Some(url) = entry.icon_url {
            return Some(IconRef::Url(url));
        }
        self.icon_tokens.get(&id).await.map(IconRef::Token)
    }

    /// Returns the stored entry for `id`.
    pub async fn get(&self, id: u32) -> Option<ChannelEntry> {
        self.channels.get(&id).await
    }

    /// Number of stored channels.
    pub async fn len(&self) -> usize {
        self.channels.len().await
    }

    /// Returns `true` if no channel is stored.
    pub async fn is_empty(&self) -> bool {
        self.channels.is_empty().await
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::ChannelType;

    fn demo() -> ChannelFields {
        ChannelFields {
            id: 1,
            number: Some(5),
            name: Some("Demo".to_string()),
            service_types: Some(vec!["sdtv".to_string()]),
            ..ChannelFields::default()
        }
    }

    #[tokio::test]
    async fn add_then_update_name() {
        let sync = ChannelSync::new(OtherChannelType::Ignore);
        sync.add(&demo()).await;
        sync.update(&ChannelFields {
            id: 1,
            name: Some("Demo HD".to_string()),
            ..ChannelFields::default()
        })
        .await;

        let channels = sync.build(&CancellationToken::new()).await;
        assert_eq!(
            channels,
            vec![ChannelInfo {
                id: "1".to_string(),
                name: "Demo HD".to_string(),
                number: "5".to_string(),
                channel_type: ChannelType::Tv,
                image_url: None,
                has_image: false,
            }]
        );
    }

    #[tokio::test]
    async fn hidden_channel_stays_hidden_after_update() {
        let sync = ChannelSync::new(OtherChannelType::Tv);
        sync.add(&ChannelFields {
            number: Some(0),
            ..demo()
        })
        .await;
        sync.update(&ChannelFields {
            id: 1,
            number: Some(8),
            ..ChannelFields::default()
        })
        .await;

        assert!(sync.build(&CancellationToken::new()).await.is_empty());
        assert!(sync.is_empty().await);
    }

    #[tokio::test]
    async fn duplicate_add_keeps_first() {
        let sync = ChannelSync::new(OtherChannelType::Ignore);
        sync.add(&demo()).await;
        sync.add(&ChannelFields {
            name: Some("Replay".to_string()),
            ..demo()
        })
        .await;
        let Some(entry) = sync.get(1).await else {
            panic!("channel missing");
        };
        assert_eq!(entry.name, "Demo");
    }

    #[tokio::test]
    async fn icon_token_goes_to_side_table() {
        let sync = ChannelSync::new(OtherChannelType::Ignore);
        sync.add(&ChannelFields {
            icon: Some("imagecache/17".to_string()),
            ..demo()
        })
        .await;
        assert_eq!(
            sync.icon(1).await,
            Some(IconRef::Token("imagecache/17".to_string()))
        );
        let channels = sync.build(&CancellationToken::new()).await;
        assert!(channels.iter().all(|c| c.has_image && c.image_url.is_none()));

        sync.update(&ChannelFields {
            id: 1,
            icon: Some("https://logos.example/demo.png".to_string()),
            ..ChannelFields::default()
        })
        .await;
        assert_eq!(
            sync.icon(1).await,
            Some(IconRef::Url("https://logos.example/demo.png".to_string()))
        );
    }

    #[tokio::test]
    async fn ignored_other_channels_are_not_projected() {
        let sync = ChannelSync::new(OtherChannelType::Ignore);
        sync.add(&ChannelFields {
            service_types: Some(vec!["Other".to_string()]),
            ..demo()
        })
        .await;
        assert_eq!(sync.len().await, 1);
        assert!(sync.build(&CancellationToken::new()).await.is_empty());
    }

    #[tokio::test]
    async fn delete_and_clean() {
        let sync = ChannelSync::new(OtherChannelType::Ignore);
        sync.add(&demo()).await;
        sync.add(&ChannelFields {
            id: 2,
            icon: Some("imagecache/2".to_string()),
            ..demo()
        })
        .await;

        sync.delete(1).await;
        sync.delete(42).await;
        assert_eq!(sync.len().await, 1);

        sync.clean().await;
        assert!(sync.is_empty().await);
        assert_eq!(sync.icon(2).await, None);
    }
}
