//! Channel entity and its host-facing projection.

use serde::Serialize;
use tracing::debug;

use crate::config::OtherChannelType;
use crate::protocol::ChannelFields;

/// Kind of channel exposed to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    /// Television.
    Tv,
    /// Radio.
    Radio,
}

/// Where a channel icon comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconRef {
    /// Absolute HTTP(S) URL, usable as-is.
    Url(String),
    /// Opaque backend image-cache reference (`imagecache/42`).
    Token(String),
}

impl IconRef {
    /// Classifies a raw `channelIcon` value. Empty values carry no icon.
    #[must_use]
    pub fn classify(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let lower = raw.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Some(Self::Url(raw.to_string()))
        } else {
            Some(Self::Token(raw.to_string()))
        }
    }
}

/// Maps the backend's service type strings to a channel type.
///
/// The first service decides. Returns `None` when the mapping for `other`
/// says to ignore the channel.
#[must_use]
pub fn channel_type_for(
    service_types: &[String],
    other: OtherChannelType,
) -> Option<ChannelType> {
    let Some(first) = service_types.first() else {
        return Some(ChannelType::Tv);
    };
    match first.to_ascii_lowercase().as_str() {
        "radio" => Some(ChannelType::Radio),
        "sdtv" | "hdtv" | "fhdtv" | "uhdtv" => Some(ChannelType::Tv),
        "other" => match other {
            OtherChannelType::Tv => Some(ChannelType::Tv),
            OtherChannelType::Radio => Some(ChannelType::Radio),
            OtherChannelType::Ignore => None,
        },
        unknown => {
            debug!(service_type = unknown, "unknown service type, assuming tv");
            Some(ChannelType::Tv)
        }
    }
}

/// Stored channel state, mirroring the wire fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelEntry {
    /// Backend channel id.
    pub id: u32,
    /// Display name.
    pub name: String,
    /// Major number.
    pub number: i64,
    /// Minor number.
    pub number_minor: Option<u32>,
    /// Absolute icon URL, when the backend supplied one.
    pub icon_url: Option<String>,
    /// Service type strings of the channel's services.
    pub service_types: Vec<String>,
}

impl ChannelEntry {
    /// Builds a new entry from an add event; absent fields keep defaults.
    /// The icon is left to the caller because tokens go to a side table.
    #[must_use]
    pub fn from_fields(fields: &ChannelFields) -> Self {
        let mut entry = Self {
            id: fields.id,
            ..Self::default()
        };
        entry.merge(fields);
        entry
    }

    /// Overwrites the fields present in `fields`.
    pub fn merge(&mut self, fields: &ChannelFields) {
        if let Some(name) = &fields.name {
            self.name.clone_from(name);
        }
        if let Some(number) = fields.number {
            self.number = number;
        }
        if let Some(minor) = fields.number_minor {
            self.number_minor = (minor > 0).then_some(minor);
        }
        if let Some(types) = &fields.service_types {
            self.service_types.clone_from(types);
        }
    }

    /// Formats `major` or `major.minor`.
    #[must_use]
    pub fn display_number(&self) -> String {
        match self.number_minor {
            Some(minor) => format!("{}.{minor}", self.number),
            None => self.number.to_string(),
        }
    }
}

/// Host-facing channel projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelInfo {
    /// Backend channel id as a string.
    pub id: String,
    /// Display name.
    pub name: String,
    /// `major` or `major.minor`.
    pub number: String,
    /// TV or radio.
    pub channel_type: ChannelType,
    /// Absolute icon URL, if known without a lookup.
    pub image_url: Option<String>,
    /// Whether any icon (URL or token) exists.
    pub has_image: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_icon_references() {
        assert_eq!(
            IconRef::classify("https://logos.example/1.png"),
            Some(IconRef::Url("https://logos.example/1.png".to_string()))
        );
        assert_eq!(
            IconRef::classify("imagecache/12"),
            Some(IconRef::Token("imagecache/12".to_string()))
        );
        assert_eq!(IconRef::classify("  "), None);
    }

    #[test]
    fn service_types_map_to_channel_type() {
        let sdtv = vec!["sdtv".to_string()];
        let radio = vec!["Radio".to_string()];
        let other = vec!["Other".to_string()];
        assert_eq!(
            channel_type_for(&sdtv, OtherChannelType::Ignore),
            Some(ChannelType::Tv)
        );
        assert_eq!(
            channel_type_for(&radio, OtherChannelType::Ignore),
            Some(ChannelType::Radio)
        );
        assert_eq!(channel_type_for(&other, OtherChannelType::Ignore), None);
        assert_eq!(
            channel_type_for(&other, OtherChannelType::Radio),
            Some(ChannelType::Radio)
        );
        assert_eq!(
            channel_type_for(&[], OtherChannelType::Ignore),
            Some(ChannelType::Tv)
        );
    }

    #[test]
    fn merge_touches_only_present_fields() {
        let mut entry = ChannelEntry::from_fields(&ChannelFields {
            id: 1,
            number: Some(5),
            name: Some("Demo".to_string()),
            ..ChannelFields::default()
        });
        entry.merge(&ChannelFields {
            id: 1,
            name: Some("Demo HD".to_string()),
            ..ChannelFields::default()
        });
        assert_eq!(entry.name, "Demo HD");
        assert_eq!(entry.number, 5);
        assert_eq!(entry.display_number(), "5");

        entry.merge(&ChannelFields {
            id: 1,
            number_minor: Some(2),
            ..ChannelFields::default()
        });
        assert_eq!(entry.display_number(), "5.2");
    }
}
