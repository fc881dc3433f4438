//! HTSP message field bag.
//!
//! [`HtspMessage`] is what the transport hands over and accepts: a method
//! name plus named, typed fields. It is only read at the decode boundary
//! ([`super::BackendEvent::decode`], [`super::CommandReply`]); everything
//! past that works on typed values.

use std::collections::BTreeMap;

use crate::error::BridgeError;

/// A single typed field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    /// UTF-8 string.
    Str(String),
    /// Signed 64-bit integer.
    S64(i64),
    /// Opaque bytes.
    Bin(Vec<u8>),
    /// Ordered list of values.
    List(Vec<Field>),
    /// Nested message.
    Map(HtspMessage),
}

impl Field {
    /// Short type name used in malformed-field diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "str",
            Self::S64(_) => "s64",
            Self::Bin(_) => "bin",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }
}

impl From<&str> for Field {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Field {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for Field {
    fn from(value: i64) -> Self {
        Self::S64(value)
    }
}

impl From<u32> for Field {
    fn from(value: u32) -> Self {
        Self::S64(i64::from(value))
    }
}

impl From<bool> for Field {
    fn from(value: bool) -> Self {
        Self::S64(i64::from(value))
    }
}

impl From<Vec<Field>> for Field {
    fn from(value: Vec<Field>) -> Self {
        Self::List(value)
    }
}

impl From<HtspMessage> for Field {
    fn from(value: HtspMessage) -> Self {
        Self::Map(value)
    }
}

/// A keyed bag of typed fields, optionally tagged with a method name.
///
/// Nested maps (e.g. the entries of a channel's `services` list) carry no
/// method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtspMessage {
    method: Option<String>,
    fields: BTreeMap<String, Field>,
}

impl HtspMessage {
    /// Creates an empty message for the given method.
    #[must_use]
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: Some(method.into()),
            fields: BTreeMap::new(),
        }
    }

    /// Creates an untagged nested map.
    #[must_use]
    pub fn map() -> Self {
        Self::default()
    }

    /// Builder-style field insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Field>) -> Self {
        self.put(name, value);
        self
    }

    /// Inserts or replaces a field.
    pub fn put(&mut self, name: impl Into<String>, value: impl Into<Field>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Returns the method name, if any.
    #[must_use]
    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    /// Returns `true` if a field with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Returns the raw field value.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Iterates over field names in sorted order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Reads a string field.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::MalformedField`] if the field exists with
    /// another type.
    pub fn str(&self, name: &str) -> Result<Option<&str>, BridgeError> {
        match self.fields.get(name) {
            None => Ok(None),
            Some(Field::Str(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(malformed(name, "str")),
        }
    }

    /// Reads a signed integer field.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::MalformedField`] if the field exists with
    /// another type.
    pub fn s64(&self, name: &str) -> Result<Option<i64>, BridgeError> {
        match self.fields.get(name) {
            None => Ok(None),
            Some(Field::S64(v)) => Ok(Some(*v)),
            Some(_) => Err(malformed(name, "s64")),
        }
    }

    /// Reads an integer field that must fit a `u32` (ids, numbers).
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::MalformedField`] on a type mismatch or if the
    /// value does not fit.
    pub fn u32(&self, name: &str) -> Result<Option<u32>, BridgeError> {
        match self.s64(name)? {
            None => Ok(None),
            Some(v) => u32::try_from(v)
                .map(Some)
                .map_err(|_| malformed(name, "u32")),
        }
    }

    /// Reads a list field.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::MalformedField`] if the field exists with
    /// another type.
    pub fn list(&self, name: &str) -> Result<Option<&[Field]>, BridgeError> {
        match self.fields.get(name) {
            None => Ok(None),
            Some(Field::List(items)) => Ok(Some(items.as_slice())),
            Some(_) => Err(malformed(name, "list")),
        }
    }

    /// Reads a nested map field.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::MalformedField`] if the field exists with
    /// another type.
    pub fn nested(&self, name: &str) -> Result<Option<&HtspMessage>, BridgeError> {
        match self.fields.get(name) {
            None => Ok(None),
            Some(Field::Map(m)) => Ok(Some(m)),
            Some(_) => Err(malformed(name, "map")),
        }
    }
}

fn malformed(name: &str, expected: &'static str) -> BridgeError {
    BridgeError::MalformedField {
        field: name.to_string(),
        expected,
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_method_and_fields() {
        let msg = HtspMessage::new("channelAdd")
            .with("channelId", 1_i64)
            .with("channelName", "Demo");
        assert_eq!(msg.method(), Some("channelAdd"));
        assert!(msg.contains("channelId"));
        assert_eq!(msg.str("channelName"), Ok(Some("Demo")));
        assert_eq!(msg.u32("channelId"), Ok(Some(1)));
    }

    #[test]
    fn absent_field_is_none() {
        let msg = HtspMessage::new("dvrEntryUpdate");
        assert_eq!(msg.s64("start"), Ok(None));
        assert_eq!(msg.str("title"), Ok(None));
    }

    #[test]
    fn wrong_type_is_malformed() {
        let msg = HtspMessage::new("dvrEntryAdd").with("start", "yesterday");
        let Err(err) = msg.s64("start") else {
            panic!("string read as s64");
        };
        assert_eq!(
            err,
            BridgeError::MalformedField {
                field: "start".to_string(),
                expected: "s64",
            }
        );
    }

    #[test]
    fn negative_value_is_not_u32() {
        let msg = HtspMessage::new("channelAdd").with("channelId", -4_i64);
        assert!(msg.u32("channelId").is_err());
        assert_eq!(msg.s64("channelId"), Ok(Some(-4)));
    }

    #[test]
    fn nested_lists_round_out() {
        let service = HtspMessage::map().with("type", "SDTV");
        let msg = HtspMessage::new("channelAdd").with("services", vec![Field::from(service)]);
        let Ok(Some(services)) = msg.list("services") else {
            panic!("services list missing");
        };
        let Some(Field::Map(first)) = services.first() else {
            panic!("expected nested map");
        };
        assert_eq!(first.method(), None);
        assert_eq!(first.str("type"), Ok(Some("SDTV")));
    }
}
