use serde::ser::SerializeTuple;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::time::SystemTime;
use thiserror::Error;

use crate::limits::{CUSTOM_EVENT_ATTRS_LIMIT, CUSTOM_EVENT_KEY_LIMIT, CUSTOM_EVENT_TYPE_LIMIT};
use crate::payloads::to_unix_millis;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CustomEventError {
    #[error("event type is longer than {} characters", CUSTOM_EVENT_TYPE_LIMIT)]
    EventTypeLength,
    #[error("event type may only contain alphanumerics, underscores, colons, and spaces")]
    EventTypeFormat,
    #[error("more than {} attributes", CUSTOM_EVENT_ATTRS_LIMIT)]
    TooManyAttributes,
    #[error("attribute key {0:?} is longer than {} characters", CUSTOM_EVENT_KEY_LIMIT)]
    KeyLength(String),
}

fn valid_event_type(event_type: &str) -> bool {
    !event_type.is_empty()
        && event_type
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':' || c == ' ')
}

/// A producer-supplied event: `[{type, timestamp}, attrs, {}]`.
#[derive(Debug, Clone)]
pub struct CustomEvent {
    event_type: String,
    /// Unix milliseconds.
    timestamp: i64,
    attrs: HashMap<String, serde_json::Value>,
}

impl CustomEvent {
    /// Validates and builds an event.  Validation failures never corrupt
    /// any reservoir; the event simply is not created.
    pub fn new(
        event_type: &str,
        attrs: HashMap<String, serde_json::Value>,
        now: SystemTime,
    ) -> Result<Self, CustomEventError> {
        if event_type.len() > CUSTOM_EVENT_TYPE_LIMIT {
            return Err(CustomEventError::EventTypeLength);
        }
        if !valid_event_type(event_type) {
            return Err(CustomEventError::EventTypeFormat);
        }
        if attrs.len() > CUSTOM_EVENT_ATTRS_LIMIT {
            return Err(CustomEventError::TooManyAttributes);
        }
        if let Some(key) = attrs.keys().find(|k| k.len() > CUSTOM_EVENT_KEY_LIMIT) {
            return Err(CustomEventError::KeyLength(key.clone()));
        }
        Ok(Self {
            event_type: event_type.to_owned(),
            timestamp: to_unix_millis(now),
            attrs,
        })
    }
}

impl Serialize for CustomEvent {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        #[derive(Serialize)]
        struct Intrinsics<'a> {
            #[serde(rename = "type")]
            event_type: &'a str,
            timestamp: i64,
        }
        #[derive(Serialize)]
        struct Empty {}

        let mut tup = serializer.serialize_tuple(3)?;
        tup.serialize_element(&Intrinsics {
            event_type: &self.event_type,
            timestamp: self.timestamp,
        })?;
        tup.serialize_element(&self.attrs)?;
        tup.serialize_element(&Empty {})?;
        tup.end()
    }
}
