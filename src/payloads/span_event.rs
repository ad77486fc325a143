use serde::ser::SerializeTuple;
use serde::{Serialize, Serializer};
use std::time::{Duration, SystemTime};

use crate::payloads::to_unix_millis;
use crate::priority::Priority;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanCategory {
    Generic,
    Http,
    Datastore,
}

impl SpanCategory {
    fn as_str(&self) -> &'static str {
        match self {
            SpanCategory::Generic => "generic",
            SpanCategory::Http => "http",
            SpanCategory::Datastore => "datastore",
        }
    }
}

/// One span event: `[intrinsics, {}, {}]`.  Carries its own sampling
/// priority, inherited from the distributed-tracing decision.
#[derive(Debug, Clone)]
pub struct SpanEvent {
    pub guid: String,
    pub trace_id: String,
    pub transaction_id: String,
    pub parent_id: Option<String>,
    pub sampled: bool,
    pub priority: Priority,
    pub timestamp: SystemTime,
    pub duration: Duration,
    pub name: String,
    pub category: SpanCategory,
    pub entry_point: bool,
}

impl Serialize for SpanEvent {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        #[derive(Serialize)]
        struct Intrinsics<'a> {
            #[serde(rename = "type")]
            event_type: &'static str,
            guid: &'a str,
            #[serde(rename = "traceId")]
            trace_id: &'a str,
            #[serde(rename = "transactionId")]
            transaction_id: &'a str,
            #[serde(rename = "parentId")]
            #[serde(skip_serializing_if = "Option::is_none")]
            parent_id: Option<&'a str>,
            sampled: bool,
            priority: Priority,
            timestamp: i64,
            duration: f64,
            name: &'a str,
            category: &'static str,
            #[serde(rename = "nr.entryPoint")]
            #[serde(skip_serializing_if = "std::ops::Not::not")]
            entry_point: bool,
        }
        #[derive(Serialize)]
        struct Empty {}

        let mut tup = serializer.serialize_tuple(3)?;
        tup.serialize_element(&Intrinsics {
            event_type: "Span",
            guid: &self.guid,
            trace_id: &self.trace_id,
            transaction_id: &self.transaction_id,
            parent_id: self.parent_id.as_deref(),
            sampled: self.sampled,
            priority: self.priority,
            timestamp: to_unix_millis(self.timestamp),
            duration: self.duration.as_secs_f64(),
            name: &self.name,
            category: self.category.as_str(),
            entry_point: self.entry_point,
        })?;
        tup.serialize_element(&Empty {})?;
        tup.serialize_element(&Empty {})?;
        tup.end()
    }
}
