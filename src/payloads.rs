use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::SystemTime;

pub(crate) mod analytics_events;
pub(crate) mod custom_event;
pub(crate) mod error_event;
pub(crate) mod error_trace;
pub(crate) mod metrics;
pub(crate) mod slow_sql;
pub(crate) mod span_event;
pub(crate) mod transaction_trace;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UserAttrs {}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct AgentAttrs {
    pub hash: HashMap<String, serde_json::Value>,
}

pub(crate) fn to_unix_secs(t: SystemTime) -> i64 {
    t.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub(crate) fn to_unix_millis(t: SystemTime) -> i64 {
    t.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
