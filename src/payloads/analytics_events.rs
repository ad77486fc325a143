// Copyright 2020 New Relic Corporation. (for the original go-agent)
// Copyright 2020 Masaki Hara.

use serde::{Deserialize, Serialize, Serializer};

use crate::apdex::ApdexZone;
use crate::domain_defs::AgentRunId;
use crate::payloads::{AgentAttrs, UserAttrs};

/// Wire envelope shared by all event endpoints:
/// `[agent_run_id, {reservoir_size, events_seen}, [event, ...]]`.
#[derive(Debug)]
pub(crate) struct CollectorPayload<'a, E> {
    pub(crate) agent_run_id: AgentRunId,
    pub(crate) properties: Properties,
    pub(crate) events: Vec<&'a E>,
}

impl<'a, E: Serialize> Serialize for CollectorPayload<'a, E> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeTuple;

        let mut tup = serializer.serialize_tuple(3)?;
        tup.serialize_element(&self.agent_run_id)?;
        tup.serialize_element(&self.properties)?;
        tup.serialize_element(&self.events)?;
        tup.end()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub(crate) struct Properties {
    pub(crate) reservoir_size: i32,
    pub(crate) events_seen: i64,
}

/// One transaction event: `[intrinsics, user attrs, agent attrs]`.
#[derive(Debug, Clone, Default)]
pub struct TransactionEvent {
    pub intrinsics: TransactionIntrinsics,
    pub user_attrs: UserAttrs,
    pub agent_attrs: AgentAttrs,
}

impl Serialize for TransactionEvent {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeTuple;

        let mut tup = serializer.serialize_tuple(3)?;
        tup.serialize_element(&self.intrinsics)?;
        tup.serialize_element(&self.user_attrs)?;
        tup.serialize_element(&self.agent_attrs)?;
        tup.end()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TransactionIntrinsics {
    #[serde(rename = "type")]
    pub event_type: TransactionEventType,
    pub name: String,
    /// Unix milliseconds.
    pub timestamp: i64,
    #[serde(rename = "nr.apdexPerfZone")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apdex_perf_zone: Option<ApdexZone>,
    pub error: bool,
    #[serde(flatten)]
    pub shared: TransactionShared,
    #[serde(rename = "totalTime")]
    pub total_time: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub enum TransactionEventType {
    Transaction,
}

impl Default for TransactionEventType {
    fn default() -> Self {
        TransactionEventType::Transaction
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TransactionShared {
    pub duration: f64,

    #[serde(rename = "queueDuration")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_duration: Option<f64>,

    #[serde(rename = "externalCallCount")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_call_count: Option<u64>,
    #[serde(rename = "externalDuration")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_duration: Option<f64>,

    #[serde(rename = "databaseCallCount")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_call_count: Option<u64>,
    #[serde(rename = "databaseDuration")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_duration: Option<f64>,
}
