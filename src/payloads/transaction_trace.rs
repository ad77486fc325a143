use serde::{Deserialize, Serialize};

use crate::domain_defs::AgentRunId;
use crate::payloads::{AgentAttrs, UserAttrs};

/// `transaction_sample_data` wire format: `[agent_run_id, [trace, ...]]`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct CollectorPayload<'a>(
    pub(crate) &'a AgentRunId,
    pub(crate) &'a [TransactionTrace],
);

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransactionTrace(
    /// start (unix millis)
    pub i64,
    /// duration (millis)
    pub f64,
    /// final name
    pub String,
    /// request uri
    pub Option<String>,
    pub TraceData,
    /// CAT GUID
    pub String,
    /// reserved (null)
    pub (),
    /// ForcePersist (false for now)
    pub bool,
    /// X-Ray sessions (null for now)
    pub (),
    /// Synthetics resource id
    pub String,
);

impl TransactionTrace {
    pub(crate) fn duration_millis(&self) -> f64 {
        self.1
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TraceData(
    /// unused timestamp (0.0)
    pub f64,
    /// unused: formerly request parameters
    pub DummyStruct,
    /// unused: formerly custom parameters
    pub DummyStruct,
    pub Node,
    pub Properties,
);

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DummyStruct {}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Node(
    /// relativeStartMillis
    pub i64,
    /// relativeStopMillis
    pub i64,
    /// name
    pub String,
    pub NodeAttrs,
    /// children
    pub Vec<Node>,
);

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NodeAttrs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_duration_millis: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Properties {
    pub agent_attributes: AgentAttrs,
    pub user_attributes: UserAttrs,
    pub intrinsics: Intrinsics,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Intrinsics {
    #[serde(rename = "totalTime")]
    pub total_time: f64,
}
