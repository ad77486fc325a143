// Copyright 2020 New Relic Corporation. (for the original go-agent)
// Copyright 2020 Masaki Hara.

use serde::{Deserialize, Serialize, Serializer};

use crate::domain_defs::AgentRunId;
use crate::metrics::MetricData;

/// `metric_data` wire format:
/// `[agent_run_id, period_start, period_end, [[id, data], ...]]`.
#[derive(Debug, Clone)]
pub(crate) struct CollectorPayload {
    pub(crate) agent_run_id: AgentRunId,
    /// period start (unix time)
    pub(crate) start: i64,
    /// period end (unix time)
    pub(crate) end: i64,
    pub(crate) metrics: Vec<(MetricId, MetricData)>,
}

impl Serialize for CollectorPayload {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeTuple;

        let mut tup = serializer.serialize_tuple(4)?;
        tup.serialize_element(&self.agent_run_id)?;
        tup.serialize_element(&self.start)?;
        tup.serialize_element(&self.end)?;
        tup.serialize_element(&self.metrics)?;
        tup.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct MetricId {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}
