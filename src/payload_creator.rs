use std::fmt;
use std::time::SystemTime;
use thiserror::Error;

use crate::domain_defs::AgentRunId;
use crate::harvest::Harvest;

// Collector command names, one per data kind.
pub(crate) const CMD_METRICS: &str = "metric_data";
pub(crate) const CMD_CUSTOM_EVENTS: &str = "custom_event_data";
pub(crate) const CMD_TXN_EVENTS: &str = "analytic_event_data";
pub(crate) const CMD_ERROR_EVENTS: &str = "error_event_data";
pub(crate) const CMD_SPAN_EVENTS: &str = "span_event_data";
pub(crate) const CMD_ERROR_DATA: &str = "error_data";
pub(crate) const CMD_TXN_TRACES: &str = "transaction_sample_data";
pub(crate) const CMD_SLOW_SQLS: &str = "sql_trace_data";

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One wire-ready unit of harvested data, handed to the transport.
///
/// The transport serializes it with `data`, POSTs it, and on delivery
/// failure calls `merge_into_harvest` against the next cycle's live harvest
/// instead of discarding it.  The core never performs I/O itself.
pub trait PayloadCreator: fmt::Debug + Send {
    /// Stable collector command identifier for this data kind.
    fn endpoint_method(&self) -> &'static str;

    /// Serialized payload, or `None` when there is nothing to report.
    fn data(
        &self,
        agent_run_id: &AgentRunId,
        harvest_start: SystemTime,
    ) -> Result<Option<Vec<u8>>, PayloadError>;

    /// Failure-retry path: re-inject this payload's data into `harvest`.
    /// Each data kind bounds its own retries; traces drop immediately.
    fn merge_into_harvest(self: Box<Self>, harvest: &Harvest);
}
