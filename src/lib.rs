//! In-process telemetry aggregation and batching for an APM agent.
//!
//! Instrumentation records transactions, events, traces, and slow queries
//! into a [`Harvest`]; a transport loop periodically asks the harvest which
//! reporting groups are due, serializes the resulting [`PayloadCreator`]s,
//! and feeds failed deliveries back in for a bounded retry.  This crate does
//! no I/O of its own.
//!
//! ```
//! use std::time::SystemTime;
//! use apm_harvest_core::{Harvest, MetricForce};
//!
//! let harvest = Harvest::new(SystemTime::now(), None);
//! harvest.record_count_metric("Custom/cache/miss", 1.0, MetricForce::Unforced);
//!
//! if let Some(mut ready) = harvest.ready(SystemTime::now()) {
//!     ready.create_final_metrics(None);
//!     for payload in ready.payloads(true) {
//!         // hand payload.endpoint_method() / payload.data(..) to the transport
//!     }
//! }
//! ```

mod analytics_events;
mod apdex;
mod connect_reply;
mod custom_events;
mod domain_defs;
mod error_events;
mod error_traces;
mod harvest;
mod limits;
mod metric_names;
mod metric_rules;
mod metrics;
mod payload_creator;
mod payloads;
mod priority;
mod slow_queries;
mod span_events;
mod transaction_trace;
mod txn_data;
mod txn_events;

pub use crate::apdex::{ApdexZone, ApdexZoneParseError};
pub use crate::connect_reply::{ConnectReply, EventHarvestConfig, HarvestLimits};
pub use crate::domain_defs::AgentRunId;
pub use crate::harvest::{Harvest, HarvestReady, HarvestTimer};
pub use crate::metric_rules::{MetricRule, MetricRules};
pub use crate::metrics::{MetricData, MetricForce, MetricTable};
pub use crate::payload_creator::{PayloadCreator, PayloadError};
pub use crate::payloads::analytics_events::{
    TransactionEvent, TransactionEventType, TransactionIntrinsics, TransactionShared,
};
pub use crate::payloads::custom_event::{CustomEvent, CustomEventError};
pub use crate::payloads::error_event::{ErrorData, ErrorEvent};
pub use crate::payloads::error_trace::TracedError;
pub use crate::payloads::span_event::{SpanCategory, SpanEvent};
pub use crate::payloads::transaction_trace::{
    DummyStruct, Intrinsics, Node, NodeAttrs, Properties, TraceData, TransactionTrace,
};
pub use crate::payloads::{AgentAttrs, UserAttrs};
pub use crate::priority::Priority;
pub use crate::slow_queries::SlowQueryInstance;
pub use crate::txn_data::{create_txn_metrics, BetterCat, TxnData};
