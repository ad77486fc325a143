use std::time::Duration;

pub(crate) const FIXED_HARVEST_PERIOD: Duration = Duration::from_secs(60);
pub(crate) const DEFAULT_CONFIGURABLE_EVENT_HARVEST: Duration = Duration::from_secs(60);
// Bounds for the collector-supplied event report period.
pub(crate) const MIN_CONFIGURABLE_PERIOD: Duration = Duration::from_secs(1);
pub(crate) const MAX_CONFIGURABLE_PERIOD: Duration = Duration::from_secs(300);

pub(crate) const MAX_METRICS: usize = 2 * 1000;
pub(crate) const MAX_TXN_EVENTS: usize = 10 * 1000;
pub(crate) const MAX_CUSTOM_EVENTS: usize = 10 * 1000;
pub(crate) const MAX_ERROR_EVENTS: usize = 100;
pub(crate) const MAX_SPAN_EVENTS: usize = 1000;

pub(crate) const MAX_HARVEST_ERRORS: usize = 20;
pub(crate) const MAX_REGULAR_TRACES: usize = 10;
pub(crate) const MAX_SLOW_SQLS: usize = 10;

// Transaction-event harvests larger than this are split into multiple
// payloads (or truncated, when splitting is disabled).
pub(crate) const TXN_EVENT_PAYLOAD_LIMIT: usize = 5 * 1000;

// How many times a failed delivery may be re-merged before the data is
// dropped.  Events get a single retry; metrics are small enough to carry
// across a few failed cycles.
pub(crate) const FAILED_EVENTS_ATTEMPTS_LIMIT: u32 = 1;
pub(crate) const FAILED_METRIC_ATTEMPTS_LIMIT: u32 = 5;

pub(crate) const CUSTOM_EVENT_TYPE_LIMIT: usize = 255;
pub(crate) const CUSTOM_EVENT_ATTRS_LIMIT: usize = 64;
pub(crate) const CUSTOM_EVENT_KEY_LIMIT: usize = 255;
