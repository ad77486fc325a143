// Copyright 2020 New Relic Corporation. (for the original go-agent)
// Copyright 2020 Masaki Hara.

use parking_lot::Mutex;
use std::mem;
use std::time::{Duration, SystemTime};

use crate::connect_reply::ConnectReply;
use crate::custom_events::CustomEvents;
use crate::error_events::ErrorEvents;
use crate::error_traces::HarvestErrors;
use crate::limits::{
    DEFAULT_CONFIGURABLE_EVENT_HARVEST, FIXED_HARVEST_PERIOD, MAX_CUSTOM_EVENTS, MAX_ERROR_EVENTS,
    MAX_SPAN_EVENTS, MAX_TXN_EVENTS,
};
use crate::metric_names::{
    CUSTOM_EVENTS_SEEN, CUSTOM_EVENTS_SENT, ERROR_EVENTS_SEEN, ERROR_EVENTS_SENT,
    SPAN_EVENTS_SEEN, SPAN_EVENTS_SENT, TXN_EVENTS_SEEN, TXN_EVENTS_SENT,
};
use crate::metric_rules::MetricRules;
use crate::metrics::{MetricForce, MetricTable};
use crate::payload_creator::PayloadCreator;
use crate::payloads::analytics_events::TransactionEvent;
use crate::payloads::custom_event::CustomEvent;
use crate::payloads::error_event::ErrorEvent;
use crate::payloads::error_trace::TracedError;
use crate::payloads::span_event::SpanEvent;
use crate::payloads::transaction_trace::TransactionTrace;
use crate::priority::Priority;
use crate::slow_queries::{SlowQueries, SlowQueryInstance};
use crate::span_events::SpanEvents;
use crate::transaction_trace::HarvestTraces;
use crate::txn_data::{create_txn_metrics, TxnData};
use crate::txn_events::TxnEvents;

/// Decides when a harvest group is due.  Relative to the previous firing,
/// not wall-aligned: a late check drifts the schedule rather than catching
/// up.
#[derive(Debug, Clone)]
pub struct HarvestTimer {
    period: Duration,
    last_harvest: SystemTime,
}

impl HarvestTimer {
    pub fn new(period: Duration, start: SystemTime) -> Self {
        Self {
            period,
            last_harvest: start,
        }
    }

    /// True when the period has elapsed (or `force`), resetting the timer
    /// to `now`.
    pub fn ready(&mut self, now: SystemTime, force: bool) -> bool {
        if force || now >= self.last_harvest + self.period {
            self.last_harvest = now;
            true
        } else {
            false
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

/// Reservoir capacities, as negotiated with the collector.  A collector
/// limit can only lower the built-in cap, never raise it.
#[derive(Debug, Clone, Copy)]
struct EventCaps {
    txn_events: usize,
    custom_events: usize,
    error_events: usize,
    span_events: usize,
}

impl EventCaps {
    fn from_reply(reply: Option<&ConnectReply>) -> Self {
        let limits = reply.map(|r| &r.event_harvest_config.harvest_limits);
        let cap = |limit: Option<u32>, fallback: usize| match limit {
            Some(limit) => (limit as usize).min(fallback),
            None => fallback,
        };
        Self {
            txn_events: cap(limits.and_then(|l| l.analytic_event_data), MAX_TXN_EVENTS),
            custom_events: cap(limits.and_then(|l| l.custom_event_data), MAX_CUSTOM_EVENTS),
            error_events: cap(limits.and_then(|l| l.error_event_data), MAX_ERROR_EVENTS),
            span_events: cap(limits.and_then(|l| l.span_event_data), MAX_SPAN_EVENTS),
        }
    }
}

/// All data accumulated between deliveries, in two groups with independent
/// schedules.
///
/// The fixed group (metrics, error traces, transaction traces, slow
/// queries, span events) reports every `FIXED_HARVEST_PERIOD`; the
/// configurable group (transaction, custom, and error events) reports at
/// the collector-negotiated period.  Every component sits behind its own
/// lock, and no method holds two locks at once, so producers never contend
/// with anything but their own data kind.
#[derive(Debug)]
pub struct Harvest {
    caps: EventCaps,
    fixed_timer: Mutex<HarvestTimer>,
    configurable_timer: Mutex<HarvestTimer>,
    pub(crate) metrics: Mutex<MetricTable>,
    pub(crate) txn_events: Mutex<TxnEvents>,
    pub(crate) custom_events: Mutex<CustomEvents>,
    pub(crate) error_events: Mutex<ErrorEvents>,
    pub(crate) span_events: Mutex<SpanEvents>,
    pub(crate) error_traces: Mutex<HarvestErrors>,
    pub(crate) txn_traces: Mutex<HarvestTraces>,
    pub(crate) slow_sqls: Mutex<SlowQueries>,
}

impl Harvest {
    /// A fresh harvest as of `now`.  Passing `None` for the reply behaves
    /// exactly like a reply with every field absent.
    pub fn new(now: SystemTime, reply: Option<&ConnectReply>) -> Self {
        let caps = EventCaps::from_reply(reply);
        let configurable_period = reply
            .map(|r| r.event_harvest_config.report_period())
            .unwrap_or(DEFAULT_CONFIGURABLE_EVENT_HARVEST);
        Self {
            caps,
            fixed_timer: Mutex::new(HarvestTimer::new(FIXED_HARVEST_PERIOD, now)),
            configurable_timer: Mutex::new(HarvestTimer::new(configurable_period, now)),
            metrics: Mutex::new(MetricTable::with_default_capacity(now)),
            txn_events: Mutex::new(TxnEvents::new(caps.txn_events)),
            custom_events: Mutex::new(CustomEvents::new(caps.custom_events)),
            error_events: Mutex::new(ErrorEvents::new(caps.error_events)),
            span_events: Mutex::new(SpanEvents::new(caps.span_events)),
            error_traces: Mutex::new(HarvestErrors::new()),
            txn_traces: Mutex::new(HarvestTraces::new()),
            slow_sqls: Mutex::new(SlowQueries::new()),
        }
    }

    /// Detaches whichever groups are due at `now`, or `None` when neither
    /// is.  The configurable group is taken first so that its seen/sent
    /// accounting lands in the metric table before the fixed group carries
    /// that table away.
    pub fn ready(&self, now: SystemTime) -> Option<HarvestReady> {
        self.take(now, false)
    }

    /// Detaches both groups unconditionally, e.g. at shutdown or before a
    /// reconnect.
    pub fn flush(&self, now: SystemTime) -> Option<HarvestReady> {
        self.take(now, true)
    }

    fn take(&self, now: SystemTime, force: bool) -> Option<HarvestReady> {
        let configurable_due = self.configurable_timer.lock().ready(now, force);
        let fixed_due = self.fixed_timer.lock().ready(now, force);
        if !configurable_due && !fixed_due {
            return None;
        }
        let mut ready = HarvestReady::default();
        if configurable_due {
            ready.configurable = Some(self.detach_configurable());
        }
        if fixed_due {
            ready.fixed = Some(self.detach_fixed(now));
        }
        Some(ready)
    }

    fn detach_configurable(&self) -> ConfigurableSnapshot {
        let txn_events = {
            let mut guard = self.txn_events.lock();
            mem::replace(&mut *guard, TxnEvents::new(self.caps.txn_events))
        };
        let custom_events = {
            let mut guard = self.custom_events.lock();
            mem::replace(&mut *guard, CustomEvents::new(self.caps.custom_events))
        };
        let error_events = {
            let mut guard = self.error_events.lock();
            mem::replace(&mut *guard, ErrorEvents::new(self.caps.error_events))
        };
        {
            let mut metrics = self.metrics.lock();
            let forced = MetricForce::Forced;
            metrics.add_count(TXN_EVENTS_SEEN, txn_events.num_seen() as f64, forced);
            metrics.add_count(TXN_EVENTS_SENT, txn_events.num_saved() as f64, forced);
            metrics.add_count(CUSTOM_EVENTS_SEEN, custom_events.num_seen() as f64, forced);
            metrics.add_count(CUSTOM_EVENTS_SENT, custom_events.num_saved() as f64, forced);
            metrics.add_count(ERROR_EVENTS_SEEN, error_events.num_seen() as f64, forced);
            metrics.add_count(ERROR_EVENTS_SENT, error_events.num_saved() as f64, forced);
        }
        ConfigurableSnapshot {
            txn_events,
            custom_events,
            error_events,
        }
    }

    fn detach_fixed(&self, now: SystemTime) -> FixedSnapshot {
        let span_events = {
            let mut guard = self.span_events.lock();
            mem::replace(&mut *guard, SpanEvents::new(self.caps.span_events))
        };
        {
            let mut metrics = self.metrics.lock();
            let forced = MetricForce::Forced;
            metrics.add_count(SPAN_EVENTS_SEEN, span_events.num_seen() as f64, forced);
            metrics.add_count(SPAN_EVENTS_SENT, span_events.num_saved() as f64, forced);
        }
        let metrics = {
            let mut guard = self.metrics.lock();
            mem::replace(&mut *guard, MetricTable::with_default_capacity(now))
        };
        let error_traces = {
            let mut guard = self.error_traces.lock();
            mem::replace(&mut *guard, HarvestErrors::new())
        };
        let txn_traces = {
            let mut guard = self.txn_traces.lock();
            mem::replace(&mut *guard, HarvestTraces::new())
        };
        let slow_sqls = {
            let mut guard = self.slow_sqls.lock();
            mem::replace(&mut *guard, SlowQueries::new())
        };
        FixedSnapshot {
            metrics,
            span_events,
            error_traces,
            txn_traces,
            slow_sqls,
        }
    }

    /// Folds a finished transaction's standard metrics into the table.
    pub fn record_txn(&self, txn: &TxnData) {
        let mut metrics = self.metrics.lock();
        create_txn_metrics(txn, &mut metrics);
    }

    pub fn record_txn_event(&self, event: TransactionEvent, priority: Priority) {
        self.txn_events.lock().add(event, priority);
    }

    pub fn record_custom_event(&self, event: CustomEvent, priority: Priority) {
        self.custom_events.lock().add(event, priority);
    }

    pub fn record_error_event(&self, event: ErrorEvent, priority: Priority) {
        self.error_events.lock().add(event, priority);
    }

    pub fn record_span_event(&self, event: SpanEvent) {
        self.span_events.lock().add(event);
    }

    pub fn record_error_trace(&self, error: TracedError) {
        self.error_traces.lock().push(error);
    }

    pub fn record_txn_trace(&self, trace: TransactionTrace) {
        self.txn_traces.lock().push(trace);
    }

    pub fn record_slow_sql(&self, instance: SlowQueryInstance) {
        self.slow_sqls.lock().observe(instance);
    }

    pub fn record_count_metric(&self, name: &str, count: f64, force: MetricForce) {
        self.metrics.lock().add_count(name, count, force);
    }

    pub fn record_value_metric(&self, name: &str, value: f64, force: MetricForce) {
        self.metrics.lock().add_value(name, value, force);
    }
}

/// The groups detached by one due check.  Zero-valued (both `None`) it
/// yields no payloads at all.
#[derive(Debug, Default)]
pub struct HarvestReady {
    fixed: Option<FixedSnapshot>,
    configurable: Option<ConfigurableSnapshot>,
}

#[derive(Debug)]
struct FixedSnapshot {
    metrics: MetricTable,
    span_events: SpanEvents,
    error_traces: HarvestErrors,
    txn_traces: HarvestTraces,
    slow_sqls: SlowQueries,
}

#[derive(Debug)]
struct ConfigurableSnapshot {
    txn_events: TxnEvents,
    custom_events: CustomEvents,
    error_events: ErrorEvents,
}

impl HarvestReady {
    /// Applies end-of-cycle bookkeeping to the detached metric table: the
    /// reporting metric, the dropped count, and the collector's renaming
    /// rules.  A no-op when the fixed group was not due.
    pub fn create_final_metrics(&mut self, rules: Option<&MetricRules>) {
        if let Some(fixed) = &mut self.fixed {
            fixed.metrics.create_final_metrics(rules);
        }
    }

    /// Converts the snapshot into wire-ready payloads, one per detached
    /// data kind.  Transaction events may contribute more than one when
    /// they outgrow the per-request limit and `split_large` is set.
    pub fn payloads(self, split_large: bool) -> Vec<Box<dyn PayloadCreator>> {
        let mut payloads: Vec<Box<dyn PayloadCreator>> = Vec::new();
        if let Some(configurable) = self.configurable {
            payloads.extend(configurable.txn_events.into_payloads(split_large));
            payloads.push(Box::new(configurable.custom_events));
            payloads.push(Box::new(configurable.error_events));
        }
        if let Some(fixed) = self.fixed {
            payloads.push(Box::new(fixed.metrics));
            payloads.push(Box::new(fixed.error_traces));
            payloads.push(Box::new(fixed.txn_traces));
            payloads.push(Box::new(fixed.slow_sqls));
            payloads.push(Box::new(fixed.span_events));
        }
        payloads
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connect_reply::{EventHarvestConfig, HarvestLimits};
    use crate::domain_defs::AgentRunId;
    use crate::metric_names::INSTANCE_REPORTING;
    use crate::metrics::test_util::*;
    use crate::payloads::span_event::SpanCategory;
    use crate::payloads::{AgentAttrs, UserAttrs};
    use crate::payloads::error_event::ErrorData;
    use std::collections::HashMap;

    fn start() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000)
    }

    fn at(secs: u64) -> SystemTime {
        start() + Duration::from_secs(secs)
    }

    fn run_id() -> AgentRunId {
        AgentRunId("run-id".to_owned())
    }

    fn txn_event() -> TransactionEvent {
        TransactionEvent::default()
    }

    fn custom_event() -> CustomEvent {
        CustomEvent::new("myEvent", HashMap::new(), start()).unwrap()
    }

    fn error_event() -> ErrorEvent {
        ErrorEvent {
            data: ErrorData {
                when: start(),
                klass: "klass".to_owned(),
                msg: "msg".to_owned(),
            },
            txn_name: "WebTransaction/zip/zap".to_owned(),
            duration: 1.0,
            user_attrs: UserAttrs {},
            agent_attrs: AgentAttrs::default(),
        }
    }

    fn span_event() -> SpanEvent {
        SpanEvent {
            guid: "guid".to_owned(),
            trace_id: "trace".to_owned(),
            transaction_id: "txn".to_owned(),
            parent_id: None,
            sampled: true,
            priority: Priority(0.5),
            timestamp: start(),
            duration: Duration::from_millis(10),
            name: "span".to_owned(),
            category: SpanCategory::Generic,
            entry_point: true,
        }
    }

    fn error_trace() -> TracedError {
        TracedError {
            data: ErrorData {
                when: start(),
                klass: "klass".to_owned(),
                msg: "msg".to_owned(),
            },
            txn_name: "WebTransaction/zip/zap".to_owned(),
            request_uri: None,
            user_attrs: UserAttrs {},
            agent_attrs: AgentAttrs::default(),
        }
    }

    fn reply_with_period(ms: u32) -> ConnectReply {
        ConnectReply {
            event_harvest_config: EventHarvestConfig {
                report_period_ms: Some(ms),
                harvest_limits: HarvestLimits::default(),
            },
            ..ConnectReply::default()
        }
    }

    const ZERO_COUNT: [f64; 6] = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
    const ONE_COUNT: [f64; 6] = [1.0, 0.0, 0.0, 0.0, 0.0, 0.0];

    #[test]
    fn test_timer_sequence() {
        let mut timer = HarvestTimer::new(Duration::from_secs(10), start());
        assert!(!timer.ready(at(9), false));
        assert!(timer.ready(at(11), false));
        assert!(!timer.ready(at(19), false));
        assert!(timer.ready(at(21), false));
        assert!(!timer.ready(at(29), false));
        assert!(timer.ready(at(31), false));
    }

    #[test]
    fn test_timer_force_resets() {
        let mut timer = HarvestTimer::new(Duration::from_secs(10), start());
        assert!(timer.ready(at(5), true));
        assert!(!timer.ready(at(9), false));
        assert!(timer.ready(at(15), false));
    }

    #[test]
    fn test_nothing_ready() {
        let harvest = Harvest::new(start(), None);
        harvest.record_txn_event(txn_event(), Priority(0.5));
        assert!(harvest.ready(at(30)).is_none());
        // The data stays put for the next due check.
        assert_eq!(harvest.txn_events.lock().num_saved(), 1);
    }

    #[test]
    fn test_configurable_only() {
        let reply = reply_with_period(50_000);
        let harvest = Harvest::new(start(), Some(&reply));
        harvest.record_txn_event(txn_event(), Priority(0.5));
        harvest.record_custom_event(custom_event(), Priority(0.5));
        harvest.record_error_event(error_event(), Priority(0.5));
        harvest.record_span_event(span_event());

        let ready = harvest.ready(at(51)).expect("configurable group due");
        let configurable = ready.configurable.expect("configurable snapshot");
        assert!(ready.fixed.is_none());
        assert_eq!(configurable.txn_events.num_saved(), 1);
        assert_eq!(configurable.custom_events.num_saved(), 1);
        assert_eq!(configurable.error_events.num_saved(), 1);
        // Span events belong to the fixed group and must not move.
        assert_eq!(harvest.span_events.lock().num_saved(), 1);
        // Seen/sent accounting lands in the live metric table.
        let metrics = harvest.metrics.lock();
        expect_metrics(
            &metrics,
            &[
                want(TXN_EVENTS_SEEN, true, ONE_COUNT),
                want(TXN_EVENTS_SENT, true, ONE_COUNT),
                want(CUSTOM_EVENTS_SEEN, true, ONE_COUNT),
                want(CUSTOM_EVENTS_SENT, true, ONE_COUNT),
                want(ERROR_EVENTS_SEEN, true, ONE_COUNT),
                want(ERROR_EVENTS_SENT, true, ONE_COUNT),
            ],
        );
    }

    #[test]
    fn test_fixed_only() {
        let reply = reply_with_period(70_000);
        let harvest = Harvest::new(start(), Some(&reply));
        harvest.record_txn_event(txn_event(), Priority(0.5));
        harvest.record_span_event(span_event());
        harvest.record_error_trace(error_trace());

        let ready = harvest.ready(at(61)).expect("fixed group due");
        assert!(ready.configurable.is_none());
        let fixed = ready.fixed.expect("fixed snapshot");
        assert_eq!(fixed.span_events.num_saved(), 1);
        assert_eq!(fixed.error_traces.len(), 1);
        // Span seen/sent accounting rides along in the detached table.
        expect_metrics(
            &fixed.metrics,
            &[
                want(SPAN_EVENTS_SEEN, true, ONE_COUNT),
                want(SPAN_EVENTS_SENT, true, ONE_COUNT),
            ],
        );
        // The configurable group keeps accumulating.
        assert_eq!(harvest.txn_events.lock().num_saved(), 1);
        assert!(harvest.metrics.lock().is_empty());
    }

    #[test]
    fn test_both_groups_due() {
        let harvest = Harvest::new(start(), None);
        harvest.record_span_event(span_event());

        let ready = harvest.ready(at(61)).expect("both groups due");
        assert!(ready.configurable.is_some());
        let fixed = ready.fixed.expect("fixed snapshot");
        // Configurable accounting is recorded before the table detaches,
        // so all eight supportability metrics travel together.
        expect_metrics(
            &fixed.metrics,
            &[
                want(TXN_EVENTS_SEEN, true, ZERO_COUNT),
                want(TXN_EVENTS_SENT, true, ZERO_COUNT),
                want(CUSTOM_EVENTS_SEEN, true, ZERO_COUNT),
                want(CUSTOM_EVENTS_SENT, true, ZERO_COUNT),
                want(ERROR_EVENTS_SEEN, true, ZERO_COUNT),
                want(ERROR_EVENTS_SENT, true, ZERO_COUNT),
                want(SPAN_EVENTS_SEEN, true, ONE_COUNT),
                want(SPAN_EVENTS_SENT, true, ONE_COUNT),
            ],
        );
        assert!(harvest.ready(at(90)).is_none());
    }

    #[test]
    fn test_caps_from_reply() {
        let reply = ConnectReply {
            event_harvest_config: EventHarvestConfig {
                report_period_ms: None,
                harvest_limits: HarvestLimits {
                    error_event_data: Some(5),
                    ..HarvestLimits::default()
                },
            },
            ..ConnectReply::default()
        };
        let harvest = Harvest::new(start(), Some(&reply));
        for _ in 0..10 {
            harvest.record_error_event(error_event(), Priority::random());
        }
        let errors = harvest.error_events.lock();
        assert_eq!(errors.num_seen(), 10);
        assert_eq!(errors.num_saved(), 5);
    }

    #[test]
    fn test_create_final_metrics_applies_rules() {
        let rules: MetricRules = serde_json::from_str(
            r#"[{"match_expression": "zip", "replacement": "zap"}]"#,
        )
        .unwrap();
        let harvest = Harvest::new(start(), None);
        harvest.record_count_metric("zip", 1.0, MetricForce::Forced);

        let mut ready = harvest.flush(at(1)).unwrap();
        ready.create_final_metrics(Some(&rules));
        let fixed = ready.fixed.as_ref().unwrap();
        assert!(fixed.metrics.get("zap", None).is_some());
        assert!(fixed.metrics.get("zip", None).is_none());
        assert!(fixed.metrics.get(INSTANCE_REPORTING, None).is_some());
    }

    #[test]
    fn test_create_final_metrics_on_empty_snapshot() {
        let mut ready = HarvestReady::default();
        ready.create_final_metrics(None);
        assert_eq!(ready.payloads(true).len(), 0);
    }

    #[test]
    fn test_payloads_from_fresh_harvest() {
        let harvest = Harvest::new(start(), None);
        let ready = harvest.flush(at(1)).unwrap();
        let payloads = ready.payloads(true);
        assert_eq!(payloads.len(), 8);
        for payload in &payloads {
            let data = payload.data(&run_id(), at(1)).unwrap();
            assert!(data.is_none(), "{} not empty", payload.endpoint_method());
        }
    }

    #[test]
    fn test_payload_split() {
        let harvest = Harvest::new(start(), None);
        for _ in 0..MAX_TXN_EVENTS {
            harvest.record_txn_event(txn_event(), Priority::random());
        }
        let ready = harvest.flush(at(1)).unwrap();
        assert_eq!(ready.payloads(true).len(), 9);

        let harvest = Harvest::new(start(), None);
        for _ in 0..MAX_TXN_EVENTS {
            harvest.record_txn_event(txn_event(), Priority::random());
        }
        let ready = harvest.flush(at(1)).unwrap();
        assert_eq!(ready.payloads(false).len(), 8);
    }

    #[test]
    fn test_failed_delivery_merges_back() {
        let harvest = Harvest::new(start(), None);
        harvest.record_count_metric("zip", 1.0, MetricForce::Forced);
        harvest.record_txn_event(txn_event(), Priority(0.5));
        harvest.record_error_trace(error_trace());
        let payloads = harvest.flush(at(60)).unwrap().payloads(true);

        let next = Harvest::new(at(60), None);
        next.record_count_metric("zip", 2.0, MetricForce::Forced);
        for payload in payloads {
            payload.merge_into_harvest(&next);
        }

        let metrics = next.metrics.lock();
        let zip = metrics.get("zip", None).expect("merged metric");
        assert_eq!(zip.data.count_satisfied, 3.0);
        assert_eq!(metrics.period_start(), start());
        assert_eq!(metrics.failed_harvests(), 1);
        drop(metrics);
        assert_eq!(next.txn_events.lock().num_saved(), 1);
        assert_eq!(next.txn_events.lock().failed_harvests(), 1);
        // Traces are never retried.
        assert_eq!(next.error_traces.lock().len(), 0);
    }
}
