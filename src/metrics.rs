// Copyright 2020 New Relic Corporation. (for the original go-agent)
// Copyright 2020 Masaki Hara.

use log::warn;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use crate::apdex::ApdexZone;
use crate::domain_defs::AgentRunId;
use crate::harvest::Harvest;
use crate::limits::{FAILED_METRIC_ATTEMPTS_LIMIT, MAX_METRICS};
use crate::metric_names::{INSTANCE_REPORTING, SUPPORTABILITY_DROPPED};
use crate::metric_rules::MetricRules;
use crate::payload_creator::{PayloadCreator, PayloadError, CMD_METRICS};
use crate::payloads::metrics::{CollectorPayload, MetricId};
use crate::payloads::to_unix_secs;

/// Whether a sample may create a new table entry past the capacity limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricForce {
    Forced,
    Unforced,
}

/// The six aggregation slots of one metric.  The first three double as the
/// satisfied/tolerated/failed buckets for apdex metrics, hence the names.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricData {
    pub count_satisfied: f64,
    pub total_tolerated: f64,
    pub exclusive_failed: f64,
    pub min: f64,
    pub max: f64,
    pub sum_squares: f64,
}

impl MetricData {
    pub(crate) fn from_count(count: f64) -> Self {
        Self {
            count_satisfied: count,
            total_tolerated: 0.0,
            exclusive_failed: 0.0,
            min: 0.0,
            max: 0.0,
            sum_squares: 0.0,
        }
    }

    pub(crate) fn from_value(value: f64) -> Self {
        Self {
            count_satisfied: 1.0,
            total_tolerated: value,
            exclusive_failed: value,
            min: value,
            max: value,
            sum_squares: value * value,
        }
    }

    pub(crate) fn from_duration(duration: Duration, exclusive: Duration) -> Self {
        let secs = duration.as_secs_f64();
        Self {
            count_satisfied: 1.0,
            total_tolerated: secs,
            exclusive_failed: exclusive.as_secs_f64(),
            min: secs,
            max: secs,
            sum_squares: secs * secs,
        }
    }

    pub(crate) fn from_apdex(zone: ApdexZone, threshold: Duration) -> Self {
        let secs = threshold.as_secs_f64();
        let bucket = |z| if zone == z { 1.0 } else { 0.0 };
        Self {
            count_satisfied: bucket(ApdexZone::Satisfying),
            total_tolerated: bucket(ApdexZone::Tolerating),
            exclusive_failed: bucket(ApdexZone::Failing),
            min: secs,
            max: secs,
            sum_squares: 0.0,
        }
    }

    fn aggregate(&mut self, other: &MetricData) {
        self.count_satisfied += other.count_satisfied;
        self.total_tolerated += other.total_tolerated;
        self.exclusive_failed += other.exclusive_failed;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.sum_squares += other.sum_squares;
    }
}

impl Serialize for MetricData {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeTuple;

        let mut tup = serializer.serialize_tuple(6)?;
        tup.serialize_element(&self.count_satisfied)?;
        tup.serialize_element(&self.total_tolerated)?;
        tup.serialize_element(&self.exclusive_failed)?;
        tup.serialize_element(&self.min)?;
        tup.serialize_element(&self.max)?;
        tup.serialize_element(&self.sum_squares)?;
        tup.end()
    }
}

impl<'de> Deserialize<'de> for MetricData {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let tup = <(_, _, _, _, _, _)>::deserialize(deserializer)?;
        Ok(Self {
            count_satisfied: tup.0,
            total_tolerated: tup.1,
            exclusive_failed: tup.2,
            min: tup.3,
            max: tup.4,
            sum_squares: tup.5,
        })
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Metric {
    pub(crate) forced: bool,
    pub(crate) data: MetricData,
}

/// Aggregated metric statistics for one reporting period.
///
/// Unforced metrics past `max_table_size` unique names are dropped (and
/// counted); forced metrics always land.  Existing names are always
/// mergeable regardless of capacity.
#[derive(Debug, Clone)]
pub struct MetricTable {
    period_start: SystemTime,
    failed_harvests: u32,
    max_table_size: usize,
    num_dropped: u64,
    metrics: HashMap<MetricId, Metric>,
}

impl MetricTable {
    pub fn new(max_table_size: usize, period_start: SystemTime) -> Self {
        Self {
            period_start,
            failed_harvests: 0,
            max_table_size,
            num_dropped: 0,
            metrics: HashMap::new(),
        }
    }

    pub(crate) fn with_default_capacity(period_start: SystemTime) -> Self {
        Self::new(MAX_METRICS, period_start)
    }

    fn full(&self) -> bool {
        self.metrics.len() >= self.max_table_size
    }

    fn merge_metric(&mut self, id: MetricId, metric: Metric) {
        let full = self.full();
        match self.metrics.entry(id) {
            Entry::Occupied(mut occupied) => {
                occupied.get_mut().data.aggregate(&metric.data);
            }
            Entry::Vacant(vacant) => {
                if full && !metric.forced {
                    self.num_dropped += 1;
                } else {
                    vacant.insert(metric);
                }
            }
        }
    }

    pub fn add(&mut self, name: &str, scope: Option<&str>, data: MetricData, force: MetricForce) {
        let id = MetricId {
            name: name.to_owned(),
            scope: scope.map(str::to_owned),
        };
        self.merge_metric(
            id,
            Metric {
                forced: force == MetricForce::Forced,
                data,
            },
        );
    }

    pub fn add_count(&mut self, name: &str, count: f64, force: MetricForce) {
        self.add(name, None, MetricData::from_count(count), force);
    }

    pub fn add_single_count(&mut self, name: &str, force: MetricForce) {
        self.add_count(name, 1.0, force);
    }

    pub fn add_value(&mut self, name: &str, value: f64, force: MetricForce) {
        self.add(name, None, MetricData::from_value(value), force);
    }

    pub fn add_duration(
        &mut self,
        name: &str,
        scope: Option<&str>,
        duration: Duration,
        exclusive: Duration,
        force: MetricForce,
    ) {
        self.add(name, scope, MetricData::from_duration(duration, exclusive), force);
    }

    pub fn add_apdex(
        &mut self,
        name: &str,
        threshold: Duration,
        zone: ApdexZone,
        force: MetricForce,
    ) {
        self.add(name, None, MetricData::from_apdex(zone, threshold), force);
    }

    pub(crate) fn merge(&mut self, from: MetricTable) {
        for (id, metric) in from.metrics {
            self.merge_metric(id, metric);
        }
    }

    /// Re-injects a table whose delivery failed.  The period start becomes
    /// the earliest of the two so no accumulation window is ever lost.
    pub(crate) fn merge_failed(&mut self, from: MetricTable) {
        let fails = from.failed_harvests() + 1;
        if fails > FAILED_METRIC_ATTEMPTS_LIMIT {
            warn!(
                "dropping {} metrics after {} failed delivery attempts",
                from.metrics.len(),
                fails
            );
            return;
        }
        if from.period_start < self.period_start {
            self.period_start = from.period_start;
        }
        self.failed_harvests = fails;
        self.merge(from);
    }

    fn apply_rules(self, rules: &MetricRules) -> MetricTable {
        if rules.is_empty() {
            return self;
        }
        let mut applied = MetricTable::new(self.max_table_size, self.period_start);
        applied.failed_harvests = self.failed_harvests;
        applied.num_dropped = self.num_dropped;
        for (id, metric) in self.metrics {
            let id = match rules.apply(&id.name) {
                Some(name) => MetricId {
                    name,
                    scope: id.scope,
                },
                None => id,
            };
            applied.merge_metric(id, metric);
        }
        applied
    }

    /// Final bookkeeping before serialization: the forced reporting metric,
    /// the dropped-metrics count, then the rename pass.  Renamed entries
    /// collapse into pre-existing ones with merge semantics.
    pub fn create_final_metrics(&mut self, rules: Option<&MetricRules>) {
        self.add_single_count(INSTANCE_REPORTING, MetricForce::Forced);
        let dropped = self.num_dropped();
        if dropped > 0 {
            self.add_count(SUPPORTABILITY_DROPPED, dropped as f64, MetricForce::Forced);
        }
        if let Some(rules) = rules {
            if !rules.is_empty() {
                let table = std::mem::replace(
                    self,
                    MetricTable::new(0, SystemTime::UNIX_EPOCH),
                );
                *self = table.apply_rules(rules);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub(crate) fn period_start(&self) -> SystemTime {
        self.period_start
    }

    pub(crate) fn failed_harvests(&self) -> u32 {
        self.failed_harvests
    }

    pub(crate) fn num_dropped(&self) -> u64 {
        self.num_dropped
    }

    #[cfg(test)]
    pub(crate) fn get(&self, name: &str, scope: Option<&str>) -> Option<&Metric> {
        let id = MetricId {
            name: name.to_owned(),
            scope: scope.map(str::to_owned),
        };
        self.metrics.get(&id)
    }
}

impl PayloadCreator for MetricTable {
    fn endpoint_method(&self) -> &'static str {
        CMD_METRICS
    }

    fn data(
        &self,
        agent_run_id: &AgentRunId,
        harvest_start: SystemTime,
    ) -> Result<Option<Vec<u8>>, PayloadError> {
        if self.is_empty() {
            return Ok(None);
        }
        let payload = CollectorPayload {
            agent_run_id: agent_run_id.clone(),
            start: to_unix_secs(self.period_start()),
            end: to_unix_secs(harvest_start),
            metrics: self
                .metrics
                .iter()
                .map(|(id, metric)| (id.clone(), metric.data))
                .collect(),
        };
        Ok(Some(serde_json::to_vec(&payload)?))
    }

    fn merge_into_harvest(self: Box<Self>, harvest: &Harvest) {
        harvest.metrics.lock().merge_failed(*self);
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;

    /// One expected table entry: name, forced flag, and (optionally) the six
    /// aggregation slots.
    pub(crate) struct WantMetric {
        pub(crate) name: &'static str,
        pub(crate) forced: bool,
        pub(crate) data: Option<[f64; 6]>,
    }

    pub(crate) fn want(name: &'static str, forced: bool, data: [f64; 6]) -> WantMetric {
        WantMetric {
            name,
            forced,
            data: Some(data),
        }
    }

    pub(crate) fn want_present(name: &'static str, forced: bool) -> WantMetric {
        WantMetric {
            name,
            forced,
            data: None,
        }
    }

    /// Asserts the table holds exactly `want` (unscoped names).
    pub(crate) fn expect_metrics(table: &MetricTable, want: &[WantMetric]) {
        assert_eq!(
            table.len(),
            want.len(),
            "metric table: {:#?}",
            table.metrics.keys().collect::<Vec<_>>()
        );
        for w in want {
            let metric = table
                .get(w.name, None)
                .unwrap_or_else(|| panic!("metric {:?} missing", w.name));
            assert_eq!(metric.forced, w.forced, "forced flag on {:?}", w.name);
            if let Some(data) = w.data {
                let got = [
                    metric.data.count_satisfied,
                    metric.data.total_tolerated,
                    metric.data.exclusive_failed,
                    metric.data.min,
                    metric.data.max,
                    metric.data.sum_squares,
                ];
                assert_eq!(got, data, "data on {:?}", w.name);
            }
        }
    }
}
