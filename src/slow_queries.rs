use log::debug;
use std::time::{Duration, SystemTime};

use crate::domain_defs::AgentRunId;
use crate::harvest::Harvest;
use crate::limits::MAX_SLOW_SQLS;
use crate::payload_creator::{PayloadCreator, PayloadError, CMD_SLOW_SQLS};
use crate::payloads::slow_sql::{CollectorPayload, SlowSQLElement};

/// One observation of a slow query, as produced by instrumentation.
#[derive(Debug, Clone)]
pub struct SlowQueryInstance {
    /// Stable hash of the obfuscated query text; observations with the same
    /// id aggregate into one entry.
    pub id: u32,
    pub query: String,
    pub datastore_metric: String,
    pub txn_name: String,
    pub request_uri: Option<String>,
    pub duration: Duration,
}

#[derive(Debug)]
struct SlowQuery {
    instance: SlowQueryInstance,
    count: u64,
    total: Duration,
    min: Duration,
    max: Duration,
}

impl SlowQuery {
    fn new(instance: SlowQueryInstance) -> Self {
        let duration = instance.duration;
        Self {
            instance,
            count: 1,
            total: duration,
            min: duration,
            max: duration,
        }
    }

    fn aggregate(&mut self, instance: SlowQueryInstance) {
        self.count += 1;
        self.total += instance.duration;
        self.min = self.min.min(instance.duration);
        self.max = self.max.max(instance.duration);
        // Keep the slowest observation's text and transaction.
        if instance.duration >= self.instance.duration {
            self.instance = instance;
        }
    }
}

/// Slow-query aggregation for one cycle: keyed by query id, capped, keeping
/// the slowest queries when over capacity.
#[derive(Debug)]
pub(crate) struct SlowQueries {
    queries: Vec<SlowQuery>,
}

impl SlowQueries {
    pub(crate) fn new() -> Self {
        Self {
            queries: Vec::with_capacity(MAX_SLOW_SQLS),
        }
    }

    pub(crate) fn observe(&mut self, instance: SlowQueryInstance) {
        if let Some(existing) = self.queries.iter_mut().find(|q| q.instance.id == instance.id) {
            existing.aggregate(instance);
            return;
        }
        if self.queries.len() < MAX_SLOW_SQLS {
            self.queries.push(SlowQuery::new(instance));
            return;
        }
        // Full: the new query competes with the fastest held one.
        if let Some((i, _)) = self
            .queries
            .iter()
            .enumerate()
            .min_by_key(|(_, q)| q.max)
        {
            if self.queries[i].max < instance.duration {
                self.queries[i] = SlowQuery::new(instance);
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.queries.len()
    }
}

impl PayloadCreator for SlowQueries {
    fn endpoint_method(&self) -> &'static str {
        CMD_SLOW_SQLS
    }

    fn data(
        &self,
        _agent_run_id: &AgentRunId,
        _harvest_start: SystemTime,
    ) -> Result<Option<Vec<u8>>, PayloadError> {
        if self.queries.is_empty() {
            return Ok(None);
        }
        let millis = |d: Duration| d.as_secs_f64() * 1000.0;
        let elements: Vec<SlowSQLElement> = self
            .queries
            .iter()
            .map(|q| SlowSQLElement {
                txn_name: q.instance.txn_name.clone(),
                request_uri: q.instance.request_uri.clone().unwrap_or_default(),
                id: q.instance.id,
                query: q.instance.query.clone(),
                metric: q.instance.datastore_metric.clone(),
                count: q.count,
                total_millis: millis(q.total),
                min_millis: millis(q.min),
                max_millis: millis(q.max),
            })
            .collect();
        let payload = CollectorPayload((&elements,));
        Ok(Some(serde_json::to_vec(&payload)?))
    }

    fn merge_into_harvest(self: Box<Self>, _harvest: &Harvest) {
        debug!("discarding {} slow queries from a failed delivery", self.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(id: u32, secs: u64) -> SlowQueryInstance {
        SlowQueryInstance {
            id,
            query: format!("SELECT * FROM t{}", id),
            datastore_metric: "Datastore/statement/MySQL/t/select".to_owned(),
            txn_name: "WebTransaction/zip/zap".to_owned(),
            request_uri: None,
            duration: Duration::from_secs(secs),
        }
    }

    #[test]
    fn test_same_id_aggregates() {
        let mut slows = SlowQueries::new();
        slows.observe(instance(1, 2));
        slows.observe(instance(1, 4));
        assert_eq!(slows.len(), 1);
        let q = &slows.queries[0];
        assert_eq!(q.count, 2);
        assert_eq!(q.total, Duration::from_secs(6));
        assert_eq!(q.min, Duration::from_secs(2));
        assert_eq!(q.max, Duration::from_secs(4));
    }

    #[test]
    fn test_capped_keeps_slowest() {
        let mut slows = SlowQueries::new();
        for i in 0..MAX_SLOW_SQLS as u32 {
            slows.observe(instance(i, 10 + u64::from(i)));
        }
        // Faster than everything held: rejected.
        slows.observe(instance(1000, 1));
        assert_eq!(slows.len(), MAX_SLOW_SQLS);
        assert!(slows.queries.iter().all(|q| q.instance.id != 1000));
        // Slower than the fastest held: replaces it.
        slows.observe(instance(2000, 100));
        assert!(slows.queries.iter().any(|q| q.instance.id == 2000));
        assert!(slows.queries.iter().all(|q| q.instance.id != 0));
    }
}
