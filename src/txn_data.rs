// Copyright 2020 New Relic Corporation. (for the original go-agent)
// Copyright 2020 Masaki Hara.

use std::time::Duration;

use crate::apdex::ApdexZone;
use crate::metric_names::{
    errors_rollup_metric, remove_first_segment, rollup_name, total_time_name,
    total_time_rollup_name, RollupMetric, APDEX_PREFIX, APDEX_ROLLUP, DISPATCHER_METRIC,
    ERRORS_PREFIX,
};
use crate::metrics::{MetricForce, MetricTable};
use crate::payloads::error_event::ErrorData;

/// Caller attribution for distributed tracing ("BetterCAT").  Unresolved
/// dimensions are reported as `"Unknown"`.
#[derive(Debug, Clone, Default)]
pub struct BetterCat {
    pub enabled: bool,
    pub caller_type: Option<String>,
    pub caller_account: Option<String>,
    pub caller_app: Option<String>,
    pub transport_type: Option<String>,
}

impl BetterCat {
    fn caller_metric(&self, prefix: &str) -> RollupMetric {
        let unknown = |dim: &Option<String>| match dim {
            Some(s) => s.clone(),
            None => "Unknown".to_owned(),
        };
        RollupMetric::new(&format!(
            "{}/{}/{}/{}/{}",
            prefix,
            unknown(&self.caller_type),
            unknown(&self.caller_account),
            unknown(&self.caller_app),
            unknown(&self.transport_type),
        ))
    }
}

/// Everything metrics derivation needs to know about one finished
/// transaction.  Consumed once; never retained by the harvest.
#[derive(Debug, Clone, Default)]
pub struct TxnData {
    pub final_name: String,
    pub is_web: bool,
    pub duration: Duration,
    pub total_time: Duration,
    pub apdex_threshold: Duration,
    pub zone: Option<ApdexZone>,
    pub errors: Vec<ErrorData>,
    pub better_cat: BetterCat,
}

impl TxnData {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Derives the standard metric set for one finished transaction.  Pure:
/// the same input always produces the same additions to `metrics`.
pub fn create_txn_metrics(txn: &TxnData, metrics: &mut MetricTable) {
    use MetricForce::{Forced, Unforced};

    let exclusive_zero = Duration::from_secs(0);
    metrics.add_duration(&txn.final_name, None, txn.duration, exclusive_zero, Forced);
    metrics.add_duration(rollup_name(txn.is_web), None, txn.duration, exclusive_zero, Forced);
    if txn.is_web {
        metrics.add_duration(DISPATCHER_METRIC, None, txn.duration, exclusive_zero, Forced);
    }

    let total_time = txn.total_time.as_secs_f64();
    metrics.add_value(total_time_rollup_name(txn.is_web), total_time, Forced);
    metrics.add_value(&total_time_name(&txn.final_name, txn.is_web), total_time, Unforced);

    if txn.has_errors() {
        let errors = errors_rollup_metric();
        metrics.add_single_count(&errors.all, Forced);
        metrics.add_single_count(errors.web_or_other(txn.is_web), Forced);
        metrics.add_single_count(&format!("{}{}", ERRORS_PREFIX, txn.final_name), Forced);
    }

    if let Some(zone) = txn.zone {
        metrics.add_apdex(APDEX_ROLLUP, txn.apdex_threshold, zone, Forced);
        let name = format!("{}{}", APDEX_PREFIX, remove_first_segment(&txn.final_name));
        metrics.add_apdex(&name, txn.apdex_threshold, zone, Unforced);
    }

    if txn.better_cat.enabled {
        let duration_by_caller = txn.better_cat.caller_metric("DurationByCaller");
        metrics.add_duration(&duration_by_caller.all, None, txn.duration, txn.duration, Unforced);
        metrics.add_duration(
            duration_by_caller.web_or_other(txn.is_web),
            None,
            txn.duration,
            txn.duration,
            Unforced,
        );
        if txn.has_errors() {
            let errors_by_caller = txn.better_cat.caller_metric("ErrorsByCaller");
            metrics.add_single_count(&errors_by_caller.all, Unforced);
            metrics.add_single_count(errors_by_caller.web_or_other(txn.is_web), Unforced);
        }
    }
}
