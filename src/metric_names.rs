// Copyright 2020 New Relic Corporation. (for the original go-agent)
// Copyright 2020 Masaki Hara.

const WEB_ROLLUP: &str = "WebTransaction";
const BACKGROUND_ROLLUP: &str = "OtherTransaction/all";

const TOTAL_TIME_WEB: &str = "WebTransactionTotalTime";
const TOTAL_TIME_BACKGROUND: &str = "OtherTransactionTotalTime";

pub(crate) const APDEX_ROLLUP: &str = "Apdex";
pub(crate) const APDEX_PREFIX: &str = "Apdex/";

pub(crate) const ERRORS_PREFIX: &str = "Errors/";

// "HttpDispatcher" metric is used for the overview graph, and
// therefore should only be made for web transactions.
pub(crate) const DISPATCHER_METRIC: &str = "HttpDispatcher";

pub(crate) const INSTANCE_REPORTING: &str = "Instance/Reporting";

pub(crate) const SUPPORTABILITY_DROPPED: &str = "Supportability/MetricsDropped";

pub(crate) const CUSTOM_EVENTS_SEEN: &str = "Supportability/Events/Customer/Seen";
pub(crate) const CUSTOM_EVENTS_SENT: &str = "Supportability/Events/Customer/Sent";
pub(crate) const TXN_EVENTS_SEEN: &str = "Supportability/AnalyticsEvents/TotalEventsSeen";
pub(crate) const TXN_EVENTS_SENT: &str = "Supportability/AnalyticsEvents/TotalEventsSent";
pub(crate) const ERROR_EVENTS_SEEN: &str = "Supportability/Events/TransactionError/Seen";
pub(crate) const ERROR_EVENTS_SENT: &str = "Supportability/Events/TransactionError/Sent";
pub(crate) const SPAN_EVENTS_SEEN: &str = "Supportability/SpanEvent/TotalEventsSeen";
pub(crate) const SPAN_EVENTS_SENT: &str = "Supportability/SpanEvent/TotalEventsSent";

pub(crate) fn rollup_name(is_web: bool) -> &'static str {
    if is_web {
        WEB_ROLLUP
    } else {
        BACKGROUND_ROLLUP
    }
}

pub(crate) fn remove_first_segment(name: &str) -> &str {
    if let Some(pos) = name.find('/') {
        &name[pos + 1..]
    } else {
        name
    }
}

pub(crate) fn total_time_name(name: &str, is_web: bool) -> String {
    format!(
        "{}/{}",
        total_time_rollup_name(is_web),
        remove_first_segment(name)
    )
}

pub(crate) fn total_time_rollup_name(is_web: bool) -> &'static str {
    if is_web {
        TOTAL_TIME_WEB
    } else {
        TOTAL_TIME_BACKGROUND
    }
}

/// A metric reported both as `<name>/all` and as `<name>/allWeb` or
/// `<name>/allOther` depending on the transaction kind.
#[derive(Debug, Clone)]
pub(crate) struct RollupMetric {
    pub(crate) all: String,
    web: String,
    other: String,
}

impl RollupMetric {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            all: format!("{}/all", name),
            web: format!("{}/allWeb", name),
            other: format!("{}/allOther", name),
        }
    }

    pub(crate) fn web_or_other(&self, is_web: bool) -> &str {
        if is_web {
            &self.web
        } else {
            &self.other
        }
    }
}

pub(crate) fn errors_rollup_metric() -> RollupMetric {
    RollupMetric::new("Errors")
}
