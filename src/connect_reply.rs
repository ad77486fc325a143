// Copyright 2020 New Relic Corporation. (for the original go-agent)
// Copyright 2020 Masaki Hara.

use serde::Deserialize;
use std::time::Duration;

use crate::domain_defs::AgentRunId;
use crate::limits::{
    DEFAULT_CONFIGURABLE_EVENT_HARVEST, MAX_CONFIGURABLE_PERIOD, MIN_CONFIGURABLE_PERIOD,
};
use crate::metric_rules::MetricRules;

/// The subset of the connect handshake reply that drives harvesting.
/// Every field degrades to a documented default when absent, and a missing
/// reply altogether (`None` at `Harvest::new`) behaves like
/// `ConnectReply::default()`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectReply {
    #[serde(default)]
    pub agent_run_id: Option<AgentRunId>,

    #[serde(default)]
    pub metric_name_rules: MetricRules,

    #[serde(default)]
    pub event_harvest_config: EventHarvestConfig,

    /// BetterCAT / distributed tracing enablement.
    #[serde(default)]
    pub distributed_tracing_enabled: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventHarvestConfig {
    #[serde(default)]
    pub report_period_ms: Option<u32>,
    #[serde(default)]
    pub harvest_limits: HarvestLimits,
}

impl EventHarvestConfig {
    /// The configurable group's period, clamped to sane bounds.
    pub(crate) fn report_period(&self) -> Duration {
        let period = self
            .report_period_ms
            .map(|ms| Duration::from_millis(u64::from(ms)))
            .unwrap_or(DEFAULT_CONFIGURABLE_EVENT_HARVEST);
        period.clamp(MIN_CONFIGURABLE_PERIOD, MAX_CONFIGURABLE_PERIOD)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HarvestLimits {
    #[serde(default)]
    pub analytic_event_data: Option<u32>,
    #[serde(default)]
    pub custom_event_data: Option<u32>,
    #[serde(default)]
    pub error_event_data: Option<u32>,
    #[serde(default)]
    pub span_event_data: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_defaults_and_clamping() {
        let mut config = EventHarvestConfig::default();
        assert_eq!(config.report_period(), DEFAULT_CONFIGURABLE_EVENT_HARVEST);
        config.report_period_ms = Some(50_000);
        assert_eq!(config.report_period(), Duration::from_secs(50));
        config.report_period_ms = Some(0);
        assert_eq!(config.report_period(), MIN_CONFIGURABLE_PERIOD);
        config.report_period_ms = Some(10_000_000);
        assert_eq!(config.report_period(), MAX_CONFIGURABLE_PERIOD);
    }

    #[test]
    fn test_deserialize_with_absent_fields() {
        let reply: ConnectReply = serde_json::from_str(
            r#"{"event_harvest_config": {"harvest_limits": {"error_event_data": 7}}}"#,
        )
        .unwrap();
        assert!(reply.agent_run_id.is_none());
        assert!(reply.metric_name_rules.is_empty());
        assert_eq!(reply.event_harvest_config.harvest_limits.error_event_data, Some(7));
        assert!(!reply.distributed_tracing_enabled);
    }
}
