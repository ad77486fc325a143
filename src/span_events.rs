use std::time::SystemTime;

use crate::analytics_events::AnalyticsEvents;
use crate::domain_defs::AgentRunId;
use crate::harvest::Harvest;
use crate::payload_creator::{PayloadCreator, PayloadError, CMD_SPAN_EVENTS};
use crate::payloads::span_event::SpanEvent;

/// Reservoir of span events.  Unlike the other event kinds, a span carries
/// its own sampling priority (inherited from the trace's sampling decision),
/// so `add` takes no separate weight.
#[derive(Debug)]
pub(crate) struct SpanEvents {
    events: AnalyticsEvents<SpanEvent>,
}

impl SpanEvents {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            events: AnalyticsEvents::new(capacity),
        }
    }

    pub(crate) fn add(&mut self, event: SpanEvent) {
        self.events.add(event.priority, event);
    }

    pub(crate) fn merge_failed(&mut self, other: SpanEvents) {
        self.events.merge_failed(other.events);
    }

    pub(crate) fn num_seen(&self) -> u64 {
        self.events.num_seen()
    }

    pub(crate) fn num_saved(&self) -> usize {
        self.events.num_saved()
    }

    #[cfg(test)]
    pub(crate) fn failed_harvests(&self) -> u32 {
        self.events.failed_harvests()
    }
}

impl PayloadCreator for SpanEvents {
    fn endpoint_method(&self) -> &'static str {
        CMD_SPAN_EVENTS
    }

    fn data(
        &self,
        agent_run_id: &AgentRunId,
        _harvest_start: SystemTime,
    ) -> Result<Option<Vec<u8>>, PayloadError> {
        self.events.collector_json(agent_run_id)
    }

    fn merge_into_harvest(self: Box<Self>, harvest: &Harvest) {
        harvest.span_events.lock().merge_failed(*self);
    }
}
