use std::time::SystemTime;

use crate::analytics_events::AnalyticsEvents;
use crate::domain_defs::AgentRunId;
use crate::harvest::Harvest;
use crate::payload_creator::{PayloadCreator, PayloadError, CMD_ERROR_EVENTS};
use crate::payloads::error_event::ErrorEvent;
use crate::priority::Priority;

/// Reservoir of error events.
#[derive(Debug)]
pub(crate) struct ErrorEvents {
    events: AnalyticsEvents<ErrorEvent>,
}

impl ErrorEvents {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            events: AnalyticsEvents::new(capacity),
        }
    }

    pub(crate) fn add(&mut self, event: ErrorEvent, priority: Priority) {
        self.events.add(priority, event);
    }

    pub(crate) fn merge_failed(&mut self, other: ErrorEvents) {
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

impl PayloadCreator for ErrorEvents {
    fn endpoint_method(&self) -> &'static str {
        CMD_ERROR_EVENTS
    }

    fn data(
        &self,
        agent_run_id: &AgentRunId,
        _harvest_start: SystemTime,
    ) -> Result<Option<Vec<u8>>, PayloadError> {
        self.events.collector_json(agent_run_id)
    }

    fn merge_into_harvest(self: Box<Self>, harvest: &Harvest) {
        harvest.error_events.lock().merge_failed(*self);
    }
}
