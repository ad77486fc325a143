use std::time::SystemTime;

use crate::analytics_events::AnalyticsEvents;
use crate::domain_defs::AgentRunId;
use crate::harvest::Harvest;
use crate::payload_creator::{PayloadCreator, PayloadError, CMD_CUSTOM_EVENTS};
use crate::payloads::custom_event::CustomEvent;
use crate::priority::Priority;

/// Reservoir of producer-defined events.
#[derive(Debug)]
pub(crate) struct CustomEvents {
    events: AnalyticsEvents<CustomEvent>,
}

impl CustomEvents {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            events: AnalyticsEvents::new(capacity),
        }
    }

    pub(crate) fn add(&mut self, event: CustomEvent, priority: Priority) {
        self.events.add(priority, event);
    }

    pub(crate) fn merge_failed(&mut self, other: CustomEvents) {
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

impl PayloadCreator for CustomEvents {
    fn endpoint_method(&self) -> &'static str {
        CMD_CUSTOM_EVENTS
    }

    fn data(
        &self,
        agent_run_id: &AgentRunId,
        _harvest_start: SystemTime,
    ) -> Result<Option<Vec<u8>>, PayloadError> {
        self.events.collector_json(agent_run_id)
    }

    fn merge_into_harvest(self: Box<Self>, harvest: &Harvest) {
        harvest.custom_events.lock().merge_failed(*self);
    }
}
