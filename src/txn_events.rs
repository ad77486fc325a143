use std::time::SystemTime;

use crate::analytics_events::AnalyticsEvents;
use crate::domain_defs::AgentRunId;
use crate::harvest::Harvest;
use crate::limits::TXN_EVENT_PAYLOAD_LIMIT;
use crate::payload_creator::{PayloadCreator, PayloadError, CMD_TXN_EVENTS};
use crate::payloads::analytics_events::TransactionEvent;
use crate::priority::Priority;

/// Reservoir of finished-transaction events.
#[derive(Debug)]
pub(crate) struct TxnEvents {
    events: AnalyticsEvents<TransactionEvent>,
}

impl TxnEvents {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            events: AnalyticsEvents::new(capacity),
        }
    }

    pub(crate) fn add(&mut self, event: TransactionEvent, priority: Priority) {
        self.events.add(priority, event);
    }

    pub(crate) fn merge_failed(&mut self, other: TxnEvents) {
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

    /// Transaction events are the one kind whose requests can outgrow the
    /// per-request limit.  With splitting enabled the surplus is partitioned
    /// into additional payloads; disabled, it is dropped.
    pub(crate) fn into_payloads(mut self, split_large: bool) -> Vec<Box<dyn PayloadCreator>> {
        if self.events.num_saved() <= TXN_EVENT_PAYLOAD_LIMIT {
            return vec![Box::new(self)];
        }
        if split_large {
            self.events
                .split_into(TXN_EVENT_PAYLOAD_LIMIT)
                .into_iter()
                .map(|events| Box::new(TxnEvents { events }) as Box<dyn PayloadCreator>)
                .collect()
        } else {
            self.events.truncate(TXN_EVENT_PAYLOAD_LIMIT);
            vec![Box::new(self)]
        }
    }
}

impl PayloadCreator for TxnEvents {
    fn endpoint_method(&self) -> &'static str {
        CMD_TXN_EVENTS
    }

    fn data(
        &self,
        agent_run_id: &AgentRunId,
        _harvest_start: SystemTime,
    ) -> Result<Option<Vec<u8>>, PayloadError> {
        self.events.collector_json(agent_run_id)
    }

    fn merge_into_harvest(self: Box<Self>, harvest: &Harvest) {
        harvest.txn_events.lock().merge_failed(*self);
    }
}
