use log::debug;
use std::time::SystemTime;

use crate::domain_defs::AgentRunId;
use crate::harvest::Harvest;
use crate::limits::MAX_REGULAR_TRACES;
use crate::payload_creator::{PayloadCreator, PayloadError, CMD_TXN_TRACES};
use crate::payloads::transaction_trace::{CollectorPayload, TransactionTrace};

/// Transaction traces for one cycle.
#[derive(Debug, Clone)]
pub(crate) struct HarvestTraces {
    // We don't use VecDeque because the number of elements is reasonably low.
    regular: Vec<TransactionTrace>,
}

impl HarvestTraces {
    pub(crate) fn new() -> Self {
        Self {
            regular: Vec::with_capacity(MAX_REGULAR_TRACES),
        }
    }

    /// Keeps at most the cap, evicting the fastest held trace when a slower
    /// one arrives.
    pub(crate) fn push(&mut self, trace: TransactionTrace) {
        if self.regular.len() < MAX_REGULAR_TRACES {
            self.regular.push(trace);
            return;
        }
        let fastest = self
            .regular
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                a.duration_millis()
                    .partial_cmp(&b.duration_millis())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i);
        if let Some(i) = fastest {
            if self.regular[i].duration_millis() < trace.duration_millis() {
                self.regular[i] = trace;
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.regular.len()
    }
}

impl PayloadCreator for HarvestTraces {
    fn endpoint_method(&self) -> &'static str {
        CMD_TXN_TRACES
    }

    fn data(
        &self,
        agent_run_id: &AgentRunId,
        _harvest_start: SystemTime,
    ) -> Result<Option<Vec<u8>>, PayloadError> {
        if self.regular.is_empty() {
            return Ok(None);
        }
        let payload = CollectorPayload(agent_run_id, &self.regular);
        Ok(Some(serde_json::to_vec(&payload)?))
    }

    fn merge_into_harvest(self: Box<Self>, _harvest: &Harvest) {
        debug!(
            "discarding {} transaction traces from a failed delivery",
            self.len()
        );
    }
}
