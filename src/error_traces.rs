use log::debug;
use std::time::SystemTime;

use crate::domain_defs::AgentRunId;
use crate::harvest::Harvest;
use crate::limits::MAX_HARVEST_ERRORS;
use crate::payload_creator::{PayloadCreator, PayloadError, CMD_ERROR_DATA};
use crate::payloads::error_trace::{CollectorPayload, TracedError};

/// Error traces for one cycle.  First-come-kept up to the cap; unlike the
/// event reservoirs these are diagnostic data and are dropped outright when
/// a delivery fails.
#[derive(Debug)]
pub(crate) struct HarvestErrors {
    errors: Vec<TracedError>,
}

impl HarvestErrors {
    pub(crate) fn new() -> Self {
        Self {
            errors: Vec::with_capacity(MAX_HARVEST_ERRORS),
        }
    }

    pub(crate) fn push(&mut self, error: TracedError) {
        if self.errors.len() < MAX_HARVEST_ERRORS {
            self.errors.push(error);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.errors.len()
    }
}

impl PayloadCreator for HarvestErrors {
    fn endpoint_method(&self) -> &'static str {
        CMD_ERROR_DATA
    }

    fn data(
        &self,
        agent_run_id: &AgentRunId,
        _harvest_start: SystemTime,
    ) -> Result<Option<Vec<u8>>, PayloadError> {
        if self.errors.is_empty() {
            return Ok(None);
        }
        let payload = CollectorPayload(agent_run_id, &self.errors);
        Ok(Some(serde_json::to_vec(&payload)?))
    }

    fn merge_into_harvest(self: Box<Self>, _harvest: &Harvest) {
        debug!("discarding {} error traces from a failed delivery", self.len());
    }
}
