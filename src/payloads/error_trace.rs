use serde::ser::SerializeTuple;
use serde::{Serialize, Serializer};

use crate::domain_defs::AgentRunId;
use crate::payloads::error_event::ErrorData;
use crate::payloads::to_unix_millis;
use crate::payloads::{AgentAttrs, UserAttrs};

/// `error_data` wire format: `[agent_run_id, [error, ...]]`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct CollectorPayload<'a>(pub(crate) &'a AgentRunId, pub(crate) &'a [TracedError]);

/// One error trace:
/// `[when_millis, txn_name, message, class, {attributes}]`.
#[derive(Debug, Clone)]
pub struct TracedError {
    pub data: ErrorData,
    pub txn_name: String,
    pub request_uri: Option<String>,
    pub user_attrs: UserAttrs,
    pub agent_attrs: AgentAttrs,
}

impl Serialize for TracedError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Attributes<'a> {
            agent_attributes: &'a AgentAttrs,
            user_attributes: &'a UserAttrs,
            #[serde(skip_serializing_if = "Option::is_none")]
            request_uri: Option<&'a str>,
        }

        let mut tup = serializer.serialize_tuple(5)?;
        tup.serialize_element(&to_unix_millis(self.data.when))?;
        tup.serialize_element(&self.txn_name)?;
        tup.serialize_element(&self.data.msg)?;
        tup.serialize_element(&self.data.klass)?;
        tup.serialize_element(&Attributes {
            agent_attributes: &self.agent_attrs,
            user_attributes: &self.user_attrs,
            request_uri: self.request_uri.as_deref(),
        })?;
        tup.end()
    }
}
