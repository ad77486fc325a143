use serde::ser::SerializeTuple;
use serde::{Serialize, Serializer};
use std::time::SystemTime;

use crate::payloads::{to_unix_millis, AgentAttrs, UserAttrs};

/// What happened, when, and what kind of error it was.  Shared between
/// error events and error traces.
#[derive(Debug, Clone)]
pub struct ErrorData {
    pub when: SystemTime,
    pub klass: String,
    pub msg: String,
}

/// One error event: `[intrinsics, user attrs, agent attrs]`.
#[derive(Debug, Clone)]
pub struct ErrorEvent {
    pub data: ErrorData,
    pub txn_name: String,
    /// Transaction duration in seconds.
    pub duration: f64,
    pub user_attrs: UserAttrs,
    pub agent_attrs: AgentAttrs,
}

impl Serialize for ErrorEvent {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        #[derive(Serialize)]
        struct Intrinsics<'a> {
            #[serde(rename = "type")]
            event_type: &'static str,
            #[serde(rename = "error.class")]
            error_class: &'a str,
            #[serde(rename = "error.message")]
            error_message: &'a str,
            timestamp: i64,
            #[serde(rename = "transactionName")]
            transaction_name: &'a str,
            duration: f64,
        }

        let mut tup = serializer.serialize_tuple(3)?;
        tup.serialize_element(&Intrinsics {
            event_type: "TransactionError",
            error_class: &self.data.klass,
            error_message: &self.data.msg,
            timestamp: to_unix_millis(self.data.when),
            transaction_name: &self.txn_name,
            duration: self.duration,
        })?;
        tup.serialize_element(&self.user_attrs)?;
        tup.serialize_element(&self.agent_attrs)?;
        tup.end()
    }
}
