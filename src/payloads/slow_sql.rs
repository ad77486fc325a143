use serde::ser::SerializeTuple;
use serde::{Serialize, Serializer};

/// `sql_trace_data` wire format: `[[slow, ...]]` (no agent run id; the
/// collector takes it from the request query).
#[derive(Debug, Clone, Serialize)]
pub(crate) struct CollectorPayload<'a>(pub(crate) (&'a [SlowSQLElement],));

/// One aggregated slow query:
/// `[txn_name, uri, id, query, metric, count, total_ms, min_ms, max_ms]`.
#[derive(Debug, Clone)]
pub(crate) struct SlowSQLElement {
    pub(crate) txn_name: String,
    pub(crate) request_uri: String,
    pub(crate) id: u32,
    pub(crate) query: String,
    pub(crate) metric: String,
    pub(crate) count: u64,
    pub(crate) total_millis: f64,
    pub(crate) min_millis: f64,
    pub(crate) max_millis: f64,
}

impl Serialize for SlowSQLElement {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut tup = serializer.serialize_tuple(9)?;
        tup.serialize_element(&self.txn_name)?;
        tup.serialize_element(&self.request_uri)?;
        tup.serialize_element(&self.id)?;
        tup.serialize_element(&self.query)?;
        tup.serialize_element(&self.metric)?;
        tup.serialize_element(&self.count)?;
        tup.serialize_element(&self.total_millis)?;
        tup.serialize_element(&self.min_millis)?;
        tup.serialize_element(&self.max_millis)?;
        tup.end()
    }
}
