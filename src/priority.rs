use serde::{Deserialize, Serialize};

/// Sampling weight attached to an event.  Only used to arbitrate reservoir
/// eviction; never reported as an attribute of the data itself (span events
/// being the one exception, where the wire format carries it).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(pub f32);

impl Priority {
    /// A uniform random weight in `[0, 1)`, the default for producers that
    /// have no distributed-tracing priority to inherit.
    pub fn random() -> Self {
        Priority(rand::random::<f32>())
    }

    pub(crate) fn is_lower_priority(self, other: Priority) -> bool {
        self.0 < other.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority(0.0)
    }
}
