use serde::{Deserialize, Serialize};

/// Default number of distinct buffers a plan may touch: both user buffers and every temporary.
pub const DEFAULT_BUFFER_BUDGET: usize = 5;

/// Knobs of the buffer assignment search.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssignmentConfig {
    /// Upper bound on the distinct buffers of an accepted assignment.
    pub buffer_budget: usize,
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        Self {
            buffer_budget: DEFAULT_BUFFER_BUDGET,
        }
    }
}
