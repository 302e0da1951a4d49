use std::fmt;

use uuid::Uuid;

/// Correlation ID that follows one pass of the provisioning loop, so all
/// log lines of a tick can be grouped after the fact.
#[derive(Clone, Debug)]
pub struct TickId(Uuid);

impl TickId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TickId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TickId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_hyphenated())
    }
}
