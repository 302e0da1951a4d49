use tracing::{Level, Span};

use super::TickId;

/// Create the root span for one provisioning tick.
pub fn tick_span(tick: &TickId) -> Span {
    tracing::span!(Level::INFO, "tick", tick_id = %tick)
}
