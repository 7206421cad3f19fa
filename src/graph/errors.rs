//! Fatal error taxonomy for graph generation.
//!
//! Non-fatal conditions (a failing strategy, a truncated level) are not
//! errors: they travel with the graph as [`GraphWarning`](super::GraphWarning)s.

use thiserror::Error;

/// Errors that abort a generation run. No partial graph is applied when one
/// of these is returned.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Missing or unresolvable project / focus resource, or an invalid
    /// request. Raised before any strategy runs.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The stores were unreachable for every strategy, or the assembled
    /// graph violated a structural invariant.
    #[error("generation error: {0}")]
    Generation(String),
}

impl GraphError {
    /// Whether the consumer should offer a retry affordance.
    ///
    /// Configuration errors need a different request, not a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Generation(_))
    }
}
