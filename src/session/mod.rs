//! Exploration sessions.
//!
//! An [`ExplorerSession`] is the state an explorer panel keeps between user
//! interactions: the generation state machine, the cached full graph, the
//! active filters and the derived view. UI consumers follow it through the
//! [`SessionEvent`] broadcast channel.

pub mod events;
pub mod explorer;

pub use events::{GenerationState, SessionBus, SessionEvent};
pub use explorer::{ExplorerSession, GenerateOutcome};
