//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, timestamps, the state machine trait, and
//! validation errors used across the simulator domain.

mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::ValidationError;
pub use ids::{CaseId, SessionId, StudentId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
