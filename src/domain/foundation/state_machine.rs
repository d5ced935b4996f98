//! State machine trait for lifecycle enums.
//!
//! Provides a consistent interface for validating and performing state
//! transitions (engine lifecycle, session lifecycle).

use super::ValidationError;

/// Trait for status enums that represent state machines.
///
/// Implementors define valid state transitions and get validated
/// transition methods for free.
///
/// # Example
///
/// ```ignore
/// impl StateMachine for EngineState {
///     fn can_transition_to(&self, target: &Self) -> bool {
///         matches!((self, target), (Initialized, Active) | (Active, Ended))
///     }
///
///     fn valid_transitions(&self) -> Vec<Self> {
///         match self {
///             Initialized => vec![Active, Ended],
///             Active => vec![Ended],
///             Ended => vec![],
///         }
///     }
/// }
///
/// let next = state.transition_to(EngineState::Active)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs transition with validation, returning error if invalid.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum TestStatus {
        Draft,
        Active,
        Closed,
    }

    impl StateMachine for TestStatus {
        fn can_transition_to(&self, target: &Self) -> bool {
            use TestStatus::*;
            matches!((self, target), (Draft, Active) | (Active, Closed) | (Draft, Closed))
        }

        fn valid_transitions(&self) -> Vec<Self> {
            use TestStatus::*;
            match self {
                Draft => vec![Active, Closed],
                Active => vec![Closed],
                Closed => vec![],
            }
        }
    }

    #[test]
    fn transition_to_succeeds_for_valid_transition() {
        assert_eq!(
            TestStatus::Draft.transition_to(TestStatus::Active),
            Ok(TestStatus::Active)
        );
    }

    #[test]
    fn transition_to_fails_for_invalid_transition() {
        assert!(TestStatus::Closed.transition_to(TestStatus::Active).is_err());
    }

    #[test]
    fn is_terminal_reflects_valid_transitions() {
        assert!(TestStatus::Closed.is_terminal());
        assert!(!TestStatus::Draft.is_terminal());
    }

    #[test]
    fn can_transition_to_is_consistent_with_valid_transitions() {
        for status in [TestStatus::Draft, TestStatus::Active, TestStatus::Closed] {
            for target in status.valid_transitions() {
                assert!(status.can_transition_to(&target));
            }
        }
    }
}
