//! State machine trait for status enums.
//!
//! Gives every lifecycle status a single place where legal transitions are
//! declared, so orchestrators never set a status field directly.

use super::ValidationError;

/// Trait for status enums that represent state machines.
///
/// Implementors define valid state transitions and get validated
/// transition methods for free.
///
/// # Example
///
/// ```ignore
/// let next = SubscriptionStatus::Active.transition_to(SubscriptionStatus::Canceling)?;
/// assert!(SubscriptionStatus::Disabled.is_terminal());
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
    enum InvoiceState {
        Draft,
        Open,
        Paid,
        Void,
    }

    impl StateMachine for InvoiceState {
        fn can_transition_to(&self, target: &Self) -> bool {
            use InvoiceState::*;
            matches!(
                (self, target),
                (Draft, Open) | (Open, Paid) | (Open, Void) | (Draft, Void)
            )
        }

        fn valid_transitions(&self) -> Vec<Self> {
            use InvoiceState::*;
            match self {
                Draft => vec![Open, Void],
                Open => vec![Paid, Void],
                Paid | Void => vec![],
            }
        }
    }

    #[test]
    fn transition_to_succeeds_for_valid_transition() {
        assert_eq!(
            InvoiceState::Draft.transition_to(InvoiceState::Open),
            Ok(InvoiceState::Open)
        );
    }

    #[test]
    fn transition_to_fails_for_invalid_transition() {
        assert!(InvoiceState::Draft.transition_to(InvoiceState::Paid).is_err());
    }

    #[test]
    fn terminal_states_have_no_transitions() {
        assert!(InvoiceState::Paid.is_terminal());
        assert!(InvoiceState::Void.is_terminal());
        assert!(!InvoiceState::Open.is_terminal());
    }
}
