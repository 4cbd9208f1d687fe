//! Subscription status state machine.
//!
//! Defines every lifecycle state of a subscription row and the transitions
//! the orchestrators and webhook handlers are allowed to perform.

use crate::domain::foundation::{StateMachine, ValidationError};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a subscription row.
///
/// Stored as a numeric code. Codes of 200 and above mark the row as
/// disabled, which removes it from every lookup query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Created by checkout, provider has not confirmed payment yet.
    Pending,

    /// Paid and current.
    Active,

    /// In a provider trial.
    Trialing,

    /// Cancellation scheduled; access continues until `end_ts`.
    Canceling,

    /// Superseded by a plan change.
    Disabled,

    /// Cancelled by the provider.
    Cancelled,

    /// Cancelled after payment retries were exhausted.
    UnpaidCanceled,

    /// Hard-excluded from all queries.
    Deleted,
}

impl SubscriptionStatus {
    /// Numeric code used in storage.
    pub fn code(&self) -> i16 {
        match self {
            SubscriptionStatus::Pending => 1,
            SubscriptionStatus::Active => 100,
            SubscriptionStatus::Trialing => 101,
            SubscriptionStatus::Canceling => 102,
            SubscriptionStatus::Disabled => 200,
            SubscriptionStatus::Cancelled => 201,
            SubscriptionStatus::UnpaidCanceled => 202,
            SubscriptionStatus::Deleted => 300,
        }
    }

    /// Parses a stored numeric code.
    pub fn from_code(code: i16) -> Result<Self, ValidationError> {
        match code {
            1 => Ok(SubscriptionStatus::Pending),
            100 => Ok(SubscriptionStatus::Active),
            101 => Ok(SubscriptionStatus::Trialing),
            102 => Ok(SubscriptionStatus::Canceling),
            200 => Ok(SubscriptionStatus::Disabled),
            201 => Ok(SubscriptionStatus::Cancelled),
            202 => Ok(SubscriptionStatus::UnpaidCanceled),
            300 => Ok(SubscriptionStatus::Deleted),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown subscription status code {}", other),
            )),
        }
    }

    /// Disabled rows are excluded from lookups.
    pub fn is_disabled(&self) -> bool {
        self.code() >= 200
    }

    /// Returns true if the organization has paid access in this state.
    pub fn has_access(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Active | SubscriptionStatus::Trialing | SubscriptionStatus::Canceling
        )
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SubscriptionStatus::Pending => "PENDING",
            SubscriptionStatus::Active => "ACTIVE",
            SubscriptionStatus::Trialing => "TRIALING",
            SubscriptionStatus::Canceling => "CANCELING",
            SubscriptionStatus::Disabled => "DISABLED",
            SubscriptionStatus::Cancelled => "CANCELLED",
            SubscriptionStatus::UnpaidCanceled => "UNPAID_CANCELED",
            SubscriptionStatus::Deleted => "DELETED",
        };
        write!(f, "{}", s)
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, target),
            // From PENDING
            (Pending, Pending)
                | (Pending, Active)
                | (Pending, Canceling)
                | (Pending, Cancelled)
                | (Pending, Deleted)
            // From ACTIVE
                | (Active, Active) // Redelivered event
                | (Active, Trialing)
                | (Active, Canceling)
                | (Active, Cancelled)
                | (Active, UnpaidCanceled)
                | (Active, Disabled)
            // From TRIALING
                | (Trialing, Trialing)
                | (Trialing, Active)
                | (Trialing, Canceling)
                | (Trialing, Cancelled)
                | (Trialing, UnpaidCanceled)
            // From CANCELING
                | (Canceling, Canceling)
                | (Canceling, Active) // Resume
                | (Canceling, Cancelled)
            // From CANCELLED
                | (Cancelled, Deleted)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Pending => vec![Pending, Active, Canceling, Cancelled, Deleted],
            Active => vec![Active, Trialing, Canceling, Cancelled, UnpaidCanceled, Disabled],
            Trialing => vec![Trialing, Active, Canceling, Cancelled, UnpaidCanceled],
            Canceling => vec![Canceling, Active, Cancelled],
            Cancelled => vec![Deleted],
            UnpaidCanceled | Disabled | Deleted => vec![],
        }
    }
}
