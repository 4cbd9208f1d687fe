//! Billing operation errors.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | NotFound | 404 |
//! | ValidationFailed | 400 |
//! | InvalidState | 409 |
//! | Provider | 502 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{DomainError, ErrorCode};

/// Errors returned by the billing command handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    /// An expected local row or provider object is absent.
    NotFound { resource: String, key: String },

    /// The payment provider rejected or failed a call.
    Provider { message: String, retryable: bool },

    /// The subscription is not in a state that allows the operation.
    InvalidState { current: String, attempted: String },

    /// Validation failed.
    ValidationFailed { field: String, message: String },

    /// Persistence or other infrastructure failure.
    Infrastructure(String),
}

impl BillingError {
    pub fn not_found(resource: impl Into<String>, key: impl ToString) -> Self {
        BillingError::NotFound {
            resource: resource.into(),
            key: key.to_string(),
        }
    }

    pub fn provider(message: impl Into<String>, retryable: bool) -> Self {
        BillingError::Provider {
            message: message.into(),
            retryable,
        }
    }

    pub fn invalid_state(current: impl Into<String>, attempted: impl Into<String>) -> Self {
        BillingError::InvalidState {
            current: current.into(),
            attempted: attempted.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        BillingError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        BillingError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            BillingError::NotFound { .. } => ErrorCode::NotFound,
            BillingError::Provider { .. } => ErrorCode::ExternalServiceError,
            BillingError::InvalidState { .. } => ErrorCode::InvalidStateTransition,
            BillingError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            BillingError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a user-friendly error message.
    pub fn message(&self) -> String {
        match self {
            BillingError::NotFound { resource, key } => {
                format!("{} not found: {}", resource, key)
            }
            BillingError::Provider { message, .. } => {
                format!("Payment provider error: {}", message)
            }
            BillingError::InvalidState { current, attempted } => {
                format!("Cannot {} subscription in {} state", attempted, current)
            }
            BillingError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            BillingError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }

    /// Returns true if the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        match self {
            BillingError::Provider { retryable, .. } => *retryable,
            BillingError::Infrastructure(_) => true,
            // Checkout-success before the provider settled payment
            BillingError::NotFound { .. } => true,
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BillingError::NotFound { .. })
    }
}

impl std::fmt::Display for BillingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for BillingError {}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::NotFound
            | ErrorCode::SubscriptionNotFound
            | ErrorCode::OrganizationNotFound
            | ErrorCode::PlanNotFound
            | ErrorCode::PlanPriceNotFound => BillingError::NotFound {
                resource: err
                    .details
                    .get("resource")
                    .cloned()
                    .unwrap_or_else(|| "Resource".to_string()),
                key: err.details.get("key").cloned().unwrap_or_default(),
            },
            ErrorCode::InvalidStateTransition => BillingError::InvalidState {
                current: err
                    .details
                    .get("current")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                attempted: err.message().to_string(),
            },
            ErrorCode::ValidationFailed => BillingError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message().to_string(),
            },
            ErrorCode::ExternalServiceError | ErrorCode::PaymentRequired => {
                BillingError::Provider {
                    message: err.message().to_string(),
                    retryable: false,
                }
            }
            ErrorCode::SubscriptionExists
            | ErrorCode::DatabaseError
            | ErrorCode::InternalError => BillingError::Infrastructure(err.to_string()),
        }
    }
}

impl From<BillingError> for DomainError {
    fn from(err: BillingError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ============================================================
    // Constructor Tests
    // ============================================================

    #[test]
    fn not_found_creates_correctly() {
        let err = BillingError::not_found("Subscription", "sub_123");
        assert!(matches!(
            err,
            BillingError::NotFound { ref resource, ref key }
            if resource == "Subscription" && key == "sub_123"
        ));
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[test]
    fn provider_creates_correctly() {
        let err = BillingError::provider("card declined", false);
        assert_eq!(err.code(), ErrorCode::ExternalServiceError);
        assert!(!err.is_retryable());
    }

    #[test]
    fn invalid_state_creates_correctly() {
        let err = BillingError::invalid_state("CANCELLED", "resume");
        assert_eq!(err.code(), ErrorCode::InvalidStateTransition);
        assert_eq!(err.message(), "Cannot resume subscription in CANCELLED state");
    }

    // ============================================================
    // Conversion Tests
    // ============================================================

    #[test]
    fn domain_not_found_keeps_resource_and_key() {
        let domain = DomainError::new(ErrorCode::SubscriptionNotFound, "missing")
            .with_detail("resource", "Subscription")
            .with_detail("key", "sub_9");
        let err: BillingError = domain.into();
        assert_eq!(err, BillingError::not_found("Subscription", "sub_9"));
    }

    #[test]
    fn domain_transition_error_becomes_invalid_state() {
        let domain = DomainError::new(ErrorCode::InvalidStateTransition, "nope")
            .with_detail("current", "PENDING");
        let err: BillingError = domain.into();
        assert!(matches!(
            err,
            BillingError::InvalidState { ref current, .. } if current == "PENDING"
        ));
    }

    #[test]
    fn database_error_is_infrastructure() {
        let err: BillingError = DomainError::database("connection reset").into();
        assert!(matches!(err, BillingError::Infrastructure(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn validation_is_not_retryable() {
        assert!(!BillingError::validation("plan_price_id", "same plan").is_retryable());
    }

    #[test]
    fn display_matches_message() {
        let err = BillingError::infrastructure("boom");
        assert_eq!(err.to_string(), err.message());
    }
}
