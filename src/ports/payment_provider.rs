//! Payment provider port.
//!
//! Defines the contract for the payment gateway (e.g., Stripe). The provider
//! is the source of truth for subscription state; every reconciliation path
//! reads it fresh instead of trusting caller-supplied identifiers.
//!
//! # Design
//!
//! - **Gateway agnostic**: Interface works with any payment provider
//! - **Injected**: Constructed once at startup and passed as `Arc<dyn PaymentProvider>`
//! - **No idempotency keys**: A duplicate call can create duplicate provider resources

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::billing::BillingCycle;
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::subscription::{BillingError, ProviderPeriod};

/// Port for payment provider integrations.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a customer in the payment system.
    async fn create_customer(&self, request: CreateCustomerRequest)
        -> Result<Customer, PaymentError>;

    /// Current subscription for a customer, if any.
    async fn get_subscription_by_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<ProviderSubscription>, PaymentError>;

    /// Subscription by provider ID, with payment method expanded.
    async fn get_subscription_by_id(
        &self,
        subscription_id: &str,
    ) -> Result<ProviderSubscription, PaymentError>;

    /// Schedule cancellation at period end.
    async fn cancel(&self, subscription_id: &str) -> Result<ProviderSubscription, PaymentError>;

    /// Undo a scheduled cancellation.
    async fn resume(&self, subscription_id: &str) -> Result<ProviderSubscription, PaymentError>;

    /// Swap the price on a subscription line item.
    async fn change_item_price(
        &self,
        subscription_id: &str,
        item_id: &str,
        new_price_id: &str,
        prorate: bool,
    ) -> Result<ProviderSubscription, PaymentError>;

    /// Create a recurring price under a product.
    async fn create_price(&self, request: CreatePriceRequest) -> Result<ProviderPrice, PaymentError>;

    /// Update an existing price.
    async fn update_price(
        &self,
        price_id: &str,
        currency: &str,
        unit_amount_cents: i64,
    ) -> Result<ProviderPrice, PaymentError>;

    /// Create a product.
    async fn create_product(
        &self,
        name: &str,
        description: &str,
    ) -> Result<ProviderProduct, PaymentError>;

    /// Update a product's name and description.
    async fn update_product(
        &self,
        product_id: &str,
        name: &str,
        description: &str,
    ) -> Result<ProviderProduct, PaymentError>;

    /// Create a hosted checkout session.
    ///
    /// Returns a URL for the customer to complete payment.
    async fn setup_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError>;
}

/// Request to create a customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCustomerRequest {
    pub email: String,
    pub name: Option<String>,
    /// Stored on the provider customer (e.g. `organization_id`).
    pub metadata: HashMap<String, String>,
}

/// Customer in the payment system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub email: String,
}

/// Subscription status reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderSubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
    Unpaid,
    Paused,
    Incomplete,
    IncompleteExpired,
    #[serde(other)]
    Unknown,
}

impl ProviderSubscriptionStatus {
    pub fn from_provider(status: &str) -> Self {
        match status {
            "active" => Self::Active,
            "trialing" => Self::Trialing,
            "past_due" => Self::PastDue,
            "canceled" => Self::Canceled,
            "unpaid" => Self::Unpaid,
            "paused" => Self::Paused,
            "incomplete" => Self::Incomplete,
            "incomplete_expired" => Self::IncompleteExpired,
            _ => Self::Unknown,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Line item on a provider subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionItem {
    pub id: String,
    pub price_id: String,
}

/// Billing address on a payment method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingAddress {
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

/// Card summary of the default payment method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethodDetails {
    pub brand: String,
    pub last4: String,
    pub exp_month: i32,
    pub exp_year: i32,
    pub address: Option<BillingAddress>,
}

/// Subscription in the payment system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSubscription {
    pub id: String,
    pub customer_id: String,
    pub status: ProviderSubscriptionStatus,
    pub current_period_start: i64,
    pub current_period_end: i64,
    pub trial_end: Option<i64>,
    pub canceled_at: Option<i64>,
    pub cancel_at: Option<i64>,
    pub items: Vec<SubscriptionItem>,
    /// `None` until a payment method is attached.
    pub payment_method: Option<PaymentMethodDetails>,
}

impl ProviderSubscription {
    pub fn period(&self) -> ProviderPeriod {
        ProviderPeriod {
            current_period_start: self.current_period_start,
            current_period_end: self.current_period_end,
            trial_end: self.trial_end,
            canceled_at: self.canceled_at,
            cancel_at: self.cancel_at,
        }
    }

    /// The line item when the subscription carries exactly one.
    pub fn single_item(&self) -> Option<&SubscriptionItem> {
        match self.items.as_slice() {
            [item] => Some(item),
            _ => None,
        }
    }
}

/// Request to create a price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePriceRequest {
    pub product_id: String,
    pub unit_amount_cents: i64,
    pub currency: String,
    pub billing_cycle: BillingCycle,
}

/// Price in the payment system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderPrice {
    pub id: String,
    pub product_id: String,
    pub unit_amount_cents: i64,
    pub currency: String,
}

/// Product in the payment system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderProduct {
    pub id: String,
    pub name: String,
}

/// Request to create a checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSessionRequest {
    pub price_id: String,
    pub customer_id: String,
    pub promo_codes: Vec<String>,
}

/// Checkout session for payment completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Errors from payment provider operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentError {
    /// Error code for categorization.
    pub code: PaymentErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Provider's error code (if available).
    pub provider_code: Option<String>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl PaymentError {
    /// Create a new payment error.
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    /// Create with provider code.
    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::AuthenticationError, message)
    }

    /// Create a not found error.
    pub fn not_found(resource: &str) -> Self {
        Self::new(PaymentErrorCode::NotFound, format!("{} not found", resource))
    }

    /// Create a provider API error.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message)
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for DomainError {
    fn from(err: PaymentError) -> Self {
        let code = match err.code {
            PaymentErrorCode::CardDeclined => ErrorCode::PaymentRequired,
            PaymentErrorCode::NotFound => ErrorCode::NotFound,
            _ => ErrorCode::ExternalServiceError,
        };

        DomainError::new(code, err.message)
    }
}

impl From<PaymentError> for BillingError {
    fn from(err: PaymentError) -> Self {
        match err.code {
            PaymentErrorCode::NotFound => BillingError::NotFound {
                resource: "Provider resource".to_string(),
                key: err.message,
            },
            _ => BillingError::Provider {
                retryable: err.retryable,
                message: err.to_string(),
            },
        }
    }
}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// API authentication failed.
    AuthenticationError,

    /// Card was declined.
    CardDeclined,

    /// Resource not found.
    NotFound,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Request rejected by the provider.
    InvalidRequest,

    /// Provider API error.
    ProviderError,
}

impl PaymentErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError
                | PaymentErrorCode::RateLimitExceeded
                | PaymentErrorCode::ProviderError
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::CardDeclined => "card_declined",
            PaymentErrorCode::NotFound => "not_found",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::InvalidRequest => "invalid_request",
            PaymentErrorCode::ProviderError => "provider_error",
        };
        write!(f, "{}", s)
    }
}
