//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` port for Stripe integration, including:
//! - Customer creation
//! - Subscription lookup and lifecycle (cancel, resume, price swap)
//! - Product and price synchronization
//! - Hosted checkout sessions
//!
//! # Security
//!
//! - The API key is held as `secrecy::SecretString` and redacted from `Debug`
//! - Webhook signatures are verified in the domain layer, not here
//!
//! # Configuration
//!
//! Required environment variables:
//! - `BILLING_RECONCILER__PAYMENT__STRIPE_API_KEY`: Stripe secret API key
//! - `BILLING_RECONCILER__PAYMENT__CHECKOUT_RETURN_URL`: Redirect after checkout

mod mock_payment_provider;
mod stripe_adapter;
mod stripe_types;

pub use mock_payment_provider::{MethodCall, MockPaymentProvider};
pub use stripe_adapter::{StripeConfig, StripePaymentAdapter};
