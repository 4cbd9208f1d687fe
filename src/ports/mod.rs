//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports and are
//! injected into handlers as `Arc<dyn Port>`.
//!
//! ## Provider Ports
//!
//! - `PaymentProvider` - Payment gateway (customers, subscriptions, catalog, checkout)
//! - `BillingNotifier` - Best-effort lifecycle notifications
//!
//! ## Persistence Ports
//!
//! - `SubscriptionRepository` - Subscription write model
//! - `SubscriptionReader` - Subscription read projection
//! - `OrganizationRepository` - Organization customer id and plan pointer
//! - `PlanCatalog` - Plans and plan prices

mod billing_notifier;
mod organization_repository;
mod payment_provider;
mod plan_catalog;
mod subscription_reader;
mod subscription_repository;

pub use billing_notifier::{notify_best_effort, BillingNotice, BillingNotifier};
pub use organization_repository::OrganizationRepository;
pub use payment_provider::{
    BillingAddress, CheckoutSession, CheckoutSessionRequest, CreateCustomerRequest,
    CreatePriceRequest, Customer, PaymentError, PaymentErrorCode, PaymentMethodDetails,
    PaymentProvider, ProviderPrice, ProviderProduct, ProviderSubscription,
    ProviderSubscriptionStatus, SubscriptionItem,
};
pub use plan_catalog::PlanCatalog;
pub use subscription_reader::SubscriptionReader;
pub use subscription_repository::SubscriptionRepository;
