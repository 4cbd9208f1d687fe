//! Subscription lifecycle.
//!
//! - `aggregate` - the write model mutated by checkout, webhooks and orchestrators
//! - `status` - lifecycle states and allowed transitions
//! - `billing_info` - payment-method summary snapshot
//! - `view` - read projection joined with the plan price
//! - `errors` - errors surfaced by the billing handlers

mod aggregate;
mod billing_info;
mod errors;
mod status;
mod view;

pub use aggregate::{BillingProvider, ProviderPeriod, Subscription};
pub use billing_info::BillingInfo;
pub use errors::BillingError;
pub use status::SubscriptionStatus;
pub use view::SubscriptionView;
