//! Billing handlers.
//!
//! ## Commands
//! - Opening a checkout session and reconciling after it completes
//! - Dispatching verified provider webhook events
//! - Canceling, resuming and changing plan
//! - Synchronizing plans and prices with the provider catalog
//!
//! ## Queries
//! - Get the organization's subscription view

mod cancel_subscription;
mod change_plan;
mod dispatch_webhook_event;
mod get_subscription;
mod lookup;
mod merge_billing_info;
mod reconcile_checkout;
mod resume_subscription;
mod start_checkout;
mod sync_plan;

// Commands
pub use cancel_subscription::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CancelSubscriptionResult,
};
pub use change_plan::{ChangePlanCommand, ChangePlanHandler, ChangePlanResult};
pub use dispatch_webhook_event::{DispatchWebhookEventHandler, DispatchWebhookEventResult};
pub use reconcile_checkout::{
    ReconcileCheckoutCommand, ReconcileCheckoutHandler, ReconcileCheckoutResult,
};
pub use resume_subscription::{
    ResumeSubscriptionCommand, ResumeSubscriptionHandler, ResumeSubscriptionResult,
};
pub use start_checkout::{StartCheckoutCommand, StartCheckoutHandler, StartCheckoutResult};
pub use sync_plan::{
    CreatePlanPriceCommand, CreatePlanPriceHandler, CreatePlanProductCommand,
    CreatePlanProductHandler, UpdatePlanPriceCommand, UpdatePlanPriceHandler,
    UpdatePlanPriceResult, UpdatePlanProductCommand, UpdatePlanProductHandler,
    UpdatePlanProductResult,
};

// Queries
pub use get_subscription::{GetSubscriptionHandler, GetSubscriptionQuery, GetSubscriptionResult};

// Shared
pub use merge_billing_info::{billing_info_from, merge_billing_info};
