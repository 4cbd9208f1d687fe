//! Axum router configuration for billing endpoints.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use super::handlers::{
    cancel_subscription, change_plan, checkout_success, get_subscription, receive_webhook,
    resume_subscription, start_checkout, BillingAppState,
};

/// Largest webhook body accepted, in bytes.
pub const WEBHOOK_BODY_LIMIT: usize = 64 * 1024;

/// Create the organization billing router.
///
/// # Routes
/// - `GET /subscription` - Current subscription view
/// - `POST /checkout` - Open a hosted checkout session
/// - `POST /checkout/success` - Reconcile after the checkout redirect
/// - `POST /cancel` - Schedule cancellation at period end
/// - `POST /resume` - Undo a scheduled cancellation
/// - `POST /change-plan` - Swap to another plan price
pub fn billing_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/subscription", get(get_subscription))
        .route("/checkout", post(start_checkout))
        .route("/checkout/success", post(checkout_success))
        .route("/cancel", post(cancel_subscription))
        .route("/resume", post(resume_subscription))
        .route("/change-plan", post(change_plan))
}

/// Create the provider webhook router.
///
/// Kept apart from the organization routes because it is authenticated by
/// signature only.
///
/// # Routes
/// - `POST /billing` - Receive a provider event
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/billing", post(receive_webhook))
        .layer(DefaultBodyLimit::max(WEBHOOK_BODY_LIMIT))
}

/// Create the complete billing router, suitable for mounting at `/api`.
///
/// ```ignore
/// let app = Router::new()
///     .nest("/api", billing_router())
///     .with_state(state);
/// ```
pub fn billing_router() -> Router<BillingAppState> {
    Router::new()
        .nest("/organizations/:org_id/billing", billing_routes())
        .nest("/webhooks", webhook_routes())
}
