//! HTTP adapter for billing endpoints.
//!
//! - `GET /api/organizations/:org_id/billing/subscription` - Subscription view
//! - `POST /api/organizations/:org_id/billing/checkout` - Open checkout
//! - `POST /api/organizations/:org_id/billing/checkout/success` - Reconcile checkout
//! - `POST /api/organizations/:org_id/billing/cancel` - Cancel at period end
//! - `POST /api/organizations/:org_id/billing/resume` - Resume
//! - `POST /api/organizations/:org_id/billing/change-plan` - Change plan
//! - `POST /api/webhooks/billing` - Provider webhooks

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{BillingApiError, BillingAppState, WebhookApiError};
pub use routes::{billing_router, billing_routes, webhook_routes, WEBHOOK_BODY_LIMIT};
