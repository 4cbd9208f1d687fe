//! HTTP handlers for billing endpoints.
//!
//! These handlers connect Axum routes to application layer command/query
//! handlers. Webhook ingress verifies and queues events, then acknowledges
//! before any subscription is touched.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::adapters::webhook::WebhookQueue;
use crate::application::billing::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, ChangePlanCommand, ChangePlanHandler,
    GetSubscriptionHandler, GetSubscriptionQuery, ReconcileCheckoutCommand,
    ReconcileCheckoutHandler, ResumeSubscriptionCommand, ResumeSubscriptionHandler,
    StartCheckoutCommand, StartCheckoutHandler,
};
use crate::domain::foundation::{OrganizationId, PlanPriceId};
use crate::domain::subscription::BillingError;
use crate::domain::webhook::{WebhookError, WebhookEvent, WebhookVerifier, SIGNATURE_HEADER};
use crate::ports::{
    BillingNotifier, OrganizationRepository, PaymentProvider, PlanCatalog, SubscriptionReader,
    SubscriptionRepository,
};

use super::dto::{
    CancelSubscriptionResponse, ChangePlanRequest, ChangePlanResponse, CheckoutSessionResponse,
    CheckoutSuccessRequest, CheckoutSuccessResponse, ErrorResponse, StartCheckoutRequest,
    SubscriptionResponse, WebhookAck,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for billing routes.
///
/// Holds the ports and builds a fresh handler per request.
#[derive(Clone)]
pub struct BillingAppState {
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub subscription_reader: Arc<dyn SubscriptionReader>,
    pub organizations: Arc<dyn OrganizationRepository>,
    pub catalog: Arc<dyn PlanCatalog>,
    pub provider: Arc<dyn PaymentProvider>,
    pub notifier: Arc<dyn BillingNotifier>,
    pub webhook_verifier: Arc<WebhookVerifier>,
    pub webhook_queue: WebhookQueue,
}

impl BillingAppState {
    pub fn start_checkout_handler(&self) -> StartCheckoutHandler {
        StartCheckoutHandler::new(
            self.organizations.clone(),
            self.catalog.clone(),
            self.provider.clone(),
        )
    }

    pub fn reconcile_checkout_handler(&self) -> ReconcileCheckoutHandler {
        ReconcileCheckoutHandler::new(
            self.subscriptions.clone(),
            self.organizations.clone(),
            self.catalog.clone(),
            self.provider.clone(),
            self.notifier.clone(),
        )
    }

    pub fn cancel_subscription_handler(&self) -> CancelSubscriptionHandler {
        CancelSubscriptionHandler::new(
            self.subscriptions.clone(),
            self.provider.clone(),
            self.notifier.clone(),
        )
    }

    pub fn resume_subscription_handler(&self) -> ResumeSubscriptionHandler {
        ResumeSubscriptionHandler::new(
            self.subscriptions.clone(),
            self.provider.clone(),
            self.notifier.clone(),
        )
    }

    pub fn change_plan_handler(&self) -> ChangePlanHandler {
        ChangePlanHandler::new(
            self.subscriptions.clone(),
            self.organizations.clone(),
            self.catalog.clone(),
            self.provider.clone(),
        )
    }

    pub fn get_subscription_handler(&self) -> GetSubscriptionHandler {
        GetSubscriptionHandler::new(self.subscription_reader.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/organizations/:org_id/billing/subscription
pub async fn get_subscription(
    State(state): State<BillingAppState>,
    Path(org_id): Path<Uuid>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.get_subscription_handler();
    let query = GetSubscriptionQuery {
        organization_id: OrganizationId::from_uuid(org_id),
    };

    let view = handler
        .handle(query)
        .await?
        .ok_or_else(|| BillingError::not_found("Subscription", org_id.to_string()))?;

    Ok(Json(view))
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/organizations/:org_id/billing/checkout
pub async fn start_checkout(
    State(state): State<BillingAppState>,
    Path(org_id): Path<Uuid>,
    Json(request): Json<StartCheckoutRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.start_checkout_handler();
    let cmd = StartCheckoutCommand {
        organization_id: OrganizationId::from_uuid(org_id),
        plan_price_id: PlanPriceId::from_uuid(request.plan_price_id),
        promo_codes: request.promo_codes,
    };

    let result = handler.handle(cmd).await?;
    Ok((StatusCode::CREATED, Json(CheckoutSessionResponse::from(result))))
}

/// POST /api/organizations/:org_id/billing/checkout/success
pub async fn checkout_success(
    State(state): State<BillingAppState>,
    Path(org_id): Path<Uuid>,
    Json(request): Json<CheckoutSuccessRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.reconcile_checkout_handler();
    let cmd = ReconcileCheckoutCommand {
        organization_id: OrganizationId::from_uuid(org_id),
        plan_price_id: PlanPriceId::from_uuid(request.plan_price_id),
        coupon_code: request.coupon_code.filter(|c| !c.trim().is_empty()),
    };

    let result = handler.handle(cmd).await?;
    Ok(Json(CheckoutSuccessResponse::from(result)))
}

/// POST /api/organizations/:org_id/billing/cancel
pub async fn cancel_subscription(
    State(state): State<BillingAppState>,
    Path(org_id): Path<Uuid>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.cancel_subscription_handler();
    let cmd = CancelSubscriptionCommand {
        organization_id: OrganizationId::from_uuid(org_id),
    };

    let result = handler.handle(cmd).await?;
    Ok(Json(CancelSubscriptionResponse::from(result)))
}

/// POST /api/organizations/:org_id/billing/resume
pub async fn resume_subscription(
    State(state): State<BillingAppState>,
    Path(org_id): Path<Uuid>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.resume_subscription_handler();
    let cmd = ResumeSubscriptionCommand {
        organization_id: OrganizationId::from_uuid(org_id),
    };

    let result = handler.handle(cmd).await?;
    Ok(Json(SubscriptionResponse::from(result)))
}

/// POST /api/organizations/:org_id/billing/change-plan
pub async fn change_plan(
    State(state): State<BillingAppState>,
    Path(org_id): Path<Uuid>,
    Json(request): Json<ChangePlanRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.change_plan_handler();
    let cmd = ChangePlanCommand {
        organization_id: OrganizationId::from_uuid(org_id),
        new_plan_price_id: PlanPriceId::from_uuid(request.plan_price_id),
    };

    let result = handler.handle(cmd).await?;
    Ok(Json(ChangePlanResponse::from(result)))
}

/// POST /api/webhooks/billing
///
/// Verifies the signature over the raw body, classifies the event and queues
/// it for the worker. Events this system does not act on are acknowledged
/// without being queued.
pub async fn receive_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    // 1. Verify
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    state.webhook_verifier.verify(&body, signature)?;

    // 2. Parse and classify
    let event = WebhookEvent::parse(&body)?;
    let Some(subscription_event) = event.classify()? else {
        tracing::debug!(
            event_id = %event.id,
            event_type = %event.event_type,
            "Webhook event ignored"
        );
        return Ok(Json(WebhookAck {
            received: true,
            queued: false,
        }));
    };

    // 3. Queue; processing happens after the response
    tracing::info!(
        event_id = %subscription_event.event_id,
        event_kind = subscription_event.kind.as_str(),
        provider_subscription_id = %subscription_event.subscription.id,
        "Webhook event accepted"
    );
    state.webhook_queue.enqueue(subscription_event).await?;

    Ok(Json(WebhookAck {
        received: true,
        queued: true,
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error wrapper for billing commands and queries.
#[derive(Debug)]
pub struct BillingApiError(BillingError);

impl From<BillingError> for BillingApiError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            BillingError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            BillingError::ValidationFailed { .. } => (StatusCode::BAD_REQUEST, "VALIDATION_FAILED"),
            BillingError::InvalidState { .. } => (StatusCode::CONFLICT, "INVALID_STATE"),
            BillingError::Provider { .. } => (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR"),
            BillingError::Infrastructure(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let message = match &self.0 {
            BillingError::Infrastructure(detail) => {
                tracing::error!(error = %detail, "Billing request failed");
                "Internal error".to_string()
            }
            other => other.message(),
        };

        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}

/// API error wrapper for webhook ingress.
#[derive(Debug)]
pub struct WebhookApiError(WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> Response {
        match &self.0 {
            WebhookError::Misconfigured | WebhookError::QueueUnavailable => {
                tracing::error!(error = %self.0, "Webhook rejected")
            }
            other => tracing::warn!(error = %other, "Webhook rejected"),
        }

        (
            self.0.status_code(),
            Json(ErrorResponse::new(self.0.error_code(), self.0.to_string())),
        )
            .into_response()
    }
}
