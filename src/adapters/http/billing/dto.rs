//! Request and response DTOs for the billing endpoints.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::billing::{
    CancelSubscriptionResult, ChangePlanResult, ReconcileCheckoutResult, ResumeSubscriptionResult,
    StartCheckoutResult,
};
use crate::domain::billing::BillingCycle;
use crate::domain::subscription::{BillingInfo, Subscription, SubscriptionStatus};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to open a hosted checkout session.
#[derive(Debug, Clone, Deserialize)]
pub struct StartCheckoutRequest {
    pub plan_price_id: Uuid,
    #[serde(default)]
    pub promo_codes: Vec<String>,
}

/// Sent by the client after the provider redirects back from checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSuccessRequest {
    pub plan_price_id: Uuid,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePlanRequest {
    pub plan_price_id: Uuid,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSessionResponse {
    pub session_id: String,
    pub checkout_url: String,
}

impl From<StartCheckoutResult> for CheckoutSessionResponse {
    fn from(result: StartCheckoutResult) -> Self {
        Self {
            session_id: result.session_id,
            checkout_url: result.checkout_url,
        }
    }
}

/// Write-model subscription as returned by command endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionResponse {
    pub id: String,
    pub organization_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_price_id: Option<String>,
    pub provider_subscription_id: String,
    pub status: SubscriptionStatus,
    pub status_code: i16,
    pub has_access: bool,
    pub start_ts: i64,
    pub end_ts: i64,
    pub trial_end_ts: i64,
    pub next_billing_ts: i64,
    pub billing_cycle: BillingCycle,
    pub amount_cents: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub coupon_code: String,
    pub billing_info: BillingInfo,
}

impl From<Subscription> for SubscriptionResponse {
    fn from(sub: Subscription) -> Self {
        Self {
            id: sub.id.to_string(),
            organization_id: sub.organization_id.to_string(),
            plan_price_id: sub.billing_plan_price_id.map(|id| id.to_string()),
            provider_subscription_id: sub.provider_subscription_id,
            status: sub.status,
            status_code: sub.status.code(),
            has_access: sub.status.has_access(),
            start_ts: sub.start_ts,
            end_ts: sub.end_ts,
            trial_end_ts: sub.trial_end_ts,
            next_billing_ts: sub.next_billing_ts,
            billing_cycle: sub.billing_cycle,
            amount_cents: sub.amount_cents,
            coupon_code: sub.coupon_code,
            billing_info: sub.billing_info,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSuccessResponse {
    pub subscription: SubscriptionResponse,
    /// False when an existing row was reconciled instead.
    pub created: bool,
}

impl From<ReconcileCheckoutResult> for CheckoutSuccessResponse {
    fn from(result: ReconcileCheckoutResult) -> Self {
        Self {
            subscription: result.subscription.into(),
            created: result.created,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelSubscriptionResponse {
    pub subscription: SubscriptionResponse,
    pub effective_at: i64,
}

impl From<CancelSubscriptionResult> for CancelSubscriptionResponse {
    fn from(result: CancelSubscriptionResult) -> Self {
        Self {
            subscription: result.subscription.into(),
            effective_at: result.effective_at,
        }
    }
}

impl From<ResumeSubscriptionResult> for SubscriptionResponse {
    fn from(result: ResumeSubscriptionResult) -> Self {
        result.subscription.into()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangePlanResponse {
    pub previous_subscription_id: String,
    pub subscription: SubscriptionResponse,
}

impl From<ChangePlanResult> for ChangePlanResponse {
    fn from(result: ChangePlanResult) -> Self {
        Self {
            previous_subscription_id: result.previous.id.to_string(),
            subscription: result.subscription.into(),
        }
    }
}

/// Acknowledgement returned to the provider once an event is accepted.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    /// False when the event type is not acted on.
    pub queued: bool,
}

/// Standard error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error_code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::PlanPrice;
    use crate::domain::foundation::{OrganizationId, PlanId};

    fn pending() -> Subscription {
        let price = PlanPrice::new(PlanId::new(), "Pro", 2_900, BillingCycle::Monthly).unwrap();
        Subscription::pending(OrganizationId::new(), &price, Some("WELCOME".to_string()))
    }

    #[test]
    fn start_checkout_request_defaults_promo_codes() {
        let json = format!(r#"{{"plan_price_id":"{}"}}"#, Uuid::new_v4());
        let request: StartCheckoutRequest = serde_json::from_str(&json).unwrap();
        assert!(request.promo_codes.is_empty());
    }

    #[test]
    fn subscription_response_carries_status_and_access() {
        let mut sub = pending();
        sub.activate().unwrap();

        let response = SubscriptionResponse::from(sub);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["status"], "active");
        assert_eq!(json["status_code"], 100);
        assert_eq!(json["has_access"], true);
        assert_eq!(json["coupon_code"], "WELCOME");
    }

    #[test]
    fn empty_coupon_is_omitted() {
        let price = PlanPrice::new(PlanId::new(), "Pro", 2_900, BillingCycle::Monthly).unwrap();
        let sub = Subscription::pending(OrganizationId::new(), &price, None);

        let json = serde_json::to_value(SubscriptionResponse::from(sub)).unwrap();

        assert!(json.get("coupon_code").is_none());
        assert_eq!(json["has_access"], false);
    }

    #[test]
    fn error_response_serializes_code_and_message() {
        let json = serde_json::to_value(ErrorResponse::new("NOT_FOUND", "gone")).unwrap();
        assert_eq!(json["error_code"], "NOT_FOUND");
        assert_eq!(json["message"], "gone");
    }
}
