//! Read projection of a subscription joined with its plan price.

use serde::Serialize;

use crate::domain::billing::BillingCycle;
use crate::domain::foundation::{OrganizationId, PlanPriceId, SubscriptionId};

use super::{BillingInfo, SubscriptionStatus};

/// What an organization sees of its subscription.
///
/// Built by a [`SubscriptionReader`](crate::ports::SubscriptionReader); never
/// written back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionView {
    pub id: SubscriptionId,
    pub organization_id: OrganizationId,
    pub billing_plan_price_id: Option<PlanPriceId>,
    pub provider_subscription_id: String,
    pub status: SubscriptionStatus,
    pub start_ts: i64,
    pub end_ts: i64,
    pub trial_end_ts: i64,
    pub next_billing_ts: i64,
    pub billing_cycle: BillingCycle,
    pub amount_cents: i64,
    pub coupon_code: String,
    pub billing_info: BillingInfo,

    // Joined from the plan price and plan
    pub plan_price_cents: Option<i64>,
    pub currency: Option<String>,
    pub plan_name: Option<String>,
    pub plan_level: Option<i16>,
}

impl SubscriptionView {
    pub fn has_access(&self) -> bool {
        self.status.has_access()
    }
}
