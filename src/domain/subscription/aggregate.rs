//! Subscription aggregate (write model).
//!
//! One row per purchased plan price per organization. Two independent paths
//! mutate it: the checkout reconciler and the webhook dispatcher. Neither
//! holds a lock; they converge through the natural key
//! (`organization_id`, `billing_plan_price_id`) and the provider subscription
//! id, whichever path claims it first.
//!
//! # Design Decisions
//!
//! - **Money in cents**: `amount_cents` is copied from the plan price at creation
//! - **Epoch seconds**: lifecycle timestamps mirror the provider; `0` means unset
//! - **Supersede, never delete**: a plan change disables the row and creates a new one

use serde::{Deserialize, Serialize};

use crate::domain::billing::{BillingCycle, PlanPrice};
use crate::domain::foundation::{
    DomainError, ErrorCode, OrganizationId, PlanPriceId, StateMachine, SubscriptionId, Timestamp,
};

use super::{BillingInfo, SubscriptionStatus};

/// Payment provider that owns the remote subscription.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingProvider {
    #[default]
    Stripe,
}

impl BillingProvider {
    pub fn code(&self) -> i16 {
        match self {
            BillingProvider::Stripe => 1,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(BillingProvider::Stripe),
            _ => None,
        }
    }
}

/// Period information reported by the provider for a subscription.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderPeriod {
    pub current_period_start: i64,
    pub current_period_end: i64,
    pub trial_end: Option<i64>,
    /// Set once the customer asked the provider to cancel.
    pub canceled_at: Option<i64>,
    /// When the provider will end the subscription.
    pub cancel_at: Option<i64>,
}

impl ProviderPeriod {
    fn cancellation_scheduled(&self) -> bool {
        self.canceled_at.map(|ts| ts > 0).unwrap_or(false)
    }
}

/// Subscription aggregate.
///
/// # Invariants
///
/// - `provider_subscription_id` is empty until claimed, then never rewritten
/// - `amount_cents` and `billing_cycle` never change after creation
/// - Status changes go through [`SubscriptionStatus`] transition rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub organization_id: OrganizationId,
    pub billing_plan_price_id: Option<PlanPriceId>,

    pub billing_provider: BillingProvider,
    pub provider_subscription_id: String,
    pub provider_customer_id: String,
    pub provider_price_id: String,

    pub status: SubscriptionStatus,
    pub start_ts: i64,
    /// `0` means no scheduled end.
    pub end_ts: i64,
    pub trial_end_ts: i64,
    pub next_billing_ts: i64,

    pub billing_cycle: BillingCycle,
    pub amount_cents: i64,
    pub coupon_code: String,

    pub billing_info: BillingInfo,
    pub metadata: serde_json::Value,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Subscription {
    /// Creates a PENDING row with commercial terms copied from `plan_price`.
    pub fn pending(
        organization_id: OrganizationId,
        plan_price: &PlanPrice,
        coupon_code: Option<String>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: SubscriptionId::new(),
            organization_id,
            billing_plan_price_id: Some(plan_price.id),
            billing_provider: BillingProvider::Stripe,
            provider_subscription_id: String::new(),
            provider_customer_id: String::new(),
            provider_price_id: plan_price.provider_price_id.clone().unwrap_or_default(),
            status: SubscriptionStatus::Pending,
            start_ts: 0,
            end_ts: 0,
            trial_end_ts: 0,
            next_billing_ts: 0,
            billing_cycle: plan_price.billing_cycle,
            amount_cents: plan_price.price_cents,
            coupon_code: coupon_code.unwrap_or_default(),
            billing_info: BillingInfo::default(),
            metadata: serde_json::Value::Object(Default::default()),
            created_at: now,
            updated_at: now,
        }
    }

    /// Builds the ACTIVE row that replaces this one after a plan change.
    ///
    /// Keeps the provider subscription and customer linkage; takes the
    /// commercial terms of `plan_price`.
    pub fn replacement_for(&self, plan_price: &PlanPrice) -> Self {
        let mut next = Self::pending(self.organization_id, plan_price, None);
        next.billing_provider = self.billing_provider;
        next.provider_subscription_id = self.provider_subscription_id.clone();
        next.provider_customer_id = self.provider_customer_id.clone();
        next.start_ts = self.start_ts;
        next.next_billing_ts = self.next_billing_ts;
        next.trial_end_ts = self.trial_end_ts;
        next.billing_info = self.billing_info.clone();
        next.status = SubscriptionStatus::Active;
        next
    }

    /// Whether the provider subscription id has been assigned.
    pub fn has_provider_subscription(&self) -> bool {
        !self.provider_subscription_id.is_empty()
    }

    /// Adopts the provider subscription id only when none is set.
    ///
    /// Returns true if the id was claimed by this call.
    pub fn claim_provider_subscription(&mut self, provider_subscription_id: &str) -> bool {
        if self.has_provider_subscription() {
            return false;
        }
        self.provider_subscription_id = provider_subscription_id.to_string();
        self.updated_at = Timestamp::now();
        true
    }

    /// Links the row to a provider customer when it has none yet.
    pub fn link_customer(&mut self, provider_customer_id: &str) {
        if self.provider_customer_id.is_empty() {
            self.provider_customer_id = provider_customer_id.to_string();
            self.updated_at = Timestamp::now();
        }
    }

    /// Refreshes billing dates from the provider.
    pub fn record_provider_period(&mut self, period: &ProviderPeriod) {
        if self.start_ts == 0 && period.current_period_start > 0 {
            self.start_ts = period.current_period_start;
        }
        if period.current_period_end > 0 {
            self.next_billing_ts = period.current_period_end;
        }
        if let Some(trial_end) = period.trial_end.filter(|ts| *ts > 0) {
            self.trial_end_ts = trial_end;
        }
        self.updated_at = Timestamp::now();
    }

    /// Copies a payment-method summary onto the row.
    pub fn capture_billing_info(&mut self, info: BillingInfo) {
        self.billing_info = info;
        self.updated_at = Timestamp::now();
    }

    /// Marks the row ACTIVE after the checkout path confirmed payment.
    pub fn activate(&mut self) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Active)
    }

    /// Provider reports the subscription as active.
    ///
    /// A pending cancellation on the provider side lands the row in CANCELING
    /// with `end_ts` taken from the provider.
    pub fn process_active(&mut self, period: &ProviderPeriod) -> Result<(), DomainError> {
        self.record_provider_period(period);
        if period.cancellation_scheduled() {
            self.transition_to(SubscriptionStatus::Canceling)?;
            self.end_ts = period.cancel_at.unwrap_or(self.next_billing_ts);
            return Ok(());
        }
        self.transition_to(SubscriptionStatus::Active)
    }

    /// Provider reports a trial started.
    ///
    /// Lands on ACTIVE rather than TRIALING.
    pub fn process_trial_started(&mut self, period: &ProviderPeriod) -> Result<(), DomainError> {
        self.process_active(period)
    }

    /// Provider cancelled the subscription. Takes effect immediately.
    pub fn process_canceled(&mut self) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Cancelled)
    }

    /// Provider paused the subscription; treated as a cancellation.
    pub fn process_paused(&mut self) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Cancelled)
    }

    /// Provider gave up collecting payment.
    pub fn process_unpaid(&mut self) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::UnpaidCanceled)
    }

    /// User asked to cancel at period end.
    pub fn schedule_cancellation(&mut self) -> Result<(), DomainError> {
        if self.status != SubscriptionStatus::Active {
            return Err(self.invalid_transition(SubscriptionStatus::Canceling));
        }
        self.transition_to(SubscriptionStatus::Canceling)?;
        self.end_ts = self.next_billing_ts;
        Ok(())
    }

    /// User withdrew a scheduled cancellation. `end_ts` is left as is.
    pub fn resume(&mut self) -> Result<(), DomainError> {
        if self.status != SubscriptionStatus::Canceling {
            return Err(self.invalid_transition(SubscriptionStatus::Active));
        }
        self.transition_to(SubscriptionStatus::Active)
    }

    /// Row superseded by a plan change.
    pub fn disable(&mut self) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Disabled)
    }

    pub fn is_disabled(&self) -> bool {
        self.status.is_disabled()
    }

    /// Transition to a new status using the state machine.
    fn transition_to(&mut self, target: SubscriptionStatus) -> Result<(), DomainError> {
        self.status = self
            .status
            .transition_to(target)
            .map_err(|_| self.invalid_transition(target))?;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    fn invalid_transition(&self, target: SubscriptionStatus) -> DomainError {
        DomainError::new(
            ErrorCode::InvalidStateTransition,
            format!(
                "Cannot transition subscription from {} to {}",
                self.status, target
            ),
        )
        .with_detail("subscription_id", self.id.to_string())
        .with_detail("current", self.status.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::PlanId;

    fn plan_price(cents: i64) -> PlanPrice {
        PlanPrice::new(PlanId::new(), "Pro Monthly", cents, BillingCycle::Monthly)
            .unwrap()
            .with_provider_price_id("price_pro_monthly")
    }

    fn pending() -> Subscription {
        Subscription::pending(OrganizationId::new(), &plan_price(2_900), Some("LAUNCH".into()))
    }

    fn active() -> Subscription {
        let mut sub = pending();
        sub.claim_provider_subscription("sub_123");
        sub.next_billing_ts = 1_700_000_000;
        sub.activate().unwrap();
        sub
    }

    // ══════════════════════════════════════════════════════════════
    // Construction
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn pending_copies_terms_from_plan_price() {
        let price = plan_price(4_900);
        let sub = Subscription::pending(OrganizationId::new(), &price, None);

        assert_eq!(sub.status, SubscriptionStatus::Pending);
        assert_eq!(sub.amount_cents, 4_900);
        assert_eq!(sub.billing_cycle, BillingCycle::Monthly);
        assert_eq!(sub.billing_plan_price_id, Some(price.id));
        assert_eq!(sub.provider_price_id, "price_pro_monthly");
        assert!(sub.provider_subscription_id.is_empty());
        assert_eq!(sub.end_ts, 0);
    }

    #[test]
    fn coupon_is_recorded() {
        assert_eq!(pending().coupon_code, "LAUNCH");
    }

    // ══════════════════════════════════════════════════════════════
    // Provider linkage
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn claim_only_adopts_when_empty() {
        let mut sub = pending();
        assert!(sub.claim_provider_subscription("sub_first"));
        assert!(!sub.claim_provider_subscription("sub_second"));
        assert_eq!(sub.provider_subscription_id, "sub_first");
    }

    #[test]
    fn link_customer_keeps_existing_customer() {
        let mut sub = pending();
        sub.link_customer("cus_1");
        sub.link_customer("cus_2");
        assert_eq!(sub.provider_customer_id, "cus_1");
    }

    #[test]
    fn record_period_sets_start_once() {
        let mut sub = pending();
        sub.record_provider_period(&ProviderPeriod {
            current_period_start: 100,
            current_period_end: 200,
            ..Default::default()
        });
        sub.record_provider_period(&ProviderPeriod {
            current_period_start: 200,
            current_period_end: 300,
            ..Default::default()
        });
        assert_eq!(sub.start_ts, 100);
        assert_eq!(sub.next_billing_ts, 300);
    }

    // ══════════════════════════════════════════════════════════════
    // Webhook transitions
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn process_active_activates_pending() {
        let mut sub = pending();
        sub.process_active(&ProviderPeriod::default()).unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Active);
    }

    #[test]
    fn process_active_is_idempotent() {
        let mut sub = active();
        sub.process_active(&ProviderPeriod::default()).unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Active);
    }

    #[test]
    fn process_active_with_provider_cancellation_goes_canceling() {
        let mut sub = active();
        sub.process_active(&ProviderPeriod {
            canceled_at: Some(1_650_000_000),
            cancel_at: Some(1_700_500_000),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(sub.status, SubscriptionStatus::Canceling);
        assert_eq!(sub.end_ts, 1_700_500_000);
    }

    #[test]
    fn trial_started_lands_on_active() {
        let mut sub = pending();
        sub.process_trial_started(&ProviderPeriod {
            trial_end: Some(1_699_000_000),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.trial_end_ts, 1_699_000_000);
    }

    #[test]
    fn canceled_applies_immediately_from_canceling() {
        let mut sub = active();
        sub.schedule_cancellation().unwrap();
        sub.process_canceled().unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Cancelled);
    }

    #[test]
    fn paused_maps_to_cancelled() {
        let mut sub = active();
        sub.process_paused().unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Cancelled);
    }

    #[test]
    fn unpaid_from_pending_is_rejected() {
        let mut sub = pending();
        let err = sub.process_unpaid().unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStateTransition);
        assert_eq!(sub.status, SubscriptionStatus::Pending);
    }

    #[test]
    fn unpaid_from_active() {
        let mut sub = active();
        sub.process_unpaid().unwrap();
        assert_eq!(sub.status, SubscriptionStatus::UnpaidCanceled);
        assert!(sub.is_disabled());
    }

    // ══════════════════════════════════════════════════════════════
    // User-initiated transitions
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn schedule_cancellation_ends_at_next_billing() {
        let mut sub = active();
        sub.schedule_cancellation().unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Canceling);
        assert_eq!(sub.end_ts, 1_700_000_000);
    }

    #[test]
    fn schedule_cancellation_requires_active() {
        let mut sub = pending();
        assert!(sub.schedule_cancellation().is_err());
    }

    #[test]
    fn resume_keeps_stale_end_ts() {
        let mut sub = active();
        sub.schedule_cancellation().unwrap();
        sub.resume().unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.end_ts, 1_700_000_000);
    }

    #[test]
    fn resume_requires_canceling() {
        let mut sub = active();
        assert!(sub.resume().is_err());
    }

    #[test]
    fn replacement_keeps_provider_linkage() {
        let mut old = active();
        old.link_customer("cus_9");
        let new_price = plan_price(9_900);

        let next = old.replacement_for(&new_price);
        old.disable().unwrap();

        assert_ne!(next.id, old.id);
        assert_eq!(next.status, SubscriptionStatus::Active);
        assert_eq!(next.provider_subscription_id, "sub_123");
        assert_eq!(next.provider_customer_id, "cus_9");
        assert_eq!(next.amount_cents, 9_900);
        assert_eq!(next.billing_plan_price_id, Some(new_price.id));
        assert_eq!(old.status, SubscriptionStatus::Disabled);
    }
}
