//! DispatchWebhookEventHandler - Applies a verified provider subscription
//! event to the local row.
//!
//! Runs on the webhook worker, after the provider has already received its
//! 200. Errors go to the worker's log and completion channel; nothing is
//! retried.

use std::sync::Arc;

use crate::domain::subscription::{BillingError, Subscription, SubscriptionStatus};
use crate::domain::webhook::{SubscriptionEvent, SubscriptionEventKind};
use crate::ports::{PaymentProvider, SubscriptionRepository};

use super::merge_billing_info::merge_billing_info;

/// Result of dispatching one event.
#[derive(Debug, Clone)]
pub struct DispatchWebhookEventResult {
    pub subscription: Subscription,
    pub previous_status: SubscriptionStatus,
    /// False when the event matched the stored state and nothing was written.
    pub written: bool,
}

pub struct DispatchWebhookEventHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    provider: Arc<dyn PaymentProvider>,
}

impl DispatchWebhookEventHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        provider: Arc<dyn PaymentProvider>,
    ) -> Self {
        Self {
            subscriptions,
            provider,
        }
    }

    pub async fn handle(
        &self,
        event: SubscriptionEvent,
    ) -> Result<DispatchWebhookEventResult, BillingError> {
        let provider_subscription_id = event.subscription.id.as_str();

        // 1. Find the local row by provider subscription id
        let mut subscription = self
            .subscriptions
            .find_by_provider_subscription_id(provider_subscription_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Subscription", provider_subscription_id))?;

        let before = subscription.clone();

        // 2. Apply the transition
        match event.kind {
            SubscriptionEventKind::Active => {
                subscription.process_active(&event.subscription.period())?;
            }
            SubscriptionEventKind::TrialStarted => {
                subscription.process_trial_started(&event.subscription.period())?;
            }
            SubscriptionEventKind::Canceled => subscription.process_canceled()?,
            SubscriptionEventKind::Paused => subscription.process_paused()?,
            SubscriptionEventKind::Unpaid => subscription.process_unpaid()?,
        }

        if let Some(customer) = event.subscription.customer.as_deref() {
            subscription.link_customer(customer);
        }

        // 3. Capture billing info the first time the subscription is live
        if matches!(
            event.kind,
            SubscriptionEventKind::Active | SubscriptionEventKind::TrialStarted
        ) && subscription.billing_info.is_empty()
        {
            self.capture_billing_info(&mut subscription).await;
        }

        // 4. Persist only real changes
        let written = materially_changed(&before, &subscription);
        if written {
            self.subscriptions.update(&subscription).await?;
        }

        tracing::info!(
            event_id = %event.event_id,
            event_kind = event.kind.as_str(),
            subscription_id = %subscription.id,
            provider_subscription_id = %subscription.provider_subscription_id,
            from = %before.status,
            to = %subscription.status,
            written,
            "Webhook event applied"
        );

        Ok(DispatchWebhookEventResult {
            subscription,
            previous_status: before.status,
            written,
        })
    }

    /// Fetches the expanded provider subscription for its payment method.
    /// A failed fetch is logged and does not block the status change.
    async fn capture_billing_info(&self, subscription: &mut Subscription) {
        match self
            .provider
            .get_subscription_by_id(&subscription.provider_subscription_id)
            .await
        {
            Ok(provider_sub) => {
                merge_billing_info(subscription, provider_sub.payment_method.as_ref());
            }
            Err(e) => {
                tracing::warn!(
                    provider_subscription_id = %subscription.provider_subscription_id,
                    error = %e,
                    "Could not fetch payment method for billing info"
                );
            }
        }
    }
}

/// Compares everything except `updated_at`, which every transition touches.
fn materially_changed(before: &Subscription, after: &Subscription) -> bool {
    let mut normalized = after.clone();
    normalized.updated_at = before.updated_at;
    normalized != *before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemorySubscriptionRepository;
    use crate::adapters::stripe::MockPaymentProvider;
    use crate::domain::billing::{BillingCycle, PlanPrice};
    use crate::domain::foundation::{OrganizationId, PlanId};
    use crate::domain::subscription::BillingInfo;
    use crate::domain::webhook::SubscriptionObject;
    use crate::ports::PaymentError;

    fn object(id: &str) -> SubscriptionObject {
        SubscriptionObject {
            id: id.to_string(),
            customer: Some("cus_1".to_string()),
            status: "active".to_string(),
            canceled_at: None,
            cancel_at: None,
            current_period_start: Some(1_700_000_000),
            current_period_end: Some(1_702_592_000),
            trial_end: None,
        }
    }

    fn event(kind: SubscriptionEventKind, subscription: SubscriptionObject) -> SubscriptionEvent {
        SubscriptionEvent {
            event_id: "evt_1".to_string(),
            kind,
            subscription,
        }
    }

    fn pending_row(provider_id: &str) -> Subscription {
        let price = PlanPrice::new(PlanId::new(), "Pro", 2_900, BillingCycle::Monthly).unwrap();
        let mut sub = Subscription::pending(OrganizationId::new(), &price, None);
        sub.claim_provider_subscription(provider_id);
        sub
    }

    async fn setup(
        row: Subscription,
    ) -> (
        Arc<InMemorySubscriptionRepository>,
        MockPaymentProvider,
        DispatchWebhookEventHandler,
    ) {
        let repo = Arc::new(InMemorySubscriptionRepository::new());
        repo.insert(&row).await.unwrap();
        let provider = MockPaymentProvider::new();
        let handler = DispatchWebhookEventHandler::new(repo.clone(), Arc::new(provider.clone()));
        (repo, provider, handler)
    }

    #[tokio::test]
    async fn active_event_activates_and_captures_billing_info() {
        let row = pending_row("sub_123");
        let (repo, provider, handler) = setup(row.clone()).await;
        provider.add_subscription(MockPaymentProvider::active_subscription("sub_123", "cus_1", "price_1"));

        let result = handler
            .handle(event(SubscriptionEventKind::Active, object("sub_123")))
            .await
            .unwrap();

        assert!(result.written);
        assert_eq!(result.previous_status, SubscriptionStatus::Pending);
        let stored = repo.find_by_id(&row.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Active);
        assert_eq!(stored.start_ts, 1_700_000_000);
        assert_eq!(stored.next_billing_ts, 1_702_592_000);
        assert_eq!(stored.billing_info.card_last4, "4242");
        assert_eq!(stored.provider_customer_id, "cus_1");
    }

    #[tokio::test]
    async fn trial_started_lands_on_active() {
        let (_, _, handler) = setup(pending_row("sub_123")).await;
        let mut obj = object("sub_123");
        obj.status = "trialing".to_string();
        obj.trial_end = Some(1_701_000_000);

        let result = handler
            .handle(event(SubscriptionEventKind::TrialStarted, obj))
            .await
            .unwrap();

        assert_eq!(result.subscription.status, SubscriptionStatus::Active);
        assert_eq!(result.subscription.trial_end_ts, 1_701_000_000);
    }

    #[tokio::test]
    async fn active_event_with_cancel_scheduled_lands_canceling() {
        let (_, _, handler) = setup(pending_row("sub_123")).await;
        let mut obj = object("sub_123");
        obj.canceled_at = Some(1_701_000_000);
        obj.cancel_at = Some(1_702_592_000);

        let result = handler
            .handle(event(SubscriptionEventKind::Active, obj))
            .await
            .unwrap();

        assert_eq!(result.subscription.status, SubscriptionStatus::Canceling);
        assert_eq!(result.subscription.end_ts, 1_702_592_000);
    }

    #[tokio::test]
    async fn canceled_event_cancels_immediately() {
        let mut row = pending_row("sub_123");
        row.activate().unwrap();
        row.schedule_cancellation().unwrap();
        let (repo, _, handler) = setup(row.clone()).await;

        handler
            .handle(event(SubscriptionEventKind::Canceled, object("sub_123")))
            .await
            .unwrap();

        let stored = repo.find_by_id(&row.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Cancelled);
    }

    #[tokio::test]
    async fn paused_event_cancels() {
        let mut row = pending_row("sub_123");
        row.activate().unwrap();
        let (_, _, handler) = setup(row).await;

        let result = handler
            .handle(event(SubscriptionEventKind::Paused, object("sub_123")))
            .await
            .unwrap();

        assert_eq!(result.subscription.status, SubscriptionStatus::Cancelled);
    }

    #[tokio::test]
    async fn unpaid_event_lands_unpaid_canceled() {
        let mut row = pending_row("sub_123");
        row.activate().unwrap();
        let (_, _, handler) = setup(row).await;

        let result = handler
            .handle(event(SubscriptionEventKind::Unpaid, object("sub_123")))
            .await
            .unwrap();

        assert_eq!(result.subscription.status, SubscriptionStatus::UnpaidCanceled);
    }

    #[tokio::test]
    async fn unknown_provider_subscription_is_not_found() {
        let (_, _, handler) = setup(pending_row("sub_other")).await;

        let err = handler
            .handle(event(SubscriptionEventKind::Active, object("sub_123")))
            .await
            .unwrap_err();

        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn redelivered_event_writes_nothing() {
        let (_, _, handler) = setup(pending_row("sub_123")).await;
        let first = handler
            .handle(event(SubscriptionEventKind::Active, object("sub_123")))
            .await
            .unwrap();
        assert!(first.written);

        let second = handler
            .handle(event(SubscriptionEventKind::Active, object("sub_123")))
            .await
            .unwrap();

        assert!(!second.written);
        assert_eq!(second.subscription.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn billing_info_fetch_failure_still_activates() {
        let (_, provider, handler) = setup(pending_row("sub_123")).await;
        provider.set_method_error("get_subscription_by_id", PaymentError::network("timeout"));

        let result = handler
            .handle(event(SubscriptionEventKind::Active, object("sub_123")))
            .await
            .unwrap();

        assert_eq!(result.subscription.status, SubscriptionStatus::Active);
        assert!(result.subscription.billing_info.is_empty());
    }

    #[tokio::test]
    async fn captured_billing_info_is_not_refetched() {
        let mut row = pending_row("sub_123");
        row.capture_billing_info(BillingInfo {
            card_type: "amex".into(),
            card_last4: "0005".into(),
            ..BillingInfo::default()
        });
        let (_, provider, handler) = setup(row).await;

        handler
            .handle(event(SubscriptionEventKind::Active, object("sub_123")))
            .await
            .unwrap();

        assert!(!provider.was_called("get_subscription_by_id"));
    }

    #[test]
    fn updated_at_alone_is_not_a_change() {
        let before = pending_row("sub_123");
        let mut after = before.clone();
        after.updated_at = crate::domain::foundation::Timestamp::now();
        assert!(!materially_changed(&before, &after));

        after.end_ts = 5;
        assert!(materially_changed(&before, &after));
    }
}
