//! CancelSubscriptionHandler - Schedules cancellation at period end.
//!
//! Provider first: the local row only moves to CANCELING once the provider
//! accepted the cancellation. Access continues until `end_ts`.

use std::sync::Arc;

use crate::domain::foundation::OrganizationId;
use crate::domain::subscription::{BillingError, Subscription};
use crate::ports::{
    notify_best_effort, BillingNotice, BillingNotifier, PaymentProvider, SubscriptionRepository,
};

use super::lookup::load_current_subscription;

/// Command to cancel an organization's subscription.
#[derive(Debug, Clone)]
pub struct CancelSubscriptionCommand {
    pub organization_id: OrganizationId,
}

/// Result of a scheduled cancellation.
#[derive(Debug, Clone)]
pub struct CancelSubscriptionResult {
    pub subscription: Subscription,
    /// When access ends (epoch seconds).
    pub effective_at: i64,
}

pub struct CancelSubscriptionHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    provider: Arc<dyn PaymentProvider>,
    notifier: Arc<dyn BillingNotifier>,
}

impl CancelSubscriptionHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        provider: Arc<dyn PaymentProvider>,
        notifier: Arc<dyn BillingNotifier>,
    ) -> Self {
        Self {
            subscriptions,
            provider,
            notifier,
        }
    }

    pub async fn handle(
        &self,
        cmd: CancelSubscriptionCommand,
    ) -> Result<CancelSubscriptionResult, BillingError> {
        // 1. Find the organization's current subscription
        let current =
            load_current_subscription(self.subscriptions.as_ref(), &cmd.organization_id).await?;

        if !current.has_provider_subscription() {
            return Err(BillingError::validation(
                "subscription",
                "Subscription has no provider subscription to cancel",
            ));
        }

        // 2. Check the transition before touching the provider
        let mut subscription = current.clone();
        subscription.schedule_cancellation()?;

        // 3. Schedule cancellation on the provider
        self.provider
            .cancel(&subscription.provider_subscription_id)
            .await?;

        // 4. Persist the update
        self.subscriptions.update(&subscription).await?;

        tracing::info!(
            organization_id = %cmd.organization_id,
            subscription_id = %subscription.id,
            end_ts = subscription.end_ts,
            "Subscription cancellation scheduled"
        );

        notify_best_effort(
            self.notifier.as_ref(),
            BillingNotice::SubscriptionCanceled,
            &subscription,
        )
        .await;

        Ok(CancelSubscriptionResult {
            effective_at: subscription.end_ts,
            subscription,
        })
    }
}
