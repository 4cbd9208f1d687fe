//! ResumeSubscriptionHandler - Withdraws a scheduled cancellation.

use std::sync::Arc;

use crate::domain::foundation::OrganizationId;
use crate::domain::subscription::{BillingError, Subscription};
use crate::ports::{
    notify_best_effort, BillingNotice, BillingNotifier, PaymentProvider, SubscriptionRepository,
};

use super::lookup::load_current_subscription;

#[derive(Debug, Clone)]
pub struct ResumeSubscriptionCommand {
    pub organization_id: OrganizationId,
}

#[derive(Debug, Clone)]
pub struct ResumeSubscriptionResult {
    pub subscription: Subscription,
}

/// Handler for resuming a CANCELING subscription.
///
/// `end_ts` keeps the value set at cancel time.
pub struct ResumeSubscriptionHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    provider: Arc<dyn PaymentProvider>,
    notifier: Arc<dyn BillingNotifier>,
}

impl ResumeSubscriptionHandler {
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
        cmd: ResumeSubscriptionCommand,
    ) -> Result<ResumeSubscriptionResult, BillingError> {
        // 1. Find the organization's current subscription
        let current =
            load_current_subscription(self.subscriptions.as_ref(), &cmd.organization_id).await?;

        // 2. Check the transition before touching the provider
        let mut subscription = current.clone();
        subscription.resume()?;

        // 3. Undo the cancellation on the provider
        self.provider
            .resume(&subscription.provider_subscription_id)
            .await?;

        // 4. Persist the update
        self.subscriptions.update(&subscription).await?;

        tracing::info!(
            organization_id = %cmd.organization_id,
            subscription_id = %subscription.id,
            "Subscription resumed"
        );

        notify_best_effort(
            self.notifier.as_ref(),
            BillingNotice::SubscriptionResumed,
            &subscription,
        )
        .await;

        Ok(ResumeSubscriptionResult { subscription })
    }
}
