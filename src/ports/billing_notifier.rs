//! Billing notification port.
//!
//! Tells operators about lifecycle milestones. Delivery is best effort:
//! callers log a failed notification and carry on.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::subscription::Subscription;

/// Lifecycle milestone worth telling someone about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingNotice {
    SubscriptionStarted,
    SubscriptionCanceled,
    SubscriptionResumed,
}

impl BillingNotice {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingNotice::SubscriptionStarted => "subscription_started",
            BillingNotice::SubscriptionCanceled => "subscription_canceled",
            BillingNotice::SubscriptionResumed => "subscription_resumed",
        }
    }
}

#[async_trait]
pub trait BillingNotifier: Send + Sync {
    async fn notify(
        &self,
        notice: BillingNotice,
        subscription: &Subscription,
    ) -> Result<(), DomainError>;
}

/// Sends a notice and logs a failure instead of returning it.
pub async fn notify_best_effort(
    notifier: &dyn BillingNotifier,
    notice: BillingNotice,
    subscription: &Subscription,
) {
    if let Err(e) = notifier.notify(notice, subscription).await {
        tracing::warn!(
            notice = notice.as_str(),
            subscription_id = %subscription.id,
            error = %e,
            "Billing notification failed"
        );
    }
}
