//! In-memory notifier for tests.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId};
use crate::domain::subscription::Subscription;
use crate::ports::{BillingNotice, BillingNotifier};

/// Records every notice; can be told to fail.
///
/// Clones share state.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    inner: Arc<Mutex<Recorded>>,
}

#[derive(Default)]
struct Recorded {
    notices: Vec<(BillingNotice, SubscriptionId)>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifier whose every delivery fails.
    pub fn failing() -> Self {
        let notifier = Self::default();
        notifier.state().fail = true;
        notifier
    }

    pub fn notices(&self) -> Vec<BillingNotice> {
        self.state().notices.iter().map(|(n, _)| *n).collect()
    }

    pub fn sent_for(&self, subscription_id: &SubscriptionId) -> Vec<BillingNotice> {
        self.state()
            .notices
            .iter()
            .filter(|(_, id)| id == subscription_id)
            .map(|(n, _)| *n)
            .collect()
    }

    fn state(&self) -> MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl BillingNotifier for RecordingNotifier {
    async fn notify(
        &self,
        notice: BillingNotice,
        subscription: &Subscription,
    ) -> Result<(), DomainError> {
        let mut state = self.state();
        state.notices.push((notice, subscription.id));
        if state.fail {
            return Err(DomainError::new(
                ErrorCode::ExternalServiceError,
                "notification channel unavailable",
            ));
        }
        Ok(())
    }
}
