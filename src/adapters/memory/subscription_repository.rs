//! In-memory subscription repository.
//!
//! Enforces the same uniqueness rules as the Postgres schema so races between
//! the checkout and webhook paths behave identically in tests.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::foundation::{
    DomainError, ErrorCode, OrganizationId, PlanPriceId, SubscriptionId,
};
use crate::domain::subscription::Subscription;
use crate::ports::SubscriptionRepository;

/// Subscription rows held in insertion order.
#[derive(Default)]
pub struct InMemorySubscriptionRepository {
    rows: Mutex<Vec<Subscription>>,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every row, disabled ones included.
    pub fn all(&self) -> Vec<Subscription> {
        self.rows().clone()
    }

    pub fn len(&self) -> usize {
        self.rows().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }

    fn rows(&self) -> MutexGuard<'_, Vec<Subscription>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn conflict(rows: &[Subscription], candidate: &Subscription) -> Option<DomainError> {
        if candidate.is_disabled() {
            return None;
        }
        let live_others = rows
            .iter()
            .filter(|r| r.id != candidate.id && !r.is_disabled());

        for other in live_others {
            if candidate.has_provider_subscription()
                && other.provider_subscription_id == candidate.provider_subscription_id
            {
                return Some(
                    DomainError::new(
                        ErrorCode::SubscriptionExists,
                        "Provider subscription already linked to another subscription",
                    )
                    .with_detail("provider_subscription_id", &candidate.provider_subscription_id),
                );
            }
            if other.organization_id == candidate.organization_id
                && other.billing_plan_price_id.is_some()
                && other.billing_plan_price_id == candidate.billing_plan_price_id
            {
                return Some(DomainError::new(
                    ErrorCode::SubscriptionExists,
                    "Subscription already exists for organization and plan price",
                ));
            }
        }
        None
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn insert(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut rows = self.rows();
        if let Some(err) = Self::conflict(&rows, subscription) {
            return Err(err);
        }
        rows.push(subscription.clone());
        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut rows = self.rows();
        if let Some(err) = Self::conflict(&rows, subscription) {
            return Err(err);
        }
        let row = rows
            .iter_mut()
            .find(|r| r.id == subscription.id)
            .ok_or_else(|| {
                DomainError::new(ErrorCode::SubscriptionNotFound, "Subscription not found")
                    .with_detail("resource", "Subscription")
                    .with_detail("key", subscription.id.to_string())
            })?;
        *row = subscription.clone();
        Ok(())
    }

    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError> {
        Ok(self.rows().iter().find(|r| &r.id == id).cloned())
    }

    async fn find_by_provider_subscription_id(
        &self,
        provider_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        if provider_subscription_id.is_empty() {
            return Ok(None);
        }
        Ok(self
            .rows()
            .iter()
            .rev()
            .find(|r| !r.is_disabled() && r.provider_subscription_id == provider_subscription_id)
            .cloned())
    }

    async fn find_by_provider_customer_id(
        &self,
        provider_customer_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        if provider_customer_id.is_empty() {
            return Ok(None);
        }
        Ok(self
            .rows()
            .iter()
            .rev()
            .find(|r| !r.is_disabled() && r.provider_customer_id == provider_customer_id)
            .cloned())
    }

    async fn find_active_by_organization(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self
            .rows()
            .iter()
            .rev()
            .find(|r| &r.organization_id == organization_id && !r.is_disabled())
            .cloned())
    }

    async fn find_by_organization_and_plan_price(
        &self,
        organization_id: &OrganizationId,
        plan_price_id: &PlanPriceId,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self
            .rows()
            .iter()
            .rev()
            .find(|r| {
                !r.is_disabled()
                    && &r.organization_id == organization_id
                    && r.billing_plan_price_id.as_ref() == Some(plan_price_id)
            })
            .cloned())
    }
}
