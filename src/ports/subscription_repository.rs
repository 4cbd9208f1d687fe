//! Subscription repository port (write side).
//!
//! Every lookup excludes disabled rows (status code 200 and above).
//!
//! # Design
//!
//! - **Natural key**: `insert` rejects a second live row for the same
//!   (`organization_id`, `billing_plan_price_id`)
//! - **Provider id**: `insert`/`update` reject a second live row claiming the
//!   same `provider_subscription_id`
//! - **Last write wins**: `update` overwrites every mutable column

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, OrganizationId, PlanPriceId, SubscriptionId};
use crate::domain::subscription::Subscription;

/// Repository port for Subscription persistence.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Save a new subscription.
    ///
    /// # Errors
    ///
    /// - `SubscriptionExists` if a live row already holds the natural key or
    ///   provider subscription id
    /// - `DatabaseError` on persistence failure
    async fn insert(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Update an existing subscription.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if the row doesn't exist
    /// - `SubscriptionExists` on a provider subscription id conflict
    /// - `DatabaseError` on persistence failure
    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Find a subscription by its ID, including disabled rows.
    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError>;

    async fn find_by_provider_subscription_id(
        &self,
        provider_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError>;

    async fn find_by_provider_customer_id(
        &self,
        provider_customer_id: &str,
    ) -> Result<Option<Subscription>, DomainError>;

    /// The organization's current row: the newest one that is not disabled.
    async fn find_active_by_organization(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Checkout lookup key.
    async fn find_by_organization_and_plan_price(
        &self,
        organization_id: &OrganizationId,
        plan_price_id: &PlanPriceId,
    ) -> Result<Option<Subscription>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn SubscriptionRepository) {}
    }
}
