//! Subscription reader port (read side).
//!
//! Serves the [`SubscriptionView`] projection, joining the subscription with
//! its plan price and plan.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, OrganizationId};
use crate::domain::subscription::SubscriptionView;

/// Read-only access to subscription projections.
#[async_trait]
pub trait SubscriptionReader: Send + Sync {
    /// The organization's current subscription, if any.
    async fn get_active_view_by_organization(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Option<SubscriptionView>, DomainError>;
}
