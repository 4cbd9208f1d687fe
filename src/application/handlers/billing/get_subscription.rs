//! GetSubscriptionHandler - Query handler for an organization's subscription.

use std::sync::Arc;

use crate::domain::foundation::OrganizationId;
use crate::domain::subscription::{BillingError, SubscriptionView};
use crate::ports::SubscriptionReader;

/// Query to get an organization's current subscription.
#[derive(Debug, Clone)]
pub struct GetSubscriptionQuery {
    pub organization_id: OrganizationId,
}

/// `None` when the organization has no live subscription.
pub type GetSubscriptionResult = Option<SubscriptionView>;

pub struct GetSubscriptionHandler {
    reader: Arc<dyn SubscriptionReader>,
}

impl GetSubscriptionHandler {
    pub fn new(reader: Arc<dyn SubscriptionReader>) -> Self {
        Self { reader }
    }

    pub async fn handle(
        &self,
        query: GetSubscriptionQuery,
    ) -> Result<GetSubscriptionResult, BillingError> {
        self.reader
            .get_active_view_by_organization(&query.organization_id)
            .await
            .map_err(|e| BillingError::infrastructure(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryPlanCatalog, InMemorySubscriptionReader, InMemorySubscriptionRepository,
    };
    use crate::domain::billing::{BillingCycle, BillingPlan, PlanPrice};
    use crate::domain::foundation::{DomainError, ErrorCode};
    use crate::domain::subscription::{Subscription, SubscriptionStatus};
    use crate::ports::SubscriptionRepository;
    use async_trait::async_trait;

    // ════════════════════════════════════════════════════════════════════════════
    // Mock Implementation
    // ════════════════════════════════════════════════════════════════════════════

    struct FailingReader;

    #[async_trait]
    impl SubscriptionReader for FailingReader {
        async fn get_active_view_by_organization(
            &self,
            _organization_id: &OrganizationId,
        ) -> Result<Option<SubscriptionView>, DomainError> {
            Err(DomainError::new(ErrorCode::DatabaseError, "connection reset"))
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn returns_view_joined_with_plan() {
        let plan = BillingPlan::new("Pro", "", 3).unwrap();
        let price = PlanPrice::new(plan.id, "Pro Yearly", 29_900, BillingCycle::Annually).unwrap();
        let catalog = Arc::new(
            InMemoryPlanCatalog::new()
                .with_plan(plan)
                .with_price(price.clone()),
        );
        let repo = Arc::new(InMemorySubscriptionRepository::new());
        let org = OrganizationId::new();
        let mut sub = Subscription::pending(org, &price, None);
        sub.activate().unwrap();
        repo.insert(&sub).await.unwrap();

        let handler =
            GetSubscriptionHandler::new(Arc::new(InMemorySubscriptionReader::new(repo, catalog)));
        let view = handler
            .handle(GetSubscriptionQuery { organization_id: org })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(view.status, SubscriptionStatus::Active);
        assert_eq!(view.plan_name.as_deref(), Some("Pro"));
        assert_eq!(view.plan_level, Some(3));
        assert_eq!(view.plan_price_cents, Some(29_900));
        assert!(view.has_access());
    }

    #[tokio::test]
    async fn no_subscription_returns_none() {
        let handler = GetSubscriptionHandler::new(Arc::new(InMemorySubscriptionReader::new(
            Arc::new(InMemorySubscriptionRepository::new()),
            Arc::new(InMemoryPlanCatalog::new()),
        )));

        let result = handler
            .handle(GetSubscriptionQuery {
                organization_id: OrganizationId::new(),
            })
            .await
            .unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn reader_failure_is_infrastructure() {
        let handler = GetSubscriptionHandler::new(Arc::new(FailingReader));

        let err = handler
            .handle(GetSubscriptionQuery {
                organization_id: OrganizationId::new(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::Infrastructure(_)));
    }
}
