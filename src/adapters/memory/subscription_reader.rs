//! In-memory subscription reader.
//!
//! Projects rows from [`InMemorySubscriptionRepository`] joined with
//! [`InMemoryPlanCatalog`], the way the SQL reader joins tables.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, OrganizationId};
use crate::domain::subscription::{Subscription, SubscriptionView};
use crate::ports::{SubscriptionReader, SubscriptionRepository};

use super::{InMemoryPlanCatalog, InMemorySubscriptionRepository};

pub struct InMemorySubscriptionReader {
    subscriptions: Arc<InMemorySubscriptionRepository>,
    catalog: Arc<InMemoryPlanCatalog>,
}

impl InMemorySubscriptionReader {
    pub fn new(
        subscriptions: Arc<InMemorySubscriptionRepository>,
        catalog: Arc<InMemoryPlanCatalog>,
    ) -> Self {
        Self {
            subscriptions,
            catalog,
        }
    }

    fn project(&self, sub: Subscription) -> SubscriptionView {
        let price = sub
            .billing_plan_price_id
            .as_ref()
            .and_then(|id| self.catalog.price(id));
        let plan = price.as_ref().and_then(|p| self.catalog.plan(&p.plan_id));

        SubscriptionView {
            id: sub.id,
            organization_id: sub.organization_id,
            billing_plan_price_id: sub.billing_plan_price_id,
            provider_subscription_id: sub.provider_subscription_id,
            status: sub.status,
            start_ts: sub.start_ts,
            end_ts: sub.end_ts,
            trial_end_ts: sub.trial_end_ts,
            next_billing_ts: sub.next_billing_ts,
            billing_cycle: sub.billing_cycle,
            amount_cents: sub.amount_cents,
            coupon_code: sub.coupon_code,
            billing_info: sub.billing_info,
            plan_price_cents: price.as_ref().map(|p| p.price_cents),
            currency: price.map(|p| p.currency),
            plan_name: plan.as_ref().map(|p| p.name.clone()),
            plan_level: plan.map(|p| p.level),
        }
    }
}

#[async_trait]
impl SubscriptionReader for InMemorySubscriptionReader {
    async fn get_active_view_by_organization(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Option<SubscriptionView>, DomainError> {
        let current = self
            .subscriptions
            .find_active_by_organization(organization_id)
            .await?;
        Ok(current.map(|sub| self.project(sub)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{BillingCycle, BillingPlan, PlanPrice};

    #[tokio::test]
    async fn view_joins_plan_and_price() {
        let plan = BillingPlan::new("Pro", "For teams", 2).unwrap();
        let price = PlanPrice::new(plan.id, "Pro Monthly", 2_900, BillingCycle::Monthly).unwrap();
        let catalog = Arc::new(
            InMemoryPlanCatalog::new()
                .with_plan(plan.clone())
                .with_price(price.clone()),
        );
        let subscriptions = Arc::new(InMemorySubscriptionRepository::new());
        let org = OrganizationId::new();
        subscriptions
            .insert(&Subscription::pending(org, &price, None))
            .await
            .unwrap();

        let reader = InMemorySubscriptionReader::new(subscriptions, catalog);
        let view = reader.get_active_view_by_organization(&org).await.unwrap().unwrap();

        assert_eq!(view.plan_name.as_deref(), Some("Pro"));
        assert_eq!(view.plan_level, Some(2));
        assert_eq!(view.plan_price_cents, Some(2_900));
        assert_eq!(view.currency.as_deref(), Some("USD"));
    }

    #[tokio::test]
    async fn no_subscription_gives_none() {
        let reader = InMemorySubscriptionReader::new(
            Arc::new(InMemorySubscriptionRepository::new()),
            Arc::new(InMemoryPlanCatalog::new()),
        );
        let view = reader
            .get_active_view_by_organization(&OrganizationId::new())
            .await
            .unwrap();
        assert!(view.is_none());
    }
}
