//! ChangePlanHandler - Moves an organization to a different plan price.
//!
//! Provider first, local second: the provider swaps the price on the
//! subscription's single line item, keeping the same provider subscription.
//! Locally the old row is disabled and a new ACTIVE row takes its place.
//! A local failure after the provider call is reported, not compensated.

use std::sync::Arc;

use crate::domain::foundation::{OrganizationId, PlanPriceId};
use crate::domain::subscription::{BillingError, Subscription};
use crate::ports::{OrganizationRepository, PaymentProvider, PlanCatalog, SubscriptionRepository};

use super::lookup::{load_current_subscription, load_organization, load_plan_price};

#[derive(Debug, Clone)]
pub struct ChangePlanCommand {
    pub organization_id: OrganizationId,
    pub new_plan_price_id: PlanPriceId,
}

#[derive(Debug, Clone)]
pub struct ChangePlanResult {
    /// The superseded row, now DISABLED.
    pub previous: Subscription,
    /// The new ACTIVE row.
    pub subscription: Subscription,
}

pub struct ChangePlanHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    organizations: Arc<dyn OrganizationRepository>,
    catalog: Arc<dyn PlanCatalog>,
    provider: Arc<dyn PaymentProvider>,
}

impl ChangePlanHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        organizations: Arc<dyn OrganizationRepository>,
        catalog: Arc<dyn PlanCatalog>,
        provider: Arc<dyn PaymentProvider>,
    ) -> Self {
        Self {
            subscriptions,
            organizations,
            catalog,
            provider,
        }
    }

    pub async fn handle(&self, cmd: ChangePlanCommand) -> Result<ChangePlanResult, BillingError> {
        // 1. Find the current subscription and the target price
        let current =
            load_current_subscription(self.subscriptions.as_ref(), &cmd.organization_id).await?;

        if current.billing_plan_price_id == Some(cmd.new_plan_price_id) {
            return Err(BillingError::validation(
                "plan_price_id",
                "Organization is already on this plan",
            ));
        }

        let new_price = load_plan_price(self.catalog.as_ref(), &cmd.new_plan_price_id).await?;
        let new_provider_price = new_price.provider_price_id.clone().ok_or_else(|| {
            BillingError::validation("plan_price_id", "Plan price is not registered with the provider")
        })?;

        if !current.has_provider_subscription() {
            return Err(BillingError::validation(
                "subscription",
                "Subscription has no provider subscription to change",
            ));
        }

        // 2. Check the transition before touching the provider
        let mut previous = current.clone();
        previous.disable()?;

        // 3. Swap the price on the provider subscription's line item
        let provider_sub = self
            .provider
            .get_subscription_by_id(&current.provider_subscription_id)
            .await?;
        let item = provider_sub.single_item().ok_or_else(|| {
            BillingError::validation(
                "subscription",
                format!(
                    "Expected exactly one line item, found {}",
                    provider_sub.items.len()
                ),
            )
        })?;

        let updated = self
            .provider
            .change_item_price(&provider_sub.id, &item.id, &new_provider_price, true)
            .await?;

        // 4. Disable the old row first so the provider id is free, then insert
        let mut subscription = current.replacement_for(&new_price);
        subscription.record_provider_period(&updated.period());

        self.subscriptions.update(&previous).await?;
        self.subscriptions.insert(&subscription).await?;

        // 5. Point the organization at the new price
        let mut organization =
            load_organization(self.organizations.as_ref(), &cmd.organization_id).await?;
        organization.point_to_plan_price(Some(new_price.id));
        self.organizations.update(&organization).await?;

        tracing::info!(
            organization_id = %cmd.organization_id,
            previous_subscription_id = %previous.id,
            subscription_id = %subscription.id,
            provider_subscription_id = %subscription.provider_subscription_id,
            new_plan_price_id = %new_price.id,
            "Plan changed"
        );

        Ok(ChangePlanResult {
            previous,
            subscription,
        })
    }
}
