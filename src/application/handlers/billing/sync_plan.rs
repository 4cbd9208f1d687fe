//! Catalog synchronization handlers.
//!
//! Keep the provider's products and prices in step with local plans and plan
//! prices. Updates diff a before-snapshot against the edited entity and only
//! call the provider when a provider-relevant field changed.

use std::sync::Arc;

use crate::domain::billing::{
    BillingPlan, BillingPlanChanges, PlanPrice, PlanPriceChanges, PlanPriceSnapshot, PlanSnapshot,
};
use crate::domain::foundation::{DomainError, PlanId, PlanPriceId};
use crate::domain::subscription::BillingError;
use crate::ports::{CreatePriceRequest, PaymentProvider, PlanCatalog};

use super::lookup::load_plan_price;

async fn load_plan(catalog: &dyn PlanCatalog, id: &PlanId) -> Result<BillingPlan, BillingError> {
    catalog
        .find_plan(id)
        .await?
        .ok_or_else(|| BillingError::not_found("Plan", id))
}

// ════════════════════════════════════════════════════════════════════════════
// Plan products
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct CreatePlanProductCommand {
    pub plan_id: PlanId,
}

/// Registers a plan as a provider product.
pub struct CreatePlanProductHandler {
    catalog: Arc<dyn PlanCatalog>,
    provider: Arc<dyn PaymentProvider>,
}

impl CreatePlanProductHandler {
    pub fn new(catalog: Arc<dyn PlanCatalog>, provider: Arc<dyn PaymentProvider>) -> Self {
        Self { catalog, provider }
    }

    pub async fn handle(&self, cmd: CreatePlanProductCommand) -> Result<BillingPlan, BillingError> {
        let mut plan = load_plan(self.catalog.as_ref(), &cmd.plan_id).await?;

        if plan.provider_product_id.is_some() {
            return Ok(plan);
        }

        let product = self
            .provider
            .create_product(&plan.name, &plan.description)
            .await?;

        plan.provider_product_id = Some(product.id);
        self.catalog.save_plan(&plan).await?;

        tracing::info!(
            plan_id = %plan.id,
            product_id = ?plan.provider_product_id,
            "Provider product created"
        );
        Ok(plan)
    }
}

#[derive(Debug, Clone)]
pub struct UpdatePlanProductCommand {
    pub plan_id: PlanId,
    pub changes: BillingPlanChanges,
}

#[derive(Debug, Clone)]
pub struct UpdatePlanProductResult {
    pub plan: BillingPlan,
    /// True when the provider product was updated.
    pub provider_synced: bool,
}

pub struct UpdatePlanProductHandler {
    catalog: Arc<dyn PlanCatalog>,
    provider: Arc<dyn PaymentProvider>,
}

impl UpdatePlanProductHandler {
    pub fn new(catalog: Arc<dyn PlanCatalog>, provider: Arc<dyn PaymentProvider>) -> Self {
        Self { catalog, provider }
    }

    pub async fn handle(
        &self,
        cmd: UpdatePlanProductCommand,
    ) -> Result<UpdatePlanProductResult, BillingError> {
        // 1. Snapshot, then apply the edit
        let mut plan = load_plan(self.catalog.as_ref(), &cmd.plan_id).await?;
        let before = PlanSnapshot::capture(&plan);
        plan.apply(cmd.changes).map_err(DomainError::from)?;

        // 2. Tell the provider only about provider-relevant changes
        let provider_synced = before.has_provider_changes(&plan);
        if provider_synced {
            let product_id = plan.provider_product_id.as_deref().ok_or_else(|| {
                BillingError::validation("provider_product_id", "Plan has no provider product")
            })?;
            self.provider
                .update_product(product_id, &plan.name, &plan.description)
                .await?;
        }

        // 3. Save locally
        self.catalog.save_plan(&plan).await?;

        tracing::debug!(
            plan_id = %plan.id,
            changed = ?before.changed_fields(&plan),
            provider_synced,
            "Plan updated"
        );

        Ok(UpdatePlanProductResult {
            plan,
            provider_synced,
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Plan prices
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct CreatePlanPriceCommand {
    pub plan_price_id: PlanPriceId,
}

/// Registers a plan price as a recurring provider price under the plan's
/// product.
pub struct CreatePlanPriceHandler {
    catalog: Arc<dyn PlanCatalog>,
    provider: Arc<dyn PaymentProvider>,
}

impl CreatePlanPriceHandler {
    pub fn new(catalog: Arc<dyn PlanCatalog>, provider: Arc<dyn PaymentProvider>) -> Self {
        Self { catalog, provider }
    }

    pub async fn handle(&self, cmd: CreatePlanPriceCommand) -> Result<PlanPrice, BillingError> {
        let mut price = load_plan_price(self.catalog.as_ref(), &cmd.plan_price_id).await?;
        if price.provider_price_id.is_some() {
            return Ok(price);
        }

        let plan = load_plan(self.catalog.as_ref(), &price.plan_id).await?;
        let product_id = plan.provider_product_id.ok_or_else(|| {
            BillingError::validation("provider_product_id", "Plan has no provider product")
        })?;

        let provider_price = self
            .provider
            .create_price(CreatePriceRequest {
                product_id,
                unit_amount_cents: price.price_cents,
                currency: price.currency.clone(),
                billing_cycle: price.billing_cycle,
            })
            .await?;

        price.provider_price_id = Some(provider_price.id);
        self.catalog.save_plan_price(&price).await?;

        tracing::info!(
            plan_price_id = %price.id,
            provider_price_id = ?price.provider_price_id,
            "Provider price created"
        );
        Ok(price)
    }
}

#[derive(Debug, Clone)]
pub struct UpdatePlanPriceCommand {
    pub plan_price_id: PlanPriceId,
    pub changes: PlanPriceChanges,
}

#[derive(Debug, Clone)]
pub struct UpdatePlanPriceResult {
    pub price: PlanPrice,
    pub provider_synced: bool,
}

pub struct UpdatePlanPriceHandler {
    catalog: Arc<dyn PlanCatalog>,
    provider: Arc<dyn PaymentProvider>,
}

impl UpdatePlanPriceHandler {
    pub fn new(catalog: Arc<dyn PlanCatalog>, provider: Arc<dyn PaymentProvider>) -> Self {
        Self { catalog, provider }
    }

    pub async fn handle(
        &self,
        cmd: UpdatePlanPriceCommand,
    ) -> Result<UpdatePlanPriceResult, BillingError> {
        let mut price = load_plan_price(self.catalog.as_ref(), &cmd.plan_price_id).await?;
        let before = PlanPriceSnapshot::capture(&price);
        price.apply(cmd.changes).map_err(DomainError::from)?;

        let provider_synced = before.has_provider_changes(&price);
        if provider_synced {
            let provider_price_id = price.provider_price_id.as_deref().ok_or_else(|| {
                BillingError::validation("provider_price_id", "Plan price has no provider price")
            })?;
            self.provider
                .update_price(provider_price_id, &price.currency, price.price_cents)
                .await?;
        }

        self.catalog.save_plan_price(&price).await?;

        Ok(UpdatePlanPriceResult {
            price,
            provider_synced,
        })
    }
}
