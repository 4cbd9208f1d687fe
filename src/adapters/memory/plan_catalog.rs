//! In-memory plan catalog.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::billing::{BillingPlan, PlanPrice};
use crate::domain::foundation::{DomainError, PlanId, PlanPriceId};
use crate::ports::PlanCatalog;

#[derive(Default)]
struct Catalog {
    plans: HashMap<PlanId, BillingPlan>,
    prices: HashMap<PlanPriceId, PlanPrice>,
}

#[derive(Default)]
pub struct InMemoryPlanCatalog {
    catalog: Mutex<Catalog>,
}

impl InMemoryPlanCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plan(self, plan: BillingPlan) -> Self {
        self.catalog().plans.insert(plan.id, plan);
        self
    }

    pub fn with_price(self, price: PlanPrice) -> Self {
        self.catalog().prices.insert(price.id, price);
        self
    }

    pub fn plan(&self, id: &PlanId) -> Option<BillingPlan> {
        self.catalog().plans.get(id).cloned()
    }

    pub fn price(&self, id: &PlanPriceId) -> Option<PlanPrice> {
        self.catalog().prices.get(id).cloned()
    }

    fn catalog(&self) -> MutexGuard<'_, Catalog> {
        self.catalog.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PlanCatalog for InMemoryPlanCatalog {
    async fn find_plan(&self, id: &PlanId) -> Result<Option<BillingPlan>, DomainError> {
        Ok(self.plan(id))
    }

    async fn find_plan_price(&self, id: &PlanPriceId) -> Result<Option<PlanPrice>, DomainError> {
        Ok(self.price(id))
    }

    async fn save_plan(&self, plan: &BillingPlan) -> Result<(), DomainError> {
        self.catalog().plans.insert(plan.id, plan.clone());
        Ok(())
    }

    async fn save_plan_price(&self, price: &PlanPrice) -> Result<(), DomainError> {
        self.catalog().prices.insert(price.id, price.clone());
        Ok(())
    }
}
