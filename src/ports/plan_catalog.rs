//! Plan catalog port.
//!
//! Plans and their prices, including the provider product/price linkage.

use async_trait::async_trait;

use crate::domain::billing::{BillingPlan, PlanPrice};
use crate::domain::foundation::{DomainError, PlanId, PlanPriceId};

#[async_trait]
pub trait PlanCatalog: Send + Sync {
    async fn find_plan(&self, id: &PlanId) -> Result<Option<BillingPlan>, DomainError>;

    async fn find_plan_price(&self, id: &PlanPriceId) -> Result<Option<PlanPrice>, DomainError>;

    /// Insert or update a plan.
    async fn save_plan(&self, plan: &BillingPlan) -> Result<(), DomainError>;

    /// Insert or update a plan price.
    async fn save_plan_price(&self, price: &PlanPrice) -> Result<(), DomainError>;
}
