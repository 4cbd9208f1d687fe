//! Billing catalog and tenant linkage.
//!
//! - `billing_cycle` - charge cadence
//! - `plan` - plans and plan prices
//! - `snapshot` - before/after diffs deciding when the provider must be told
//! - `organization` - tenant customer id and plan pointer

mod billing_cycle;
mod organization;
mod plan;
mod snapshot;

pub use billing_cycle::BillingCycle;
pub use organization::Organization;
pub use plan::{
    BillingPlan, BillingPlanChanges, PlanPrice, PlanPriceChanges, DEFAULT_CURRENCY,
};
pub use snapshot::{PlanPriceSnapshot, PlanSnapshot};
