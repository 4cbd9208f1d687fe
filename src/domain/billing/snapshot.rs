//! Before/after snapshots of catalog entities.
//!
//! An update captures a snapshot before applying changes and diffs it against
//! the result. Only a non-empty diff of provider-relevant fields triggers a
//! provider call; everything else is a local save.

use super::{BillingPlan, PlanPrice};

/// Provider-relevant fields of a plan price at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanPriceSnapshot {
    price_cents: i64,
    currency: String,
}

impl PlanPriceSnapshot {
    pub fn capture(price: &PlanPrice) -> Self {
        Self {
            price_cents: price.price_cents,
            currency: price.currency.clone(),
        }
    }

    /// Names of provider-relevant fields that differ in `after`.
    pub fn changed_fields(&self, after: &PlanPrice) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.price_cents != after.price_cents {
            changed.push("price_cents");
        }
        if self.currency != after.currency {
            changed.push("currency");
        }
        changed
    }

    pub fn has_provider_changes(&self, after: &PlanPrice) -> bool {
        !self.changed_fields(after).is_empty()
    }
}

/// Provider-relevant fields of a plan at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSnapshot {
    name: String,
    description: String,
}

impl PlanSnapshot {
    pub fn capture(plan: &BillingPlan) -> Self {
        Self {
            name: plan.name.clone(),
            description: plan.description.clone(),
        }
    }

    /// Names of provider-relevant fields that differ in `after`.
    pub fn changed_fields(&self, after: &BillingPlan) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.name != after.name {
            changed.push("name");
        }
        if self.description != after.description {
            changed.push("description");
        }
        changed
    }

    pub fn has_provider_changes(&self, after: &BillingPlan) -> bool {
        !self.changed_fields(after).is_empty()
    }
}
