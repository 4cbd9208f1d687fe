//! Organization billing linkage.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{OrganizationId, PlanPriceId, Timestamp};

/// The tenant that owns subscriptions.
///
/// Only the billing-relevant columns are modelled here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub billing_email: String,
    /// Provider customer id, assigned on first checkout.
    pub provider_customer_id: Option<String>,
    /// Plan price of whichever subscription last won.
    pub billing_plan_price_id: Option<PlanPriceId>,
    pub updated_at: Timestamp,
}

impl Organization {
    pub fn new(name: impl Into<String>, billing_email: impl Into<String>) -> Self {
        Self {
            id: OrganizationId::new(),
            name: name.into(),
            billing_email: billing_email.into(),
            provider_customer_id: None,
            billing_plan_price_id: None,
            updated_at: Timestamp::now(),
        }
    }

    /// Returns the provider customer id when one has been assigned.
    pub fn customer_id(&self) -> Option<&str> {
        self.provider_customer_id
            .as_deref()
            .filter(|id| !id.is_empty())
    }

    pub fn assign_customer(&mut self, customer_id: impl Into<String>) {
        self.provider_customer_id = Some(customer_id.into());
        self.updated_at = Timestamp::now();
    }

    pub fn point_to_plan_price(&mut self, plan_price_id: Option<PlanPriceId>) {
        self.billing_plan_price_id = plan_price_id;
        self.updated_at = Timestamp::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_customer_id_counts_as_missing() {
        let mut org = Organization::new("Acme", "billing@acme.test");
        assert!(org.customer_id().is_none());

        org.assign_customer("");
        assert!(org.customer_id().is_none());

        org.assign_customer("cus_123");
        assert_eq!(org.customer_id(), Some("cus_123"));
    }
}
