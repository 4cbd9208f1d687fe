//! Billing plan catalog entities.
//!
//! A `BillingPlan` is the product (name, level); each `PlanPrice` is one priced,
//! cadence-bound offering of it. Subscriptions copy their commercial terms from
//! a `PlanPrice` at purchase time and never re-read them.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{PlanId, PlanPriceId, Timestamp, ValidationError};

use super::BillingCycle;

/// Default currency for plan prices.
pub const DEFAULT_CURRENCY: &str = "USD";

/// A purchasable plan (provider "product").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPlan {
    pub id: PlanId,
    pub name: String,
    pub description: String,
    /// Relative rank used for feature gating; higher is richer.
    pub level: i16,
    pub provider_product_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl BillingPlan {
    /// Creates a new plan not yet registered with the provider.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        level: i16,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::empty_field("name"));
        }
        let now = Timestamp::now();
        Ok(Self {
            id: PlanId::new(),
            name,
            description: description.into(),
            level,
            provider_product_id: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Applies an admin edit.
    pub fn apply(&mut self, changes: BillingPlanChanges) -> Result<(), ValidationError> {
        if let Some(name) = changes.name {
            if name.trim().is_empty() {
                return Err(ValidationError::empty_field("name"));
            }
            self.name = name;
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        if let Some(level) = changes.level {
            self.level = level;
        }
        self.updated_at = Timestamp::now();
        Ok(())
    }
}

/// Partial update for a plan. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPlanChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub level: Option<i16>,
}

/// A priced offering of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanPrice {
    pub id: PlanPriceId,
    pub plan_id: PlanId,
    pub name: String,
    /// Price per cycle in cents.
    pub price_cents: i64,
    pub currency: String,
    pub trial_days: i32,
    pub billing_cycle: BillingCycle,
    pub provider_price_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PlanPrice {
    /// Creates a new price in the default currency.
    pub fn new(
        plan_id: PlanId,
        name: impl Into<String>,
        price_cents: i64,
        billing_cycle: BillingCycle,
    ) -> Result<Self, ValidationError> {
        validate_price(price_cents)?;
        let now = Timestamp::now();
        Ok(Self {
            id: PlanPriceId::new(),
            plan_id,
            name: name.into(),
            price_cents,
            currency: DEFAULT_CURRENCY.to_string(),
            trial_days: 0,
            billing_cycle,
            provider_price_id: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Sets the provider price id (builder style, mostly for fixtures).
    pub fn with_provider_price_id(mut self, provider_price_id: impl Into<String>) -> Self {
        self.provider_price_id = Some(provider_price_id.into());
        self
    }

    /// Applies an admin edit. The billing cycle is immutable once created.
    pub fn apply(&mut self, changes: PlanPriceChanges) -> Result<(), ValidationError> {
        if let Some(price_cents) = changes.price_cents {
            validate_price(price_cents)?;
            self.price_cents = price_cents;
        }
        if let Some(currency) = changes.currency {
            if currency.trim().is_empty() {
                return Err(ValidationError::empty_field("currency"));
            }
            self.currency = currency.to_uppercase();
        }
        if let Some(name) = changes.name {
            self.name = name;
        }
        if let Some(trial_days) = changes.trial_days {
            if trial_days < 0 {
                return Err(ValidationError::out_of_range(
                    "trial_days",
                    0,
                    i32::MAX as i64,
                    trial_days as i64,
                ));
            }
            self.trial_days = trial_days;
        }
        self.updated_at = Timestamp::now();
        Ok(())
    }
}

fn validate_price(price_cents: i64) -> Result<(), ValidationError> {
    if price_cents < 0 {
        return Err(ValidationError::out_of_range(
            "price_cents",
            0,
            i64::MAX,
            price_cents,
        ));
    }
    Ok(())
}

/// Partial update for a plan price. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanPriceChanges {
    pub name: Option<String>,
    pub price_cents: Option<i64>,
    pub currency: Option<String>,
    pub trial_days: Option<i32>,
}
