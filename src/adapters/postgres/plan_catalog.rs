//! PostgreSQL implementation of PlanCatalog.
//!
//! Saves are upserts keyed by id.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{BillingCycle, BillingPlan, PlanPrice};
use crate::domain::foundation::{DomainError, PlanId, PlanPriceId, Timestamp};
use crate::ports::PlanCatalog;

pub struct PostgresPlanCatalog {
    pool: PgPool,
}

impl PostgresPlanCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PlanRow {
    id: Uuid,
    name: String,
    description: String,
    level: i16,
    provider_product_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PlanRow> for BillingPlan {
    fn from(row: PlanRow) -> Self {
        BillingPlan {
            id: PlanId::from_uuid(row.id),
            name: row.name,
            description: row.description,
            level: row.level,
            provider_product_id: row.provider_product_id,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PlanPriceRow {
    id: Uuid,
    plan_id: Uuid,
    name: String,
    price_cents: i64,
    currency: String,
    trial_days: i32,
    billing_cycle: i16,
    provider_price_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PlanPriceRow> for PlanPrice {
    type Error = DomainError;

    fn try_from(row: PlanPriceRow) -> Result<Self, Self::Error> {
        let billing_cycle = BillingCycle::from_code(row.billing_cycle)
            .map_err(|e| DomainError::database(format!("Invalid billing cycle value: {}", e)))?;

        Ok(PlanPrice {
            id: PlanPriceId::from_uuid(row.id),
            plan_id: PlanId::from_uuid(row.plan_id),
            name: row.name,
            price_cents: row.price_cents,
            currency: row.currency,
            trial_days: row.trial_days,
            billing_cycle,
            provider_price_id: row.provider_price_id,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl PlanCatalog for PostgresPlanCatalog {
    async fn find_plan(&self, id: &PlanId) -> Result<Option<BillingPlan>, DomainError> {
        let row: Option<PlanRow> = sqlx::query_as(
            r#"
            SELECT id, name, description, level, provider_product_id, created_at, updated_at
            FROM billing_plans
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to load plan: {}", e)))?;

        Ok(row.map(BillingPlan::from))
    }

    async fn find_plan_price(&self, id: &PlanPriceId) -> Result<Option<PlanPrice>, DomainError> {
        let row: Option<PlanPriceRow> = sqlx::query_as(
            r#"
            SELECT id, plan_id, name, price_cents, currency, trial_days, billing_cycle,
                   provider_price_id, created_at, updated_at
            FROM billing_plan_prices
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to load plan price: {}", e)))?;

        row.map(PlanPrice::try_from).transpose()
    }

    async fn save_plan(&self, plan: &BillingPlan) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO billing_plans (
                id, name, description, level, provider_product_id, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                level = EXCLUDED.level,
                provider_product_id = EXCLUDED.provider_product_id,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(plan.id.as_uuid())
        .bind(&plan.name)
        .bind(&plan.description)
        .bind(plan.level)
        .bind(&plan.provider_product_id)
        .bind(plan.created_at.as_datetime())
        .bind(plan.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to save plan: {}", e)))?;

        Ok(())
    }

    async fn save_plan_price(&self, price: &PlanPrice) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO billing_plan_prices (
                id, plan_id, name, price_cents, currency, trial_days, billing_cycle,
                provider_price_id, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                price_cents = EXCLUDED.price_cents,
                currency = EXCLUDED.currency,
                trial_days = EXCLUDED.trial_days,
                provider_price_id = EXCLUDED.provider_price_id,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(price.id.as_uuid())
        .bind(price.plan_id.as_uuid())
        .bind(&price.name)
        .bind(price.price_cents)
        .bind(&price.currency)
        .bind(price.trial_days)
        .bind(price.billing_cycle.code())
        .bind(&price.provider_price_id)
        .bind(price.created_at.as_datetime())
        .bind(price.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to save plan price: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ErrorCode;

    fn price_row(billing_cycle: i16) -> PlanPriceRow {
        PlanPriceRow {
            id: Uuid::new_v4(),
            plan_id: Uuid::new_v4(),
            name: "Pro".to_string(),
            price_cents: 2_900,
            currency: "USD".to_string(),
            trial_days: 14,
            billing_cycle,
            provider_price_id: Some("price_1".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn price_row_converts() {
        let price = PlanPrice::try_from(price_row(3)).unwrap();
        assert_eq!(price.billing_cycle, BillingCycle::Annually);
        assert_eq!(price.trial_days, 14);
    }

    #[test]
    fn invalid_cycle_is_database_error() {
        let err = PlanPrice::try_from(price_row(0)).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }
}
