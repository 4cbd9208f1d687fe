//! PostgreSQL implementation of SubscriptionReader.
//!
//! Builds the read projection by joining the organization's current row with
//! its plan price and plan.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::BillingCycle;
use crate::domain::foundation::{DomainError, OrganizationId, PlanPriceId, SubscriptionId};
use crate::domain::subscription::{BillingInfo, SubscriptionStatus, SubscriptionView};
use crate::ports::SubscriptionReader;

pub struct PostgresSubscriptionReader {
    pool: PgPool,
}

impl PostgresSubscriptionReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionViewRow {
    id: Uuid,
    organization_id: Uuid,
    billing_plan_price_id: Option<Uuid>,
    provider_subscription_id: String,
    status: i16,
    start_ts: i64,
    end_ts: i64,
    trial_end_ts: i64,
    next_billing_ts: i64,
    billing_cycle: i16,
    amount_cents: i64,
    coupon_code: String,
    billing_info: Json<BillingInfo>,
    plan_price_cents: Option<i64>,
    currency: Option<String>,
    plan_name: Option<String>,
    plan_level: Option<i16>,
}

impl TryFrom<SubscriptionViewRow> for SubscriptionView {
    type Error = DomainError;

    fn try_from(row: SubscriptionViewRow) -> Result<Self, Self::Error> {
        Ok(SubscriptionView {
            id: SubscriptionId::from_uuid(row.id),
            organization_id: OrganizationId::from_uuid(row.organization_id),
            billing_plan_price_id: row.billing_plan_price_id.map(PlanPriceId::from_uuid),
            provider_subscription_id: row.provider_subscription_id,
            status: SubscriptionStatus::from_code(row.status)
                .map_err(|e| DomainError::database(format!("Invalid status value: {}", e)))?,
            start_ts: row.start_ts,
            end_ts: row.end_ts,
            trial_end_ts: row.trial_end_ts,
            next_billing_ts: row.next_billing_ts,
            billing_cycle: BillingCycle::from_code(row.billing_cycle).map_err(|e| {
                DomainError::database(format!("Invalid billing cycle value: {}", e))
            })?,
            amount_cents: row.amount_cents,
            coupon_code: row.coupon_code,
            billing_info: row.billing_info.0,
            plan_price_cents: row.plan_price_cents,
            currency: row.currency,
            plan_name: row.plan_name,
            plan_level: row.plan_level,
        })
    }
}

#[async_trait]
impl SubscriptionReader for PostgresSubscriptionReader {
    async fn get_active_view_by_organization(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Option<SubscriptionView>, DomainError> {
        let row: Option<SubscriptionViewRow> = sqlx::query_as(
            r#"
            SELECT
                s.id, s.organization_id, s.billing_plan_price_id, s.provider_subscription_id,
                s.status, s.start_ts, s.end_ts, s.trial_end_ts, s.next_billing_ts,
                s.billing_cycle, s.amount_cents, s.coupon_code, s.billing_info,
                pp.price_cents AS plan_price_cents,
                pp.currency,
                p.name AS plan_name,
                p.level AS plan_level
            FROM subscriptions s
            LEFT JOIN billing_plan_prices pp ON pp.id = s.billing_plan_price_id
            LEFT JOIN billing_plans p ON p.id = pp.plan_id
            WHERE s.organization_id = $1
              AND s.status < 200
            ORDER BY s.created_at DESC
            LIMIT 1
            "#,
        )
        .bind(organization_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to load subscription view: {}", e)))?;

        row.map(SubscriptionView::try_from).transpose()
    }
}
