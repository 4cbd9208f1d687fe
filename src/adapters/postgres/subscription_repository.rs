//! PostgreSQL implementation of SubscriptionRepository.
//!
//! Natural-key uniqueness among live rows is enforced by partial unique
//! indexes; a violation surfaces as `SUBSCRIPTION_EXISTS` so the checkout
//! reconciler can re-read the winner.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::BillingCycle;
use crate::domain::foundation::{
    DomainError, ErrorCode, OrganizationId, PlanPriceId, SubscriptionId, Timestamp,
};
use crate::domain::subscription::{BillingInfo, BillingProvider, Subscription, SubscriptionStatus};
use crate::ports::SubscriptionRepository;

const LIVE_ORG_PRICE_KEY: &str = "subscriptions_live_org_price_key";
const LIVE_PROVIDER_SUBSCRIPTION_KEY: &str = "subscriptions_live_provider_subscription_key";

/// Columns selected by every lookup, in [`SubscriptionRow`] order.
const SUBSCRIPTION_COLUMNS: &str = r#"
    id, organization_id, billing_plan_price_id, billing_provider,
    provider_subscription_id, provider_customer_id, provider_price_id,
    status, start_ts, end_ts, trial_end_ts, next_billing_ts,
    billing_cycle, amount_cents, coupon_code, billing_info, metadata,
    created_at, updated_at
"#;

/// PostgreSQL implementation of the SubscriptionRepository port.
pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(
        &self,
        predicate: &str,
        key: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        let sql = format!(
            "SELECT {} FROM subscriptions WHERE {} ORDER BY created_at DESC LIMIT 1",
            SUBSCRIPTION_COLUMNS, predicate
        );
        let row: Option<SubscriptionRow> = sqlx::query_as(&sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to load subscription: {}", e)))?;

        row.map(Subscription::try_from).transpose()
    }
}

/// Database row representation of a subscription.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    organization_id: Uuid,
    billing_plan_price_id: Option<Uuid>,
    billing_provider: i16,
    provider_subscription_id: String,
    provider_customer_id: String,
    provider_price_id: String,
    status: i16,
    start_ts: i64,
    end_ts: i64,
    trial_end_ts: i64,
    next_billing_ts: i64,
    billing_cycle: i16,
    amount_cents: i64,
    coupon_code: String,
    billing_info: Json<BillingInfo>,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let status = SubscriptionStatus::from_code(row.status)
            .map_err(|e| DomainError::database(format!("Invalid status value: {}", e)))?;
        let billing_cycle = BillingCycle::from_code(row.billing_cycle)
            .map_err(|e| DomainError::database(format!("Invalid billing cycle value: {}", e)))?;
        let billing_provider = BillingProvider::from_code(row.billing_provider).ok_or_else(|| {
            DomainError::database(format!(
                "Invalid billing provider value: {}",
                row.billing_provider
            ))
        })?;

        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            organization_id: OrganizationId::from_uuid(row.organization_id),
            billing_plan_price_id: row.billing_plan_price_id.map(PlanPriceId::from_uuid),
            billing_provider,
            provider_subscription_id: row.provider_subscription_id,
            provider_customer_id: row.provider_customer_id,
            provider_price_id: row.provider_price_id,
            status,
            start_ts: row.start_ts,
            end_ts: row.end_ts,
            trial_end_ts: row.trial_end_ts,
            next_billing_ts: row.next_billing_ts,
            billing_cycle,
            amount_cents: row.amount_cents,
            coupon_code: row.coupon_code,
            billing_info: row.billing_info.0,
            metadata: row.metadata,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn map_write_error(e: sqlx::Error, action: &str) -> DomainError {
    if let sqlx::Error::Database(db_err) = &e {
        match db_err.constraint() {
            Some(LIVE_ORG_PRICE_KEY) => {
                return DomainError::new(
                    ErrorCode::SubscriptionExists,
                    "Subscription already exists for organization and plan price",
                )
                .with_detail("constraint", LIVE_ORG_PRICE_KEY);
            }
            Some(LIVE_PROVIDER_SUBSCRIPTION_KEY) => {
                return DomainError::new(
                    ErrorCode::SubscriptionExists,
                    "Provider subscription already linked to another subscription",
                )
                .with_detail("constraint", LIVE_PROVIDER_SUBSCRIPTION_KEY);
            }
            _ => {}
        }
    }
    DomainError::database(format!("Failed to {} subscription: {}", action, e))
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn insert(&self, subscription: &Subscription) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, organization_id, billing_plan_price_id, billing_provider,
                provider_subscription_id, provider_customer_id, provider_price_id,
                status, start_ts, end_ts, trial_end_ts, next_billing_ts,
                billing_cycle, amount_cents, coupon_code, billing_info, metadata,
                created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19
            )
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.organization_id.as_uuid())
        .bind(subscription.billing_plan_price_id.map(|id| *id.as_uuid()))
        .bind(subscription.billing_provider.code())
        .bind(&subscription.provider_subscription_id)
        .bind(&subscription.provider_customer_id)
        .bind(&subscription.provider_price_id)
        .bind(subscription.status.code())
        .bind(subscription.start_ts)
        .bind(subscription.end_ts)
        .bind(subscription.trial_end_ts)
        .bind(subscription.next_billing_ts)
        .bind(subscription.billing_cycle.code())
        .bind(subscription.amount_cents)
        .bind(&subscription.coupon_code)
        .bind(Json(&subscription.billing_info))
        .bind(&subscription.metadata)
        .bind(subscription.created_at.as_datetime())
        .bind(subscription.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "insert"))?;

        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                billing_plan_price_id = $2,
                provider_subscription_id = $3,
                provider_customer_id = $4,
                provider_price_id = $5,
                status = $6,
                start_ts = $7,
                end_ts = $8,
                trial_end_ts = $9,
                next_billing_ts = $10,
                coupon_code = $11,
                billing_info = $12,
                metadata = $13,
                updated_at = $14
            WHERE id = $1
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.billing_plan_price_id.map(|id| *id.as_uuid()))
        .bind(&subscription.provider_subscription_id)
        .bind(&subscription.provider_customer_id)
        .bind(&subscription.provider_price_id)
        .bind(subscription.status.code())
        .bind(subscription.start_ts)
        .bind(subscription.end_ts)
        .bind(subscription.trial_end_ts)
        .bind(subscription.next_billing_ts)
        .bind(&subscription.coupon_code)
        .bind(Json(&subscription.billing_info))
        .bind(&subscription.metadata)
        .bind(subscription.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "update"))?;

        if result.rows_affected() == 0 {
            return Err(
                DomainError::new(ErrorCode::SubscriptionNotFound, "Subscription not found")
                    .with_detail("resource", "Subscription")
                    .with_detail("key", subscription.id.to_string()),
            );
        }

        Ok(())
    }

    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError> {
        let sql = format!("SELECT {} FROM subscriptions WHERE id = $1", SUBSCRIPTION_COLUMNS);
        let row: Option<SubscriptionRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to load subscription: {}", e)))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_by_provider_subscription_id(
        &self,
        provider_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        if provider_subscription_id.is_empty() {
            return Ok(None);
        }
        self.fetch_one_where(
            "provider_subscription_id = $1 AND status < 200",
            provider_subscription_id,
        )
        .await
    }

    async fn find_by_provider_customer_id(
        &self,
        provider_customer_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        if provider_customer_id.is_empty() {
            return Ok(None);
        }
        self.fetch_one_where(
            "provider_customer_id = $1 AND status < 200",
            provider_customer_id,
        )
        .await
    }

    async fn find_active_by_organization(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Option<Subscription>, DomainError> {
        let sql = format!(
            r#"
            SELECT {} FROM subscriptions
            WHERE organization_id = $1
              AND status < 200
            ORDER BY created_at DESC
            LIMIT 1
            "#,
            SUBSCRIPTION_COLUMNS
        );
        let row: Option<SubscriptionRow> = sqlx::query_as(&sql)
            .bind(organization_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to load subscription: {}", e)))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_by_organization_and_plan_price(
        &self,
        organization_id: &OrganizationId,
        plan_price_id: &PlanPriceId,
    ) -> Result<Option<Subscription>, DomainError> {
        let sql = format!(
            r#"
            SELECT {} FROM subscriptions
            WHERE organization_id = $1
              AND billing_plan_price_id = $2
              AND status < 200
            ORDER BY created_at DESC
            LIMIT 1
            "#,
            SUBSCRIPTION_COLUMNS
        );
        let row: Option<SubscriptionRow> = sqlx::query_as(&sql)
            .bind(organization_id.as_uuid())
            .bind(plan_price_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to load subscription: {}", e)))?;

        row.map(Subscription::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: i16, billing_cycle: i16) -> SubscriptionRow {
        SubscriptionRow {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            billing_plan_price_id: Some(Uuid::new_v4()),
            billing_provider: 1,
            provider_subscription_id: "sub_1".to_string(),
            provider_customer_id: "cus_1".to_string(),
            provider_price_id: "price_1".to_string(),
            status,
            start_ts: 1_700_000_000,
            end_ts: 0,
            trial_end_ts: 0,
            next_billing_ts: 1_702_592_000,
            billing_cycle,
            amount_cents: 2_900,
            coupon_code: String::new(),
            billing_info: Json(BillingInfo::default()),
            metadata: serde_json::json!({}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn row_converts_to_subscription() {
        let sub = Subscription::try_from(row(100, BillingCycle::Monthly.code())).unwrap();

        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.billing_cycle, BillingCycle::Monthly);
        assert_eq!(sub.provider_subscription_id, "sub_1");
        assert!(sub.billing_plan_price_id.is_some());
    }

    #[test]
    fn unknown_status_code_is_database_error() {
        let err = Subscription::try_from(row(7, BillingCycle::Monthly.code())).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[test]
    fn unknown_billing_cycle_is_database_error() {
        let err = Subscription::try_from(row(100, 99)).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[test]
    fn unknown_provider_is_database_error() {
        let mut bad = row(100, BillingCycle::Monthly.code());
        bad.billing_provider = 9;
        let err = Subscription::try_from(bad).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[test]
    fn non_database_errors_are_not_conflicts() {
        let err = map_write_error(sqlx::Error::RowNotFound, "insert");
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }
}
