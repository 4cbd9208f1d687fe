//! PostgreSQL implementation of OrganizationRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::Organization;
use crate::domain::foundation::{DomainError, ErrorCode, OrganizationId, PlanPriceId, Timestamp};
use crate::ports::OrganizationRepository;

pub struct PostgresOrganizationRepository {
    pool: PgPool,
}

impl PostgresOrganizationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrganizationRow {
    id: Uuid,
    name: String,
    billing_email: String,
    provider_customer_id: Option<String>,
    billing_plan_price_id: Option<Uuid>,
    updated_at: DateTime<Utc>,
}

impl From<OrganizationRow> for Organization {
    fn from(row: OrganizationRow) -> Self {
        Organization {
            id: OrganizationId::from_uuid(row.id),
            name: row.name,
            billing_email: row.billing_email,
            provider_customer_id: row.provider_customer_id,
            billing_plan_price_id: row.billing_plan_price_id.map(PlanPriceId::from_uuid),
            updated_at: Timestamp::from_datetime(row.updated_at),
        }
    }
}

#[async_trait]
impl OrganizationRepository for PostgresOrganizationRepository {
    async fn find_by_id(&self, id: &OrganizationId) -> Result<Option<Organization>, DomainError> {
        let row: Option<OrganizationRow> = sqlx::query_as(
            r#"
            SELECT id, name, billing_email, provider_customer_id, billing_plan_price_id, updated_at
            FROM organizations
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to load organization: {}", e)))?;

        Ok(row.map(Organization::from))
    }

    async fn update(&self, organization: &Organization) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE organizations SET
                name = $2,
                billing_email = $3,
                provider_customer_id = $4,
                billing_plan_price_id = $5,
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(organization.id.as_uuid())
        .bind(&organization.name)
        .bind(&organization.billing_email)
        .bind(&organization.provider_customer_id)
        .bind(organization.billing_plan_price_id.map(|id| *id.as_uuid()))
        .bind(organization.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to update organization: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(
                DomainError::new(ErrorCode::OrganizationNotFound, "Organization not found")
                    .with_detail("resource", "Organization")
                    .with_detail("key", organization.id.to_string()),
            );
        }

        Ok(())
    }
}
