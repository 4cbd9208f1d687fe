//! Lookups shared by the billing handlers.

use std::collections::HashMap;

use crate::domain::billing::{Organization, PlanPrice};
use crate::domain::foundation::{OrganizationId, PlanPriceId};
use crate::domain::subscription::{BillingError, Subscription};
use crate::ports::{
    CreateCustomerRequest, OrganizationRepository, PaymentProvider, PlanCatalog,
    SubscriptionRepository,
};

pub(crate) async fn load_organization(
    organizations: &dyn OrganizationRepository,
    id: &OrganizationId,
) -> Result<Organization, BillingError> {
    organizations
        .find_by_id(id)
        .await?
        .ok_or_else(|| BillingError::not_found("Organization", id))
}

pub(crate) async fn load_plan_price(
    catalog: &dyn PlanCatalog,
    id: &PlanPriceId,
) -> Result<PlanPrice, BillingError> {
    catalog
        .find_plan_price(id)
        .await?
        .ok_or_else(|| BillingError::not_found("PlanPrice", id))
}

/// The organization's current row: the newest one that is not disabled.
pub(crate) async fn load_current_subscription(
    subscriptions: &dyn SubscriptionRepository,
    organization_id: &OrganizationId,
) -> Result<Subscription, BillingError> {
    subscriptions
        .find_active_by_organization(organization_id)
        .await?
        .ok_or_else(|| BillingError::not_found("Subscription", organization_id))
}

/// Returns the organization's provider customer id, creating the customer
/// first when the organization has none.
///
/// A newly created id is persisted on the organization straight away so a
/// concurrently running webhook can resolve it.
pub(crate) async fn ensure_provider_customer(
    organizations: &dyn OrganizationRepository,
    provider: &dyn PaymentProvider,
    organization: &mut Organization,
) -> Result<String, BillingError> {
    if let Some(customer_id) = organization.customer_id() {
        return Ok(customer_id.to_string());
    }

    let mut metadata = HashMap::new();
    metadata.insert("organization_id".to_string(), organization.id.to_string());

    let customer = provider
        .create_customer(CreateCustomerRequest {
            email: organization.billing_email.clone(),
            name: Some(organization.name.clone()),
            metadata,
        })
        .await?;

    organization.assign_customer(customer.id.clone());
    organizations.update(organization).await?;

    tracing::info!(
        organization_id = %organization.id,
        provider_customer_id = %customer.id,
        "Provider customer created for organization"
    );

    Ok(customer.id)
}
