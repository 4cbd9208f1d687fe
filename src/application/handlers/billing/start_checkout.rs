//! StartCheckoutHandler - Opens a hosted checkout session for a plan price.

use std::sync::Arc;

use crate::domain::foundation::{OrganizationId, PlanPriceId};
use crate::domain::subscription::BillingError;
use crate::ports::{CheckoutSessionRequest, OrganizationRepository, PaymentProvider, PlanCatalog};

use super::lookup::{ensure_provider_customer, load_organization, load_plan_price};

#[derive(Debug, Clone)]
pub struct StartCheckoutCommand {
    pub organization_id: OrganizationId,
    pub plan_price_id: PlanPriceId,
    pub promo_codes: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct StartCheckoutResult {
    pub session_id: String,
    pub checkout_url: String,
}

pub struct StartCheckoutHandler {
    organizations: Arc<dyn OrganizationRepository>,
    catalog: Arc<dyn PlanCatalog>,
    provider: Arc<dyn PaymentProvider>,
}

impl StartCheckoutHandler {
    pub fn new(
        organizations: Arc<dyn OrganizationRepository>,
        catalog: Arc<dyn PlanCatalog>,
        provider: Arc<dyn PaymentProvider>,
    ) -> Self {
        Self {
            organizations,
            catalog,
            provider,
        }
    }

    pub async fn handle(
        &self,
        cmd: StartCheckoutCommand,
    ) -> Result<StartCheckoutResult, BillingError> {
        let mut organization =
            load_organization(self.organizations.as_ref(), &cmd.organization_id).await?;

        // 1. The plan price must exist on the provider side
        let plan_price = load_plan_price(self.catalog.as_ref(), &cmd.plan_price_id).await?;
        let price_id = plan_price.provider_price_id.ok_or_else(|| {
            BillingError::validation("plan_price_id", "Plan price is not registered with the provider")
        })?;

        // 2. Ensure a provider customer
        let customer_id = ensure_provider_customer(
            self.organizations.as_ref(),
            self.provider.as_ref(),
            &mut organization,
        )
        .await?;

        // 3. Open the session
        let session = self
            .provider
            .setup_checkout_session(CheckoutSessionRequest {
                price_id,
                customer_id,
                promo_codes: cmd.promo_codes,
            })
            .await?;

        tracing::info!(
            organization_id = %cmd.organization_id,
            plan_price_id = %cmd.plan_price_id,
            session_id = %session.id,
            "Checkout session created"
        );

        Ok(StartCheckoutResult {
            session_id: session.id,
            checkout_url: session.url,
        })
    }
}
