//! ReconcileCheckoutHandler - Confirms a completed hosted checkout.
//!
//! Runs concurrently with webhook processing for the same organization and
//! converges with it through the (organization, plan price) natural key and
//! the provider subscription id. Whichever path writes the provider id first
//! wins; the other matches against it.

use std::sync::Arc;

use crate::domain::foundation::{ErrorCode, OrganizationId, PlanPriceId};
use crate::domain::subscription::{BillingError, Subscription, SubscriptionStatus};
use crate::ports::{
    notify_best_effort, BillingNotice, BillingNotifier, OrganizationRepository, PaymentProvider,
    PlanCatalog, ProviderSubscription, SubscriptionRepository,
};

use super::lookup::{ensure_provider_customer, load_organization, load_plan_price};
use super::merge_billing_info::merge_billing_info;

/// Command sent after the customer returns from hosted checkout.
#[derive(Debug, Clone)]
pub struct ReconcileCheckoutCommand {
    pub organization_id: OrganizationId,
    pub plan_price_id: PlanPriceId,
    pub coupon_code: Option<String>,
}

/// Result of a checkout reconciliation.
#[derive(Debug, Clone)]
pub struct ReconcileCheckoutResult {
    pub subscription: Subscription,
    /// True when this call inserted the row.
    pub created: bool,
}

pub struct ReconcileCheckoutHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    organizations: Arc<dyn OrganizationRepository>,
    catalog: Arc<dyn PlanCatalog>,
    provider: Arc<dyn PaymentProvider>,
    notifier: Arc<dyn BillingNotifier>,
}

impl ReconcileCheckoutHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        organizations: Arc<dyn OrganizationRepository>,
        catalog: Arc<dyn PlanCatalog>,
        provider: Arc<dyn PaymentProvider>,
        notifier: Arc<dyn BillingNotifier>,
    ) -> Self {
        Self {
            subscriptions,
            organizations,
            catalog,
            provider,
            notifier,
        }
    }

    pub async fn handle(
        &self,
        cmd: ReconcileCheckoutCommand,
    ) -> Result<ReconcileCheckoutResult, BillingError> {
        let mut organization =
            load_organization(self.organizations.as_ref(), &cmd.organization_id).await?;
        let plan_price = load_plan_price(self.catalog.as_ref(), &cmd.plan_price_id).await?;

        // 1. Find the row on the natural key, or start a PENDING one
        let existing = self
            .subscriptions
            .find_by_organization_and_plan_price(&cmd.organization_id, &cmd.plan_price_id)
            .await?;
        let created = existing.is_none();
        let mut subscription = existing.unwrap_or_else(|| {
            Subscription::pending(cmd.organization_id, &plan_price, cmd.coupon_code.clone())
        });

        // 2. Make sure the organization has a provider customer
        let customer_id = ensure_provider_customer(
            self.organizations.as_ref(),
            self.provider.as_ref(),
            &mut organization,
        )
        .await?;

        // 3. Ask the provider for the current subscription
        let provider_sub = self
            .provider
            .get_subscription_by_customer(&customer_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Provider subscription", &customer_id))?;

        // 4-5. Claim the provider id and confirm payment
        let previous_status = subscription.status;
        converge(&mut subscription, &provider_sub, &customer_id)?;

        // 6. Persist the row, then the organization's plan pointer
        let (subscription, created) = if created {
            self.insert_or_converge(subscription, &provider_sub, &customer_id)
                .await?
        } else {
            self.subscriptions.update(&subscription).await?;
            (subscription, false)
        };

        organization.point_to_plan_price(Some(plan_price.id));
        self.organizations.update(&organization).await?;

        tracing::info!(
            organization_id = %cmd.organization_id,
            subscription_id = %subscription.id,
            provider_subscription_id = %subscription.provider_subscription_id,
            status = %subscription.status,
            created,
            "Checkout reconciled"
        );

        if previous_status == SubscriptionStatus::Pending && subscription.status.has_access() {
            notify_best_effort(
                self.notifier.as_ref(),
                BillingNotice::SubscriptionStarted,
                &subscription,
            )
            .await;
        }

        Ok(ReconcileCheckoutResult {
            subscription,
            created,
        })
    }

    /// Inserts a new row. If a concurrent request inserted the same natural
    /// key first, converges onto that row instead.
    async fn insert_or_converge(
        &self,
        subscription: Subscription,
        provider_sub: &ProviderSubscription,
        customer_id: &str,
    ) -> Result<(Subscription, bool), BillingError> {
        let err = match self.subscriptions.insert(&subscription).await {
            Ok(()) => return Ok((subscription, true)),
            Err(err) if err.code == ErrorCode::SubscriptionExists => err,
            Err(err) => return Err(err.into()),
        };

        let Some(plan_price_id) = subscription.billing_plan_price_id else {
            return Err(err.into());
        };
        let mut winner = self
            .subscriptions
            .find_by_organization_and_plan_price(&subscription.organization_id, &plan_price_id)
            .await?
            .ok_or_else(|| BillingError::from(err))?;

        tracing::debug!(
            subscription_id = %winner.id,
            "Concurrent checkout created the row first, converging onto it"
        );

        converge(&mut winner, provider_sub, customer_id)?;
        self.subscriptions.update(&winner).await?;
        Ok((winner, false))
    }
}

/// Applies the provider's view of the subscription to the local row.
fn converge(
    subscription: &mut Subscription,
    provider_sub: &ProviderSubscription,
    customer_id: &str,
) -> Result<(), BillingError> {
    subscription.link_customer(customer_id);

    if !subscription.claim_provider_subscription(&provider_sub.id)
        && subscription.provider_subscription_id != provider_sub.id
    {
        tracing::warn!(
            subscription_id = %subscription.id,
            local = %subscription.provider_subscription_id,
            provider = %provider_sub.id,
            "Row already linked to a different provider subscription"
        );
    }

    if provider_sub.status.is_active() {
        merge_billing_info(subscription, provider_sub.payment_method.as_ref());
        subscription.process_active(&provider_sub.period())?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryOrganizationRepository, InMemoryPlanCatalog, InMemorySubscriptionRepository,
    };
    use crate::adapters::notifications::RecordingNotifier;
    use crate::adapters::stripe::MockPaymentProvider;
    use crate::domain::billing::{BillingCycle, BillingPlan, Organization, PlanPrice};
    use crate::ports::{PaymentError, ProviderSubscriptionStatus};

    // ════════════════════════════════════════════════════════════════════════════
    // Fixture
    // ════════════════════════════════════════════════════════════════════════════

    struct Fixture {
        subscriptions: Arc<InMemorySubscriptionRepository>,
        organizations: Arc<InMemoryOrganizationRepository>,
        provider: MockPaymentProvider,
        notifier: RecordingNotifier,
        organization: Organization,
        price: PlanPrice,
        handler: ReconcileCheckoutHandler,
    }

    fn fixture(organization: Organization) -> Fixture {
        let plan = BillingPlan::new("Pro", "For teams", 2).unwrap();
        let price = PlanPrice::new(plan.id, "Pro Monthly", 2_900, BillingCycle::Monthly)
            .unwrap()
            .with_provider_price_id("price_pro");
        let catalog = Arc::new(InMemoryPlanCatalog::new().with_plan(plan).with_price(price.clone()));
        let subscriptions = Arc::new(InMemorySubscriptionRepository::new());
        let organizations =
            Arc::new(InMemoryOrganizationRepository::new().with_organization(organization.clone()));
        let provider = MockPaymentProvider::new();
        let notifier = RecordingNotifier::new();

        let handler = ReconcileCheckoutHandler::new(
            subscriptions.clone(),
            organizations.clone(),
            catalog,
            Arc::new(provider.clone()),
            Arc::new(notifier.clone()),
        );

        Fixture {
            subscriptions,
            organizations,
            provider,
            notifier,
            organization,
            price,
            handler,
        }
    }

    fn customer_org() -> Organization {
        let mut org = Organization::new("Acme", "billing@acme.test");
        org.assign_customer("cus_1");
        org
    }

    fn command(f: &Fixture) -> ReconcileCheckoutCommand {
        ReconcileCheckoutCommand {
            organization_id: f.organization.id,
            plan_price_id: f.price.id,
            coupon_code: Some("LAUNCH".to_string()),
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn first_checkout_creates_single_active_row() {
        let f = fixture(customer_org());
        f.provider
            .add_subscription(MockPaymentProvider::active_subscription("sub_1", "cus_1", "price_pro"));

        let result = f.handler.handle(command(&f)).await.unwrap();

        assert!(result.created);
        assert_eq!(f.subscriptions.len(), 1);
        let sub = &result.subscription;
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.provider_subscription_id, "sub_1");
        assert_eq!(sub.provider_customer_id, "cus_1");
        assert_eq!(sub.billing_info.card_last4, "4242");
        assert_eq!(sub.coupon_code, "LAUNCH");
        assert_eq!(sub.next_billing_ts, 1_702_592_000);

        let org = f.organizations.get(&f.organization.id).unwrap();
        assert_eq!(org.billing_plan_price_id, Some(f.price.id));
        assert_eq!(f.notifier.notices(), vec![BillingNotice::SubscriptionStarted]);
    }

    #[tokio::test]
    async fn repeated_checkout_reuses_row() {
        let f = fixture(customer_org());
        f.provider
            .add_subscription(MockPaymentProvider::active_subscription("sub_1", "cus_1", "price_pro"));

        let first = f.handler.handle(command(&f)).await.unwrap();
        let second = f.handler.handle(command(&f)).await.unwrap();

        assert!(!second.created);
        assert_eq!(first.subscription.id, second.subscription.id);
        assert_eq!(f.subscriptions.len(), 1);
        assert_eq!(f.notifier.notices().len(), 1);
    }

    #[tokio::test]
    async fn organization_without_customer_gets_one() {
        let f = fixture(Organization::new("Acme", "billing@acme.test"));
        // First generated mock id.
        f.provider
            .add_subscription(MockPaymentProvider::active_subscription("sub_1", "cus_mock_1", "price_pro"));

        let result = f.handler.handle(command(&f)).await.unwrap();

        assert!(f.provider.was_called("create_customer"));
        let org = f.organizations.get(&f.organization.id).unwrap();
        assert_eq!(org.customer_id(), Some("cus_mock_1"));
        assert_eq!(result.subscription.provider_customer_id, "cus_mock_1");
    }

    #[tokio::test]
    async fn missing_provider_subscription_is_not_found() {
        let f = fixture(customer_org());

        let err = f.handler.handle(command(&f)).await.unwrap_err();

        assert!(err.is_not_found());
        assert!(f.subscriptions.is_empty());
    }

    #[tokio::test]
    async fn unpaid_provider_subscription_stays_pending() {
        let f = fixture(customer_org());
        let mut sub = MockPaymentProvider::active_subscription("sub_1", "cus_1", "price_pro");
        sub.status = ProviderSubscriptionStatus::Incomplete;
        f.provider.add_subscription(sub);

        let result = f.handler.handle(command(&f)).await.unwrap();

        assert_eq!(result.subscription.status, SubscriptionStatus::Pending);
        assert_eq!(result.subscription.provider_subscription_id, "sub_1");
        assert!(result.subscription.billing_info.is_empty());
        assert!(f.notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn claimed_provider_id_is_never_rewritten() {
        let f = fixture(customer_org());
        let mut existing = Subscription::pending(f.organization.id, &f.price, None);
        existing.claim_provider_subscription("sub_from_webhook");
        f.subscriptions.insert(&existing).await.unwrap();
        f.provider
            .add_subscription(MockPaymentProvider::active_subscription("sub_other", "cus_1", "price_pro"));

        let result = f.handler.handle(command(&f)).await.unwrap();

        assert_eq!(result.subscription.provider_subscription_id, "sub_from_webhook");
        assert_eq!(result.subscription.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn provider_cancellation_pending_lands_canceling() {
        let f = fixture(customer_org());
        let mut sub = MockPaymentProvider::active_subscription("sub_1", "cus_1", "price_pro");
        sub.canceled_at = Some(1_701_000_000);
        sub.cancel_at = Some(1_702_592_000);
        f.provider.add_subscription(sub);

        let result = f.handler.handle(command(&f)).await.unwrap();

        assert_eq!(result.subscription.status, SubscriptionStatus::Canceling);
        assert_eq!(result.subscription.end_ts, 1_702_592_000);
    }

    #[tokio::test]
    async fn provider_failure_leaves_no_row() {
        let f = fixture(customer_org());
        f.provider.set_method_error(
            "get_subscription_by_customer",
            PaymentError::network("connection reset"),
        );

        let err = f.handler.handle(command(&f)).await.unwrap_err();

        assert!(matches!(err, BillingError::Provider { retryable: true, .. }));
        assert!(f.subscriptions.is_empty());
    }

    #[tokio::test]
    async fn unknown_plan_price_is_not_found() {
        let f = fixture(customer_org());
        let cmd = ReconcileCheckoutCommand {
            plan_price_id: PlanPriceId::new(),
            ..command(&f)
        };

        let err = f.handler.handle(cmd).await.unwrap_err();
        assert!(matches!(err, BillingError::NotFound { ref resource, .. } if resource == "PlanPrice"));
    }

    #[tokio::test]
    async fn notifier_failure_does_not_fail_checkout() {
        let plan = BillingPlan::new("Pro", "", 1).unwrap();
        let price = PlanPrice::new(plan.id, "Pro", 2_900, BillingCycle::Monthly).unwrap();
        let org = customer_org();
        let provider = MockPaymentProvider::new();
        provider.add_subscription(MockPaymentProvider::active_subscription("sub_1", "cus_1", "price_pro"));
        let handler = ReconcileCheckoutHandler::new(
            Arc::new(InMemorySubscriptionRepository::new()),
            Arc::new(InMemoryOrganizationRepository::new().with_organization(org.clone())),
            Arc::new(InMemoryPlanCatalog::new().with_price(price.clone())),
            Arc::new(provider),
            Arc::new(RecordingNotifier::failing()),
        );

        let result = handler
            .handle(ReconcileCheckoutCommand {
                organization_id: org.id,
                plan_price_id: price.id,
                coupon_code: None,
            })
            .await
            .unwrap();

        assert_eq!(result.subscription.status, SubscriptionStatus::Active);
    }
}
