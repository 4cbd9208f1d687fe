//! Mock payment provider for testing.
//!
//! Provides a configurable implementation of `PaymentProvider` for unit and
//! integration tests. Supports:
//! - Seeded provider subscriptions, prices and products
//! - Error injection per method
//! - Call tracking

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::ports::{
    CheckoutSession, CheckoutSessionRequest, CreateCustomerRequest, CreatePriceRequest, Customer,
    PaymentError, PaymentMethodDetails, PaymentProvider, ProviderPrice, ProviderProduct,
    ProviderSubscription, ProviderSubscriptionStatus, SubscriptionItem,
};

/// Mock payment provider for testing.
///
/// Clones share state, so a test can keep one handle for assertions and
/// inject another into the handler under test.
///
/// # Example
///
/// ```ignore
/// let mock = MockPaymentProvider::new();
/// mock.add_subscription(MockPaymentProvider::active_subscription("sub_1", "cus_1", "price_1"));
/// mock.set_method_error("cancel", PaymentError::network("timeout"));
///
/// let handler = CancelSubscriptionHandler::new(repo, Arc::new(mock.clone()), notifier);
/// assert!(mock.was_called("cancel"));
/// ```
#[derive(Clone, Default)]
pub struct MockPaymentProvider {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    customers: HashMap<String, Customer>,
    subscriptions: HashMap<String, ProviderSubscription>,
    prices: HashMap<String, ProviderPrice>,
    products: HashMap<String, ProviderProduct>,

    /// Next checkout session to return.
    next_checkout: Option<CheckoutSession>,

    /// Error to return on next call.
    next_error: Option<PaymentError>,

    /// Specific errors by method name.
    method_errors: HashMap<String, PaymentError>,

    /// Track method calls for assertions.
    call_log: Vec<MethodCall>,

    sequence: u32,
}

impl MockState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.sequence += 1;
        format!("{}_mock_{}", prefix, self.sequence)
    }
}

/// Recorded method call for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// An active single-item subscription with a card on file.
    pub fn active_subscription(id: &str, customer_id: &str, price_id: &str) -> ProviderSubscription {
        ProviderSubscription {
            id: id.to_string(),
            customer_id: customer_id.to_string(),
            status: ProviderSubscriptionStatus::Active,
            current_period_start: 1_700_000_000,
            current_period_end: 1_702_592_000,
            trial_end: None,
            canceled_at: None,
            cancel_at: None,
            items: vec![SubscriptionItem {
                id: format!("si_{}", id),
                price_id: price_id.to_string(),
            }],
            payment_method: Some(PaymentMethodDetails {
                brand: "visa".to_string(),
                last4: "4242".to_string(),
                exp_month: 12,
                exp_year: 2030,
                address: None,
            }),
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Add a subscription to the "database".
    pub fn add_subscription(&self, subscription: ProviderSubscription) {
        let id = subscription.id.clone();
        self.state().subscriptions.insert(id, subscription);
    }

    pub fn add_price(&self, price: ProviderPrice) {
        let id = price.id.clone();
        self.state().prices.insert(id, price);
    }

    pub fn add_product(&self, product: ProviderProduct) {
        let id = product.id.clone();
        self.state().products.insert(id, product);
    }

    pub fn set_checkout_session(&self, session: CheckoutSession) {
        self.state().next_checkout = Some(session);
    }

    /// Set an error to return on the next call to any method.
    pub fn set_error(&self, error: PaymentError) {
        self.state().next_error = Some(error);
    }

    /// Set an error for a specific method.
    pub fn set_method_error(&self, method: &str, error: PaymentError) {
        self.state()
            .method_errors
            .insert(method.to_string(), error);
    }

    pub fn clear_errors(&self) {
        let mut state = self.state();
        state.next_error = None;
        state.method_errors.clear();
    }

    /// Current provider-side view of a subscription.
    pub fn subscription(&self, id: &str) -> Option<ProviderSubscription> {
        self.state().subscriptions.get(id).cloned()
    }

    pub fn price(&self, id: &str) -> Option<ProviderPrice> {
        self.state().prices.get(id).cloned()
    }

    pub fn product(&self, id: &str) -> Option<ProviderProduct> {
        self.state().products.get(id).cloned()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.state().call_log.iter().any(|c| c.method == method)
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    pub fn clear_calls(&self) {
        self.state().call_log.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Internal Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_call(&self, method: &str, args: Vec<String>) {
        self.state().call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });
    }

    fn check_error(&self, method: &str) -> Result<(), PaymentError> {
        let mut state = self.state();

        // Method-specific error first
        if let Some(error) = state.method_errors.get(method) {
            return Err(error.clone());
        }

        // Global error (consumed)
        if let Some(error) = state.next_error.take() {
            return Err(error);
        }

        Ok(())
    }

    fn update_subscription<F>(&self, id: &str, mutate: F) -> Result<ProviderSubscription, PaymentError>
    where
        F: FnOnce(&mut ProviderSubscription) -> Result<(), PaymentError>,
    {
        let mut state = self.state();
        let subscription = state
            .subscriptions
            .get_mut(id)
            .ok_or_else(|| PaymentError::not_found("Subscription"))?;
        mutate(subscription)?;
        Ok(subscription.clone())
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<Customer, PaymentError> {
        self.record_call("create_customer", vec![request.email.clone()]);
        self.check_error("create_customer")?;

        let mut state = self.state();
        let customer = Customer {
            id: state.next_id("cus"),
            email: request.email,
        };
        state.customers.insert(customer.id.clone(), customer.clone());

        Ok(customer)
    }

    async fn get_subscription_by_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<ProviderSubscription>, PaymentError> {
        self.record_call("get_subscription_by_customer", vec![customer_id.to_string()]);
        self.check_error("get_subscription_by_customer")?;

        let state = self.state();
        Ok(state
            .subscriptions
            .values()
            .find(|s| s.customer_id == customer_id)
            .cloned())
    }

    async fn get_subscription_by_id(
        &self,
        subscription_id: &str,
    ) -> Result<ProviderSubscription, PaymentError> {
        self.record_call("get_subscription_by_id", vec![subscription_id.to_string()]);
        self.check_error("get_subscription_by_id")?;

        self.subscription(subscription_id)
            .ok_or_else(|| PaymentError::not_found("Subscription"))
    }

    async fn cancel(&self, subscription_id: &str) -> Result<ProviderSubscription, PaymentError> {
        self.record_call("cancel", vec![subscription_id.to_string()]);
        self.check_error("cancel")?;

        self.update_subscription(subscription_id, |sub| {
            sub.canceled_at = Some(chrono::Utc::now().timestamp());
            sub.cancel_at = Some(sub.current_period_end);
            Ok(())
        })
    }

    async fn resume(&self, subscription_id: &str) -> Result<ProviderSubscription, PaymentError> {
        self.record_call("resume", vec![subscription_id.to_string()]);
        self.check_error("resume")?;

        self.update_subscription(subscription_id, |sub| {
            sub.canceled_at = None;
            sub.cancel_at = None;
            Ok(())
        })
    }

    async fn change_item_price(
        &self,
        subscription_id: &str,
        item_id: &str,
        new_price_id: &str,
        prorate: bool,
    ) -> Result<ProviderSubscription, PaymentError> {
        self.record_call(
            "change_item_price",
            vec![
                subscription_id.to_string(),
                item_id.to_string(),
                new_price_id.to_string(),
                prorate.to_string(),
            ],
        );
        self.check_error("change_item_price")?;

        self.update_subscription(subscription_id, |sub| {
            let item = sub
                .items
                .iter_mut()
                .find(|i| i.id == item_id)
                .ok_or_else(|| PaymentError::not_found("Subscription item"))?;
            item.price_id = new_price_id.to_string();
            Ok(())
        })
    }

    async fn create_price(&self, request: CreatePriceRequest) -> Result<ProviderPrice, PaymentError> {
        self.record_call(
            "create_price",
            vec![
                request.product_id.clone(),
                request.unit_amount_cents.to_string(),
                request.billing_cycle.provider_interval().to_string(),
            ],
        );
        self.check_error("create_price")?;

        let mut state = self.state();
        let price = ProviderPrice {
            id: state.next_id("price"),
            product_id: request.product_id,
            unit_amount_cents: request.unit_amount_cents,
            currency: request.currency,
        };
        state.prices.insert(price.id.clone(), price.clone());

        Ok(price)
    }

    async fn update_price(
        &self,
        price_id: &str,
        currency: &str,
        unit_amount_cents: i64,
    ) -> Result<ProviderPrice, PaymentError> {
        self.record_call(
            "update_price",
            vec![
                price_id.to_string(),
                currency.to_string(),
                unit_amount_cents.to_string(),
            ],
        );
        self.check_error("update_price")?;

        let mut state = self.state();
        let price = state
            .prices
            .get_mut(price_id)
            .ok_or_else(|| PaymentError::not_found("Price"))?;
        price.currency = currency.to_string();
        price.unit_amount_cents = unit_amount_cents;

        Ok(price.clone())
    }

    async fn create_product(
        &self,
        name: &str,
        description: &str,
    ) -> Result<ProviderProduct, PaymentError> {
        self.record_call(
            "create_product",
            vec![name.to_string(), description.to_string()],
        );
        self.check_error("create_product")?;

        let mut state = self.state();
        let product = ProviderProduct {
            id: state.next_id("prod"),
            name: name.to_string(),
        };
        state.products.insert(product.id.clone(), product.clone());

        Ok(product)
    }

    async fn update_product(
        &self,
        product_id: &str,
        name: &str,
        description: &str,
    ) -> Result<ProviderProduct, PaymentError> {
        self.record_call(
            "update_product",
            vec![
                product_id.to_string(),
                name.to_string(),
                description.to_string(),
            ],
        );
        self.check_error("update_product")?;

        let mut state = self.state();
        let product = state
            .products
            .get_mut(product_id)
            .ok_or_else(|| PaymentError::not_found("Product"))?;
        product.name = name.to_string();

        Ok(product.clone())
    }

    async fn setup_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let mut args = vec![request.price_id.clone(), request.customer_id.clone()];
        args.extend(request.promo_codes.iter().cloned());
        self.record_call("setup_checkout_session", args);
        self.check_error("setup_checkout_session")?;

        let mut state = self.state();
        let session = match state.next_checkout.take() {
            Some(session) => session,
            None => {
                let id = state.next_id("cs");
                CheckoutSession {
                    url: format!("https://checkout.stripe.com/c/pay/{}", id),
                    id,
                }
            }
        };

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::BillingCycle;

    // ══════════════════════════════════════════════════════════════
    // Customer Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn create_customer_generates_id() {
        let mock = MockPaymentProvider::new();

        let customer = mock
            .create_customer(CreateCustomerRequest {
                email: "billing@acme.test".into(),
                name: None,
                metadata: HashMap::new(),
            })
            .await
            .unwrap();

        assert!(customer.id.starts_with("cus_mock_"));
        assert!(mock.was_called("create_customer"));
    }

    // ══════════════════════════════════════════════════════════════
    // Subscription Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn finds_subscription_by_customer() {
        let mock = MockPaymentProvider::new();
        mock.add_subscription(MockPaymentProvider::active_subscription(
            "sub_1", "cus_1", "price_1",
        ));

        let found = mock.get_subscription_by_customer("cus_1").await.unwrap();
        let missing = mock.get_subscription_by_customer("cus_2").await.unwrap();

        assert_eq!(found.map(|s| s.id), Some("sub_1".to_string()));
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn cancel_then_resume_clears_schedule() {
        let mock = MockPaymentProvider::new();
        mock.add_subscription(MockPaymentProvider::active_subscription(
            "sub_1", "cus_1", "price_1",
        ));

        let canceled = mock.cancel("sub_1").await.unwrap();
        assert_eq!(canceled.cancel_at, Some(canceled.current_period_end));

        let resumed = mock.resume("sub_1").await.unwrap();
        assert!(resumed.canceled_at.is_none());
    }

    #[tokio::test]
    async fn change_item_price_swaps_price() {
        let mock = MockPaymentProvider::new();
        mock.add_subscription(MockPaymentProvider::active_subscription(
            "sub_1", "cus_1", "price_1",
        ));

        let updated = mock
            .change_item_price("sub_1", "si_sub_1", "price_2", true)
            .await
            .unwrap();

        assert_eq!(updated.items[0].price_id, "price_2");
    }

    #[tokio::test]
    async fn unknown_subscription_is_not_found() {
        let mock = MockPaymentProvider::new();
        let err = mock.get_subscription_by_id("sub_missing").await.unwrap_err();
        assert_eq!(err.code, crate::ports::PaymentErrorCode::NotFound);
    }

    // ══════════════════════════════════════════════════════════════
    // Error Injection Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn method_error_persists() {
        let mock = MockPaymentProvider::new();
        mock.set_method_error("create_price", PaymentError::network("down"));

        let request = CreatePriceRequest {
            product_id: "prod_1".into(),
            unit_amount_cents: 100,
            currency: "USD".into(),
            billing_cycle: BillingCycle::Monthly,
        };

        assert!(mock.create_price(request.clone()).await.is_err());
        assert!(mock.create_price(request).await.is_err());
        assert_eq!(mock.call_count("create_price"), 2);
    }

    #[tokio::test]
    async fn global_error_is_consumed() {
        let mock = MockPaymentProvider::new();
        mock.set_error(PaymentError::network("blip"));

        assert!(mock.create_product("Pro", "").await.is_err());
        assert!(mock.create_product("Pro", "").await.is_ok());
    }
}
