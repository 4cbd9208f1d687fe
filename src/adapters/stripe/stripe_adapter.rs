//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` trait against the Stripe REST API using
//! form-encoded requests and basic auth with the secret key.
//!
//! # Configuration
//!
//! ```ignore
//! let config = StripeConfig::new(api_key, "https://app.example.com/billing");
//! let adapter = StripePaymentAdapter::new(config);
//! ```

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use crate::domain::billing::BillingCycle;
use crate::ports::{
    CheckoutSession, CheckoutSessionRequest, CreateCustomerRequest, CreatePriceRequest, Customer,
    PaymentError, PaymentErrorCode, PaymentProvider, ProviderPrice, ProviderProduct,
    ProviderSubscription,
};

use super::stripe_types::{
    StripeCheckoutSession, StripeCustomer, StripeErrorBody, StripeList, StripePrice,
    StripeProduct, StripeSubscription,
};

const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,

    /// Where hosted checkout sends the customer afterwards.
    checkout_return_url: String,
}

impl StripeConfig {
    /// Create a new Stripe configuration.
    pub fn new(api_key: SecretString, checkout_return_url: impl Into<String>) -> Self {
        Self {
            api_key,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            checkout_return_url: checkout_return_url.into(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url, path)
    }
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("api_key", &"[REDACTED]")
            .field("api_base_url", &self.api_base_url)
            .field("checkout_return_url", &self.checkout_return_url)
            .finish()
    }
}

/// Stripe payment provider adapter.
///
/// Implements `PaymentProvider` for Stripe API integration.
pub struct StripePaymentAdapter {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripePaymentAdapter {
    /// Create a new Stripe adapter with the given configuration.
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.http_client
            .get(self.config.url(path))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
    }

    fn post(&self, path: &str, params: &[(String, String)]) -> RequestBuilder {
        self.http_client
            .post(self.config.url(path))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(params)
    }

    /// Sends a request and decodes the success body.
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: &'static str,
    ) -> Result<T, PaymentError> {
        let response = request
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(
                operation,
                status = status.as_u16(),
                error = %error_text,
                "Stripe request failed"
            );
            return Err(error_from_response(status, &error_text));
        }

        response.json::<T>().await.map_err(|e| {
            PaymentError::new(
                PaymentErrorCode::ProviderError,
                format!("Failed to parse Stripe response: {}", e),
            )
        })
    }

    async fn update_subscription(
        &self,
        subscription_id: &str,
        params: Vec<(String, String)>,
        operation: &'static str,
    ) -> Result<ProviderSubscription, PaymentError> {
        let mut params = params;
        params.push(param("expand[]", "default_payment_method"));

        let stripe_sub: StripeSubscription = self
            .send(
                self.post(&format!("/v1/subscriptions/{}", subscription_id), &params),
                operation,
            )
            .await?;
        Ok(stripe_sub.into())
    }
}

#[async_trait]
impl PaymentProvider for StripePaymentAdapter {
    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<Customer, PaymentError> {
        let mut params = vec![param("email", &request.email)];
        if let Some(name) = &request.name {
            params.push(param("name", name));
        }
        for (key, value) in &request.metadata {
            params.push(param(&format!("metadata[{}]", key), value));
        }

        let stripe_customer: StripeCustomer = self
            .send(self.post("/v1/customers", &params), "create_customer")
            .await?;

        tracing::info!(customer_id = %stripe_customer.id, "Stripe customer created");

        Ok(Customer {
            id: stripe_customer.id,
            email: stripe_customer.email.unwrap_or(request.email),
        })
    }

    async fn get_subscription_by_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<ProviderSubscription>, PaymentError> {
        let request = self.get("/v1/subscriptions").query(&[
            ("customer", customer_id),
            ("limit", "1"),
            ("expand[]", "data.default_payment_method"),
        ]);

        let list: StripeList<StripeSubscription> =
            self.send(request, "list_subscriptions").await?;

        Ok(list.data.into_iter().next().map(ProviderSubscription::from))
    }

    async fn get_subscription_by_id(
        &self,
        subscription_id: &str,
    ) -> Result<ProviderSubscription, PaymentError> {
        let request = self
            .get(&format!("/v1/subscriptions/{}", subscription_id))
            .query(&[("expand[]", "default_payment_method")]);

        let stripe_sub: StripeSubscription = self.send(request, "get_subscription").await?;
        Ok(stripe_sub.into())
    }

    async fn cancel(&self, subscription_id: &str) -> Result<ProviderSubscription, PaymentError> {
        self.update_subscription(
            subscription_id,
            vec![param("cancel_at_period_end", "true")],
            "cancel_subscription",
        )
        .await
    }

    async fn resume(&self, subscription_id: &str) -> Result<ProviderSubscription, PaymentError> {
        self.update_subscription(
            subscription_id,
            vec![param("cancel_at_period_end", "false")],
            "resume_subscription",
        )
        .await
    }

    async fn change_item_price(
        &self,
        subscription_id: &str,
        item_id: &str,
        new_price_id: &str,
        prorate: bool,
    ) -> Result<ProviderSubscription, PaymentError> {
        self.update_subscription(
            subscription_id,
            vec![
                param("items[0][id]", item_id),
                param("items[0][price]", new_price_id),
                param("proration_behavior", proration_behavior(prorate)),
            ],
            "change_item_price",
        )
        .await
    }

    async fn create_price(&self, request: CreatePriceRequest) -> Result<ProviderPrice, PaymentError> {
        let mut params = vec![
            param("product", &request.product_id),
            param("unit_amount", &request.unit_amount_cents.to_string()),
            param("currency", &request.currency.to_lowercase()),
        ];
        params.extend(recurring_params(request.billing_cycle));

        let price: StripePrice = self
            .send(self.post("/v1/prices", &params), "create_price")
            .await?;
        Ok(price.into())
    }

    async fn update_price(
        &self,
        price_id: &str,
        currency: &str,
        unit_amount_cents: i64,
    ) -> Result<ProviderPrice, PaymentError> {
        let currency = currency.to_lowercase();
        let params = vec![param(
            &format!("currency_options[{}][unit_amount]", currency),
            &unit_amount_cents.to_string(),
        )];

        let price: StripePrice = self
            .send(
                self.post(&format!("/v1/prices/{}", price_id), &params),
                "update_price",
            )
            .await?;
        Ok(price.into())
    }

    async fn create_product(
        &self,
        name: &str,
        description: &str,
    ) -> Result<ProviderProduct, PaymentError> {
        let params = product_params(name, description);
        let product: StripeProduct = self
            .send(self.post("/v1/products", &params), "create_product")
            .await?;
        Ok(product.into())
    }

    async fn update_product(
        &self,
        product_id: &str,
        name: &str,
        description: &str,
    ) -> Result<ProviderProduct, PaymentError> {
        let params = product_params(name, description);
        let product: StripeProduct = self
            .send(
                self.post(&format!("/v1/products/{}", product_id), &params),
                "update_product",
            )
            .await?;
        Ok(product.into())
    }

    async fn setup_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let params = checkout_params(&request, &self.config.checkout_return_url);

        let session: StripeCheckoutSession = self
            .send(
                self.post("/v1/checkout/sessions", &params),
                "create_checkout_session",
            )
            .await?;

        let url = session.url.ok_or_else(|| {
            PaymentError::provider("Stripe checkout session returned without a URL")
        })?;

        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }
}

fn param(key: &str, value: &str) -> (String, String) {
    (key.to_string(), value.to_string())
}

fn proration_behavior(prorate: bool) -> &'static str {
    if prorate {
        "create_prorations"
    } else {
        "none"
    }
}

/// Stripe has no quarterly interval; quarters are three months.
fn recurring_params(cycle: BillingCycle) -> Vec<(String, String)> {
    let (interval, count) = match cycle {
        BillingCycle::Quarterly => ("month", 3),
        other => (other.provider_interval(), 1),
    };
    vec![
        param("recurring[interval]", interval),
        param("recurring[interval_count]", &count.to_string()),
    ]
}

fn product_params(name: &str, description: &str) -> Vec<(String, String)> {
    let mut params = vec![param("name", name)];
    if !description.is_empty() {
        params.push(param("description", description));
    }
    params
}

fn checkout_params(request: &CheckoutSessionRequest, return_url: &str) -> Vec<(String, String)> {
    let mut params = vec![
        param("mode", "subscription"),
        param("customer", &request.customer_id),
        param("line_items[0][price]", &request.price_id),
        param("line_items[0][quantity]", "1"),
        param("success_url", return_url),
        param("cancel_url", return_url),
    ];

    // Stripe accepts either explicit discounts or the promo code field.
    if request.promo_codes.is_empty() {
        params.push(param("allow_promotion_codes", "true"));
    } else {
        for (i, code) in request.promo_codes.iter().enumerate() {
            params.push(param(&format!("discounts[{}][promotion_code]", i), code));
        }
    }
    params
}

fn error_from_response(status: StatusCode, body: &str) -> PaymentError {
    let detail = serde_json::from_str::<StripeErrorBody>(body)
        .ok()
        .map(|b| b.error);
    let message = detail
        .as_ref()
        .and_then(|d| d.message.clone())
        .unwrap_or_else(|| body.to_string());

    let code = match status {
        StatusCode::UNAUTHORIZED => PaymentErrorCode::AuthenticationError,
        StatusCode::PAYMENT_REQUIRED => PaymentErrorCode::CardDeclined,
        StatusCode::NOT_FOUND => PaymentErrorCode::NotFound,
        StatusCode::TOO_MANY_REQUESTS => PaymentErrorCode::RateLimitExceeded,
        StatusCode::BAD_REQUEST => PaymentErrorCode::InvalidRequest,
        _ => PaymentErrorCode::ProviderError,
    };

    let error = PaymentError::new(code, format!("Stripe API error: {}", message));
    match detail.and_then(|d| d.code) {
        Some(provider_code) => error.with_provider_code(provider_code),
        None => error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode as AxumStatus, routing::get, Json, Router};
    use serde_json::json;

    fn test_config() -> StripeConfig {
        StripeConfig::new(
            SecretString::new("sk_test_key".to_string()),
            "https://app.test/billing",
        )
    }

    fn has(params: &[(String, String)], key: &str, value: &str) -> bool {
        params.iter().any(|(k, v)| k == key && v == value)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn config_new_sets_defaults() {
        let config = test_config();
        assert_eq!(config.api_base_url, "https://api.stripe.com");
        assert_eq!(config.checkout_return_url, "https://app.test/billing");
    }

    #[test]
    fn config_with_base_url_strips_trailing_slash() {
        let config = test_config().with_base_url("http://localhost:8080/");
        assert_eq!(config.url("/v1/prices"), "http://localhost:8080/v1/prices");
    }

    #[test]
    fn config_debug_redacts_api_key() {
        let debug = format!("{:?}", test_config());
        assert!(!debug.contains("sk_test_key"));
        assert!(debug.contains("[REDACTED]"));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Request Parameter Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn quarterly_prices_recur_every_three_months() {
        let params = recurring_params(BillingCycle::Quarterly);
        assert!(has(&params, "recurring[interval]", "month"));
        assert!(has(&params, "recurring[interval_count]", "3"));
    }

    #[test]
    fn annual_prices_recur_yearly() {
        let params = recurring_params(BillingCycle::Annually);
        assert!(has(&params, "recurring[interval]", "year"));
        assert!(has(&params, "recurring[interval_count]", "1"));
    }

    #[test]
    fn checkout_params_apply_promo_codes() {
        let request = CheckoutSessionRequest {
            price_id: "price_1".into(),
            customer_id: "cus_1".into(),
            promo_codes: vec!["promo_1".into()],
        };
        let params = checkout_params(&request, "https://app.test/billing");

        assert!(has(&params, "mode", "subscription"));
        assert!(has(&params, "customer", "cus_1"));
        assert!(has(&params, "line_items[0][price]", "price_1"));
        assert!(has(&params, "discounts[0][promotion_code]", "promo_1"));
        assert!(!params.iter().any(|(k, _)| k == "allow_promotion_codes"));
    }

    #[test]
    fn checkout_params_without_codes_allow_entry() {
        let request = CheckoutSessionRequest {
            price_id: "price_1".into(),
            customer_id: "cus_1".into(),
            promo_codes: vec![],
        };
        let params = checkout_params(&request, "https://app.test/billing");
        assert!(has(&params, "allow_promotion_codes", "true"));
    }

    #[test]
    fn proration_behavior_follows_flag() {
        assert_eq!(proration_behavior(true), "create_prorations");
        assert_eq!(proration_behavior(false), "none");
    }

    #[test]
    fn empty_description_is_omitted() {
        let params = product_params("Pro", "");
        assert_eq!(params.len(), 1);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Error Mapping Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn not_found_response_maps_to_not_found() {
        let body = r#"{"error":{"code":"resource_missing","message":"No such subscription: 'sub_x'"}}"#;
        let err = error_from_response(StatusCode::NOT_FOUND, body);
        assert_eq!(err.code, PaymentErrorCode::NotFound);
        assert_eq!(err.provider_code.as_deref(), Some("resource_missing"));
        assert!(!err.retryable);
    }

    #[test]
    fn server_error_is_retryable() {
        let err = error_from_response(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(err.code, PaymentErrorCode::ProviderError);
        assert!(err.retryable);
        assert!(err.message.contains("upstream down"));
    }

    #[test]
    fn rate_limit_is_retryable() {
        let err = error_from_response(StatusCode::TOO_MANY_REQUESTS, "{}");
        assert_eq!(err.code, PaymentErrorCode::RateLimitExceeded);
        assert!(err.retryable);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // HTTP Round Trip Tests
    // ════════════════════════════════════════════════════════════════════════════

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn get_subscription_by_id_decodes_response() {
        let router = Router::new().route(
            "/v1/subscriptions/sub_123",
            get(|| async {
                Json(json!({
                    "id": "sub_123",
                    "customer": "cus_1",
                    "status": "trialing",
                    "current_period_start": 1_700_000_000,
                    "current_period_end": 1_702_592_000,
                    "trial_end": 1_701_000_000,
                    "items": { "data": [{ "id": "si_1", "price": { "id": "price_1" } }] },
                    "default_payment_method": null
                }))
            }),
        );
        let base = serve(router).await;
        let adapter = StripePaymentAdapter::new(test_config().with_base_url(base));

        let sub = adapter.get_subscription_by_id("sub_123").await.unwrap();

        assert_eq!(sub.customer_id, "cus_1");
        assert_eq!(sub.trial_end, Some(1_701_000_000));
        assert_eq!(sub.single_item().unwrap().id, "si_1");
    }

    #[tokio::test]
    async fn missing_subscription_is_not_found() {
        let router = Router::new().route(
            "/v1/subscriptions/sub_missing",
            get(|| async {
                (
                    AxumStatus::NOT_FOUND,
                    Json(json!({ "error": { "code": "resource_missing", "message": "No such subscription" } })),
                )
            }),
        );
        let base = serve(router).await;
        let adapter = StripePaymentAdapter::new(test_config().with_base_url(base));

        let err = adapter.get_subscription_by_id("sub_missing").await.unwrap_err();
        assert_eq!(err.code, PaymentErrorCode::NotFound);
    }

    #[tokio::test]
    async fn empty_subscription_list_is_none() {
        let router = Router::new().route(
            "/v1/subscriptions",
            get(|| async { Json(json!({ "object": "list", "data": [] })) }),
        );
        let base = serve(router).await;
        let adapter = StripePaymentAdapter::new(test_config().with_base_url(base));

        let sub = adapter.get_subscription_by_customer("cus_1").await.unwrap();
        assert!(sub.is_none());
    }

    #[tokio::test]
    async fn unreachable_host_is_network_error() {
        let adapter =
            StripePaymentAdapter::new(test_config().with_base_url("http://127.0.0.1:1"));
        let err = adapter.get_subscription_by_id("sub_1").await.unwrap_err();
        assert_eq!(err.code, PaymentErrorCode::NetworkError);
        assert!(err.retryable);
    }
}
