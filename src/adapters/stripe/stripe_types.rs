//! Stripe API wire types.
//!
//! Only fields relevant to our processing are captured. Conversions into the
//! provider-neutral port types live here too.

use serde::{Deserialize, Serialize};

use crate::ports::{
    BillingAddress, PaymentMethodDetails, ProviderPrice, ProviderProduct, ProviderSubscription,
    ProviderSubscriptionStatus, SubscriptionItem,
};

/// A field Stripe returns either as an id or, when expanded, as the object.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Expandable<T> {
    Object(Box<T>),
    Id(String),
}

impl<T> Expandable<T> {
    pub fn object(&self) -> Option<&T> {
        match self {
            Expandable::Object(obj) => Some(obj),
            Expandable::Id(_) => None,
        }
    }
}

/// Stripe Customer object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeCustomer {
    /// Unique customer identifier (cus_...).
    pub id: String,

    pub email: Option<String>,
}

/// Stripe Subscription object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeSubscription {
    /// Unique subscription identifier (sub_...).
    pub id: String,

    /// Customer ID owning this subscription.
    pub customer: String,

    pub status: String,

    #[serde(default)]
    pub current_period_start: i64,

    #[serde(default)]
    pub current_period_end: i64,

    pub trial_end: Option<i64>,

    /// When cancellation was requested (Unix timestamp).
    pub canceled_at: Option<i64>,

    /// When the subscription is scheduled to end.
    pub cancel_at: Option<i64>,

    #[serde(default)]
    pub items: StripeList<StripeSubscriptionItem>,

    /// Expanded with `expand[]=default_payment_method`.
    pub default_payment_method: Option<Expandable<StripePaymentMethod>>,
}

/// Stripe list envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeList<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

impl<T> Default for StripeList<T> {
    fn default() -> Self {
        Self { data: Vec::new() }
    }
}

/// Single subscription item.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeSubscriptionItem {
    pub id: String,
    pub price: StripePrice,
}

/// Stripe Price object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripePrice {
    /// Price ID.
    pub id: String,

    #[serde(default)]
    pub product: Option<String>,

    #[serde(default)]
    pub unit_amount: Option<i64>,

    #[serde(default)]
    pub currency: String,
}

/// Stripe Product object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeProduct {
    pub id: String,
    pub name: String,
}

/// Stripe PaymentMethod object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripePaymentMethod {
    pub id: String,
    pub card: Option<StripeCard>,
    #[serde(default)]
    pub billing_details: StripeBillingDetails,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeCard {
    pub brand: String,
    pub last4: String,
    pub exp_month: i32,
    pub exp_year: i32,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StripeBillingDetails {
    pub address: Option<StripeAddress>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StripeAddress {
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

/// Stripe Checkout Session object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

/// Error body returned on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorBody {
    pub error: StripeErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorDetail {
    pub code: Option<String>,
    pub message: Option<String>,
}

impl From<StripeSubscription> for ProviderSubscription {
    fn from(sub: StripeSubscription) -> Self {
        let payment_method = sub
            .default_payment_method
            .as_ref()
            .and_then(Expandable::object)
            .and_then(StripePaymentMethod::details);

        ProviderSubscription {
            status: ProviderSubscriptionStatus::from_provider(&sub.status),
            items: sub
                .items
                .data
                .into_iter()
                .map(|item| SubscriptionItem {
                    id: item.id,
                    price_id: item.price.id,
                })
                .collect(),
            id: sub.id,
            customer_id: sub.customer,
            current_period_start: sub.current_period_start,
            current_period_end: sub.current_period_end,
            trial_end: sub.trial_end,
            canceled_at: sub.canceled_at,
            cancel_at: sub.cancel_at,
            payment_method,
        }
    }
}

impl StripePaymentMethod {
    /// Card summary; `None` for non-card methods.
    fn details(&self) -> Option<PaymentMethodDetails> {
        let card = self.card.as_ref()?;
        Some(PaymentMethodDetails {
            brand: card.brand.clone(),
            last4: card.last4.clone(),
            exp_month: card.exp_month,
            exp_year: card.exp_year,
            address: self.billing_details.address.as_ref().map(|a| BillingAddress {
                line1: a.line1.clone(),
                line2: a.line2.clone(),
                city: a.city.clone(),
                state: a.state.clone(),
                postal_code: a.postal_code.clone(),
                country: a.country.clone(),
            }),
        })
    }
}

impl From<StripePrice> for ProviderPrice {
    fn from(price: StripePrice) -> Self {
        ProviderPrice {
            id: price.id,
            product_id: price.product.unwrap_or_default(),
            unit_amount_cents: price.unit_amount.unwrap_or_default(),
            currency: price.currency.to_uppercase(),
        }
    }
}

impl From<StripeProduct> for ProviderProduct {
    fn from(product: StripeProduct) -> Self {
        ProviderProduct {
            id: product.id,
            name: product.name,
        }
    }
}
