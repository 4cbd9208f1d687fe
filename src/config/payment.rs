//! Payment provider configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// Payment provider configuration (Stripe)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Secret API key (`sk_test_...` or `sk_live_...`)
    pub stripe_api_key: SecretString,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Webhook signing secret. Without it every webhook is answered with 500.
    #[serde(default)]
    pub webhook_secret: Option<SecretString>,

    /// Where hosted checkout sends the customer back to.
    #[serde(default)]
    pub checkout_return_url: String,
}

impl PaymentConfig {
    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.expose_secret().starts_with("sk_test_")
    }

    pub fn has_webhook_secret(&self) -> bool {
        self.webhook_secret
            .as_ref()
            .is_some_and(|s| !s.expose_secret().is_empty())
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let key = self.stripe_api_key.expose_secret();
        if key.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__STRIPE_API_KEY"));
        }
        if !key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !is_http_url(&self.api_base_url) {
            return Err(ValidationError::InvalidUrl("PAYMENT__API_BASE_URL"));
        }
        if !self.checkout_return_url.is_empty() && !is_http_url(&self.checkout_return_url) {
            return Err(ValidationError::InvalidUrl("PAYMENT__CHECKOUT_RETURN_URL"));
        }
        Ok(())
    }
}

pub(super) fn is_http_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

fn default_api_base_url() -> String {
    "https://api.stripe.com".to_string()
}
