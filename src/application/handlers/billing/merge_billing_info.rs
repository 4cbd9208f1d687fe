//! Billing info merger - copies the provider's payment-method summary onto a
//! subscription row.

use crate::domain::subscription::{BillingInfo, Subscription};
use crate::ports::PaymentMethodDetails;

/// Maps a provider card summary into the local snapshot shape.
pub fn billing_info_from(details: &PaymentMethodDetails) -> BillingInfo {
    let address = details.address.clone().unwrap_or_default();
    BillingInfo {
        card_type: details.brand.clone(),
        card_last4: details.last4.clone(),
        card_exp_month: details.exp_month,
        card_exp_year: details.exp_year,
        card_address1: address.line1.unwrap_or_default(),
        card_address2: address.line2.unwrap_or_default(),
        card_city: address.city.unwrap_or_default(),
        card_state: address.state.unwrap_or_default(),
        card_zip: address.postal_code.unwrap_or_default(),
        card_country: address.country.unwrap_or_default(),
    }
}

/// Merges the payment-method summary into `subscription`.
///
/// Missing detail is not an error: the card may not be attached yet early in
/// checkout. Returns true when billing info was written.
pub fn merge_billing_info(
    subscription: &mut Subscription,
    details: Option<&PaymentMethodDetails>,
) -> bool {
    let Some(details) = details else {
        tracing::debug!(
            subscription_id = %subscription.id,
            "No payment method on provider subscription, billing info unchanged"
        );
        return false;
    };

    subscription.capture_billing_info(billing_info_from(details));
    true
}
