//! Payment-method summary captured on a subscription.

use serde::{Deserialize, Serialize};

/// Point-in-time copy of the card on file. Not a live reference; it is
/// written once when the subscription is first confirmed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingInfo {
    #[serde(default)]
    pub card_type: String,
    #[serde(default)]
    pub card_last4: String,
    #[serde(default)]
    pub card_exp_month: i32,
    #[serde(default)]
    pub card_exp_year: i32,
    #[serde(default)]
    pub card_address1: String,
    #[serde(default)]
    pub card_address2: String,
    #[serde(default)]
    pub card_city: String,
    #[serde(default)]
    pub card_state: String,
    #[serde(default)]
    pub card_zip: String,
    #[serde(default)]
    pub card_country: String,
}

impl BillingInfo {
    /// True until a card summary has been merged in.
    pub fn is_empty(&self) -> bool {
        self.card_last4.is_empty() && self.card_type.is_empty()
    }
}
