//! Billing cadence of a plan price.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::ValidationError;

/// How often a plan price is charged.
///
/// Persisted as a small integer (`Monthly = 1`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    #[default]
    Monthly,
    Quarterly,
    Annually,
}

impl BillingCycle {
    /// Numeric code used in storage.
    pub fn code(&self) -> i16 {
        match self {
            BillingCycle::Monthly => 1,
            BillingCycle::Quarterly => 2,
            BillingCycle::Annually => 3,
        }
    }

    /// Parses a stored numeric code.
    pub fn from_code(code: i16) -> Result<Self, ValidationError> {
        match code {
            1 => Ok(BillingCycle::Monthly),
            2 => Ok(BillingCycle::Quarterly),
            3 => Ok(BillingCycle::Annually),
            other => Err(ValidationError::out_of_range("billing_cycle", 1, 3, other as i64)),
        }
    }

    /// Recurring interval name understood by the provider.
    pub fn provider_interval(&self) -> &'static str {
        match self {
            BillingCycle::Monthly => "month",
            BillingCycle::Quarterly => "quarter",
            BillingCycle::Annually => "year",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for cycle in [BillingCycle::Monthly, BillingCycle::Quarterly, BillingCycle::Annually] {
            assert_eq!(BillingCycle::from_code(cycle.code()), Ok(cycle));
        }
    }

    #[test]
    fn unknown_code_is_rejected() {
        assert!(BillingCycle::from_code(0).is_err());
        assert!(BillingCycle::from_code(4).is_err());
    }

    #[test]
    fn provider_intervals_match_cadence() {
        assert_eq!(BillingCycle::Monthly.provider_interval(), "month");
        assert_eq!(BillingCycle::Quarterly.provider_interval(), "quarter");
        assert_eq!(BillingCycle::Annually.provider_interval(), "year");
    }
}
