//! Provider webhook event envelope and classification.
//!
//! Only fields relevant to reconciliation are captured; everything else in
//! the provider's payload is ignored.

use serde::{Deserialize, Serialize};

use crate::domain::subscription::ProviderPeriod;

use super::errors::WebhookError;

/// Webhook event envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookEvent {
    /// Unique identifier for the event (evt_xxx format).
    pub id: String,

    /// Type of event (e.g., "customer.subscription.updated").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Time at which the event was created (Unix timestamp).
    #[serde(default)]
    pub created: i64,

    pub data: WebhookEventData,
}

/// Container for event-specific data.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookEventData {
    /// Polymorphic on the event type.
    pub object: serde_json::Value,
}

/// Subscription object carried by `customer.subscription.*` events.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SubscriptionObject {
    pub id: String,
    #[serde(default)]
    pub customer: Option<String>,
    pub status: String,
    #[serde(default)]
    pub canceled_at: Option<i64>,
    #[serde(default)]
    pub cancel_at: Option<i64>,
    #[serde(default)]
    pub current_period_start: Option<i64>,
    #[serde(default)]
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub trial_end: Option<i64>,
}

impl SubscriptionObject {
    pub fn period(&self) -> ProviderPeriod {
        ProviderPeriod {
            current_period_start: self.current_period_start.unwrap_or_default(),
            current_period_end: self.current_period_end.unwrap_or_default(),
            trial_end: self.trial_end,
            canceled_at: self.canceled_at,
            cancel_at: self.cancel_at,
        }
    }
}

/// Lifecycle handler selected for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionEventKind {
    Active,
    TrialStarted,
    Canceled,
    Paused,
    Unpaid,
}

impl SubscriptionEventKind {
    /// Maps a provider subscription status string.
    pub fn from_provider_status(status: &str) -> Option<Self> {
        match status {
            "active" => Some(Self::Active),
            "trialing" => Some(Self::TrialStarted),
            "canceled" => Some(Self::Canceled),
            "paused" => Some(Self::Paused),
            "unpaid" => Some(Self::Unpaid),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::TrialStarted => "trial_started",
            Self::Canceled => "canceled",
            Self::Paused => "paused",
            Self::Unpaid => "unpaid",
        }
    }
}

/// A verified event the dispatcher acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionEvent {
    pub event_id: String,
    pub kind: SubscriptionEventKind,
    pub subscription: SubscriptionObject,
}

impl WebhookEvent {
    /// Decodes the raw body into an envelope.
    pub fn parse(payload: &[u8]) -> Result<Self, WebhookError> {
        serde_json::from_slice(payload).map_err(|e| WebhookError::MalformedPayload(e.to_string()))
    }

    /// Selects the lifecycle handler for this event.
    ///
    /// Returns `Ok(None)` for events this system does not act on. A
    /// subscription event whose object cannot be decoded is malformed.
    pub fn classify(&self) -> Result<Option<SubscriptionEvent>, WebhookError> {
        let forced = match self.event_type.as_str() {
            "customer.subscription.deleted" => Some(SubscriptionEventKind::Canceled),
            "customer.subscription.paused" => Some(SubscriptionEventKind::Paused),
            "customer.subscription.created"
            | "customer.subscription.updated"
            | "customer.subscription.resumed" => None,
            _ => return Ok(None),
        };

        let subscription: SubscriptionObject = serde_json::from_value(self.data.object.clone())
            .map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;

        let kind = match forced.or_else(|| {
            SubscriptionEventKind::from_provider_status(&subscription.status)
        }) {
            Some(kind) => kind,
            None => return Ok(None),
        };

        Ok(Some(SubscriptionEvent {
            event_id: self.id.clone(),
            kind,
            subscription,
        }))
    }
}
