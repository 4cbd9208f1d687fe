//! Slack incoming-webhook notifier.
//!
//! Without a webhook URL every notice is skipped, so local and test
//! environments need no Slack setup.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::billing::BillingCycle;
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::subscription::Subscription;
use crate::ports::{BillingNotice, BillingNotifier};

pub struct SlackNotifier {
    webhook_url: Option<String>,
    http_client: reqwest::Client,
}

impl SlackNotifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        let webhook_url = webhook_url.filter(|url| !url.trim().is_empty());
        if webhook_url.is_some() {
            tracing::info!("Billing notifications enabled with Slack webhook");
        } else {
            tracing::warn!("Billing notifications disabled (no Slack webhook URL configured)");
        }

        Self {
            webhook_url,
            http_client: reqwest::Client::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }
}

#[async_trait]
impl BillingNotifier for SlackNotifier {
    async fn notify(
        &self,
        notice: BillingNotice,
        subscription: &Subscription,
    ) -> Result<(), DomainError> {
        let Some(url) = &self.webhook_url else {
            tracing::debug!(notice = notice.as_str(), "Slack webhook not configured, skipping");
            return Ok(());
        };

        let message = SlackMessage::for_notice(notice, subscription);

        let response = self
            .http_client
            .post(url)
            .json(&message)
            .send()
            .await
            .map_err(|e| DomainError::new(ErrorCode::ExternalServiceError, e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(DomainError::new(
                ErrorCode::ExternalServiceError,
                format!("Slack webhook error: {}", error_text),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct SlackMessage {
    text: String,
    attachments: Vec<SlackAttachment>,
}

#[derive(Debug, Serialize)]
struct SlackAttachment {
    color: &'static str,
    title: String,
    fields: Vec<SlackField>,
    footer: &'static str,
}

#[derive(Debug, Serialize)]
struct SlackField {
    title: &'static str,
    value: String,
    short: bool,
}

impl SlackField {
    fn short(title: &'static str, value: impl Into<String>) -> Self {
        Self {
            title,
            value: value.into(),
            short: true,
        }
    }
}

impl SlackMessage {
    fn for_notice(notice: BillingNotice, sub: &Subscription) -> Self {
        let (text, color) = match notice {
            BillingNotice::SubscriptionStarted => ("New Subscription Started", "good"),
            BillingNotice::SubscriptionCanceled => ("Subscription Canceled", "warning"),
            BillingNotice::SubscriptionResumed => ("Subscription Resumed", "good"),
        };

        let mut fields = vec![
            SlackField::short("Organization", sub.organization_id.to_string()),
            SlackField::short("Plan ID", sub.provider_price_id.clone()),
            SlackField::short(
                "Amount",
                format_amount(sub.amount_cents, sub.billing_cycle),
            ),
            SlackField::short("Subscription ID", sub.provider_subscription_id.clone()),
        ];

        if notice == BillingNotice::SubscriptionCanceled {
            fields.push(SlackField::short("Access Ends", format_date(sub.end_ts)));
        }

        Self {
            text: text.to_string(),
            attachments: vec![SlackAttachment {
                color,
                title: text.to_string(),
                fields,
                footer: "Billing",
            }],
        }
    }
}

fn format_amount(cents: i64, cycle: BillingCycle) -> String {
    let cadence = match cycle {
        BillingCycle::Monthly => "month",
        BillingCycle::Quarterly => "quarter",
        BillingCycle::Annually => "year",
    };
    format!("${}.{:02}/{}", cents / 100, cents % 100, cadence)
}

fn format_date(ts: i64) -> String {
    if ts <= 0 {
        return "N/A".to_string();
    }
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}
