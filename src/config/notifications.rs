//! Operator notification configuration

use serde::Deserialize;

use super::error::ValidationError;
use super::payment::is_http_url;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationsConfig {
    /// Slack incoming-webhook URL. Notifications are skipped when unset.
    #[serde(default)]
    pub slack_webhook_url: Option<String>,
}

impl NotificationsConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.slack_webhook_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() && !is_http_url(url) => {
                Err(ValidationError::InvalidUrl("NOTIFICATIONS__SLACK_WEBHOOK_URL"))
            }
            _ => Ok(()),
        }
    }
}
