//! Webhook ingress errors.
//!
//! Only failures detected before the event is queued reach the HTTP response;
//! processing failures are reported on the worker's outcome channel.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors that occur while accepting a webhook request.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Signature header missing or invalid.
    #[error("Unauthorized: {0}")]
    Unauthorized(&'static str),

    /// No signing secret is configured.
    #[error("Webhook secret is not configured")]
    Misconfigured,

    /// Signature verified but the body could not be decoded.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// The processing queue is closed.
    #[error("Webhook queue unavailable")]
    QueueUnavailable,
}

impl WebhookError {
    /// Maps the error to an HTTP status code.
    ///
    /// - 4xx: the provider sent something we will never accept
    /// - 5xx: operator must fix the deployment
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            WebhookError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            WebhookError::Misconfigured | WebhookError::QueueUnavailable => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable code used in error bodies.
    pub fn error_code(&self) -> &'static str {
        match self {
            WebhookError::Unauthorized(_) => "UNAUTHORIZED",
            WebhookError::Misconfigured => "MISCONFIGURED",
            WebhookError::MalformedPayload(_) => "MALFORMED_PAYLOAD",
            WebhookError::QueueUnavailable => "QUEUE_UNAVAILABLE",
        }
    }
}
