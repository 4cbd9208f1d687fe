//! Webhook processing pipeline.
//!
//! The HTTP ingress verifies and classifies an event, hands it to the
//! [`WebhookQueue`] and answers 200. The [`WebhookWorker`] drains the queue in
//! the background and reports each result as a [`WebhookOutcome`].

mod worker;

pub use worker::{WebhookOutcome, WebhookQueue, WebhookWorker, DEFAULT_QUEUE_CAPACITY};
