//! Provider webhook ingestion: signature verification and event classification.

mod errors;
mod event;
mod verifier;

pub use errors::WebhookError;
pub use event::{
    SubscriptionEvent, SubscriptionEventKind, SubscriptionObject, WebhookEvent, WebhookEventData,
};
pub use verifier::{sign_payload, WebhookVerifier, SIGNATURE_HEADER};
