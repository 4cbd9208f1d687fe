//! Billing Reconciler - Subscription state convergence for a payment provider
//!
//! Keeps a local subscription record consistent with the provider's view
//! across three asynchronous sources: the client-driven checkout callback,
//! signed provider webhooks, and user-initiated plan changes.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
