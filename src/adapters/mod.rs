//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `http` - Axum routes for checkout, lifecycle commands and webhook ingress
//! - `webhook` - Bounded queue and background worker for verified events
//! - `postgres` - Persistence ports backed by PostgreSQL
//! - `stripe` - Payment provider client and its test double
//! - `notifications` - Best-effort lifecycle notices
//! - `memory` - In-memory persistence doubles

pub mod http;
pub mod memory;
pub mod notifications;
pub mod postgres;
pub mod stripe;
pub mod webhook;
