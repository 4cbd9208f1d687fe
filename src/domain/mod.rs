//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, state machine)
//! - `billing` - Plans, plan prices and the owning organization
//! - `subscription` - Subscription lifecycle, write model and read projection
//! - `webhook` - Provider webhook verification and event classification

pub mod billing;
pub mod foundation;
pub mod subscription;
pub mod webhook;
