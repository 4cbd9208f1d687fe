//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Command handlers mutate the subscription write model; query handlers read
//! the projection.

pub mod handlers;

pub use handlers::billing;
