//! PostgreSQL adapters - Database implementations for the persistence ports.
//!
//! - `PostgresSubscriptionRepository` - subscription write model
//! - `PostgresSubscriptionReader` - joined subscription projection
//! - `PostgresOrganizationRepository` - organization billing linkage
//! - `PostgresPlanCatalog` - plans and plan prices

mod database;
mod organization_repository;
mod plan_catalog;
mod subscription_reader;
mod subscription_repository;

pub use database::{connect, run_migrations};
pub use organization_repository::PostgresOrganizationRepository;
pub use plan_catalog::PostgresPlanCatalog;
pub use subscription_reader::PostgresSubscriptionReader;
pub use subscription_repository::PostgresSubscriptionRepository;
