//! In-memory adapters.
//!
//! Test doubles for the persistence ports, injected through handler
//! constructors. Each store enforces the same uniqueness rules as the
//! Postgres schema.

mod organization_repository;
mod plan_catalog;
mod subscription_reader;
mod subscription_repository;

pub use organization_repository::InMemoryOrganizationRepository;
pub use plan_catalog::InMemoryPlanCatalog;
pub use subscription_reader::InMemorySubscriptionReader;
pub use subscription_repository::InMemorySubscriptionRepository;
