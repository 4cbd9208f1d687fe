//! Organization repository port.
//!
//! Only the billing columns of an organization are read or written here.

use async_trait::async_trait;

use crate::domain::billing::Organization;
use crate::domain::foundation::{DomainError, OrganizationId};

#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    async fn find_by_id(&self, id: &OrganizationId) -> Result<Option<Organization>, DomainError>;

    /// Persist the customer id and plan pointer.
    ///
    /// # Errors
    ///
    /// - `OrganizationNotFound` if the organization doesn't exist
    async fn update(&self, organization: &Organization) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn organization_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn OrganizationRepository) {}
    }
}
