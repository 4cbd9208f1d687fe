//! In-memory organization repository.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::billing::Organization;
use crate::domain::foundation::{DomainError, ErrorCode, OrganizationId};
use crate::ports::OrganizationRepository;

#[derive(Default)]
pub struct InMemoryOrganizationRepository {
    organizations: Mutex<HashMap<OrganizationId, Organization>>,
}

impl InMemoryOrganizationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an organization.
    pub fn with_organization(self, organization: Organization) -> Self {
        self.put(organization);
        self
    }

    pub fn put(&self, organization: Organization) {
        self.organizations().insert(organization.id, organization);
    }

    pub fn get(&self, id: &OrganizationId) -> Option<Organization> {
        self.organizations().get(id).cloned()
    }

    fn organizations(&self) -> MutexGuard<'_, HashMap<OrganizationId, Organization>> {
        self.organizations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl OrganizationRepository for InMemoryOrganizationRepository {
    async fn find_by_id(&self, id: &OrganizationId) -> Result<Option<Organization>, DomainError> {
        Ok(self.get(id))
    }

    async fn update(&self, organization: &Organization) -> Result<(), DomainError> {
        let mut organizations = self.organizations();
        match organizations.get_mut(&organization.id) {
            Some(existing) => {
                *existing = organization.clone();
                Ok(())
            }
            None => Err(
                DomainError::new(ErrorCode::OrganizationNotFound, "Organization not found")
                    .with_detail("resource", "Organization")
                    .with_detail("key", organization.id.to_string()),
            ),
        }
    }
}
