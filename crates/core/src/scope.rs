//! Tenant scope: the triple that partitions all data in the system.

use serde::{Deserialize, Serialize};

use crate::id::{CompanyId, OwnerId, OwnerType};

/// Tenant partition for a request: `(company, owner type, owner id)`.
///
/// Every storage read/write is filtered by this triple. It is immutable for
/// the lifetime of a request and must be resolved before any domain logic runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantScope {
    pub company_id: CompanyId,
    pub owner_type: OwnerType,
    pub owner_id: OwnerId,
}

impl TenantScope {
    pub fn new(company_id: CompanyId, owner_type: OwnerType, owner_id: OwnerId) -> Self {
        Self {
            company_id,
            owner_type,
            owner_id,
        }
    }
}

impl core::fmt::Display for TenantScope {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.company_id, self.owner_type, self.owner_id
        )
    }
}
