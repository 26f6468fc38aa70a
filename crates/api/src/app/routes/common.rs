//! Shared extraction helpers: tenant scope and list filters.

use axum::response::Response;
use chrono::NaiveDate;
use serde::Deserialize;

use kosh_core::{CompanyId, OwnerId, OwnerType, TenantScope};
use kosh_store::VoucherFilter;

use crate::app::dto::VoucherRequest;
use crate::app::errors;

/// Tenant triple as it arrives in the query string. Both snake and camel
/// keys are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScopeParams {
    #[serde(default, alias = "companyId")]
    pub company_id: Option<i64>,
    #[serde(default, alias = "ownerType")]
    pub owner_type: Option<String>,
    #[serde(default, alias = "ownerId")]
    pub owner_id: Option<i64>,
}

/// Resolve the tenant scope from the query params, falling back to the
/// request body for callers that scope there. Any missing component stops
/// the request with a 401 envelope before any other work.
pub fn resolve_scope(
    query: &ScopeParams,
    body: Option<&VoucherRequest>,
) -> Result<TenantScope, Response> {
    let company_id = query.company_id.or(body.and_then(|b| b.company_id));
    let owner_type = query
        .owner_type
        .clone()
        .or_else(|| body.and_then(|b| b.owner_type.clone()));
    let owner_id = query.owner_id.or(body.and_then(|b| b.owner_id));

    match (company_id, owner_type, owner_id) {
        (Some(company), Some(owner_type), Some(owner)) if !owner_type.trim().is_empty() => {
            Ok(TenantScope::new(
                CompanyId::new(company),
                OwnerType::new(owner_type),
                OwnerId::new(owner),
            ))
        }
        _ => Err(errors::unauthorized()),
    }
}

/// Query params for the list endpoints. The scope fields are repeated here
/// rather than nested because the query deserializer cannot flatten
/// numeric fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    #[serde(default, alias = "companyId")]
    pub company_id: Option<i64>,
    #[serde(default, alias = "ownerType")]
    pub owner_type: Option<String>,
    #[serde(default, alias = "ownerId")]
    pub owner_id: Option<i64>,
    #[serde(default)]
    pub month: Option<u32>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

impl ListParams {
    pub fn scope(&self) -> ScopeParams {
        ScopeParams {
            company_id: self.company_id,
            owner_type: self.owner_type.clone(),
            owner_id: self.owner_id,
        }
    }

    pub fn filter(&self) -> VoucherFilter {
        VoucherFilter {
            month: self.month,
            year: self.year,
            from: self.from,
            to: self.to,
        }
    }
}
