//! Domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod fiscal;
pub mod id;
pub mod scope;

pub use error::{DomainError, DomainResult};
pub use fiscal::FiscalYear;
pub use id::{CompanyId, ItemLedgerId, OwnerId, OwnerType, PartyLedgerId, VoucherId};
pub use scope::TenantScope;
