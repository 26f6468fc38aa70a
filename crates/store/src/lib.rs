//! Voucher persistence.
//!
//! The relational schema itself is an external collaborator: tables are
//! provisioned ahead of time by the platform's migration tooling, never
//! mutated on the request path. This crate reads and writes through
//! [`VoucherStore`], with two implementations:
//!
//! - [`PostgresVoucherStore`]: production store. Each create/update/delete is
//!   one transaction, so a failure mid-sequence leaves no partial voucher
//!   visible. Voucher numbers are allocated inside the posting transaction
//!   and protected by a unique key on
//!   `(company_id, owner_type, owner_id, voucher_type, fiscal_year,
//!   sequence_no)`, with bounded retry on conflict.
//! - [`InMemoryVoucherStore`]: tests/dev. Same contract, allocation
//!   serialized under a lock.

pub mod error;
pub mod in_memory;
pub mod postgres;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use in_memory::InMemoryVoucherStore;
pub use postgres::PostgresVoucherStore;
pub use store::{
    derive_ledger_entries, derive_sale_history, CreatedVoucher, LedgerEntryRow, SaleHistoryRow,
    StoredLine, StoredVoucher, VoucherFilter, VoucherHeader, VoucherStore,
};
