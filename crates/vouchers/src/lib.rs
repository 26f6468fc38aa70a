//! Voucher domain module.
//!
//! This crate contains the business rules for voucher posting, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage):
//! voucher types and their number format, draft payload validation, GST
//! application to header and lines, and total reconciliation.

pub mod draft;
pub mod number;
pub mod voucher;

pub use draft::{DispatchDetails, PostableVoucher, VoucherDraft, VoucherLine, ITEM_INVOICE_MODE};
pub use number::format_number;
pub use voucher::VoucherType;
