//! GST classification for voucher posting.
//!
//! This crate contains the pure tax-applicability decision: given the
//! registration state of the posting company and of the counterparty ledger,
//! decide whether a transaction is intra-state (CGST+SGST) or inter-state
//! (IGST) and constrain the tax totals accordingly. No I/O, no storage.

pub mod classifier;

pub use classifier::{classify, normalize_state, GstKind, TaxTotals};
