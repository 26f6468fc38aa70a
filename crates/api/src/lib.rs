//! HTTP surface for voucher posting.

pub mod app;
