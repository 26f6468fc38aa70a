//! The `VoucherStore` contract and its record types.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use kosh_core::{FiscalYear, ItemLedgerId, PartyLedgerId, TenantScope, VoucherId};
use kosh_gst::GstKind;
use kosh_vouchers::{DispatchDetails, PostableVoucher, VoucherType};

use crate::error::StoreResult;

/// Outcome of a successful voucher posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedVoucher {
    pub id: VoucherId,
    pub number: String,
    pub sequence: i64,
    pub fiscal_year: FiscalYear,
    pub kind: GstKind,
}

/// A persisted voucher header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherHeader {
    pub id: VoucherId,
    pub voucher_type: VoucherType,
    pub number: String,
    pub sequence: i64,
    pub fiscal_year: FiscalYear,
    pub kind: GstKind,
    pub date: NaiveDate,
    pub party_id: PartyLedgerId,
    pub subtotal: i64,
    pub cgst_total: i64,
    pub sgst_total: i64,
    pub igst_total: i64,
    pub discount_total: i64,
    pub tds_total: i64,
    pub total: i64,
    pub narration: Option<String>,
    pub reference_no: Option<String>,
    pub dispatch: Option<DispatchDetails>,
    pub is_quotation: bool,
    pub sales_ledger_id: Option<ItemLedgerId>,
    pub created_at: DateTime<Utc>,
}

/// A persisted voucher line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredLine {
    pub voucher_id: VoucherId,
    pub item_id: Option<ItemLedgerId>,
    pub ledger_id: Option<ItemLedgerId>,
    pub quantity: i64,
    pub rate: i64,
    pub amount: i64,
    pub cgst_rate: i64,
    pub sgst_rate: i64,
    pub igst_rate: i64,
    pub cgst_ledger_id: i64,
    pub sgst_ledger_id: i64,
    pub igst_ledger_id: i64,
}

/// A voucher header together with its line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredVoucher {
    pub header: VoucherHeader,
    pub lines: Vec<StoredLine>,
}

/// List filter: either a month/year pair or an explicit date range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoucherFilter {
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl VoucherFilter {
    /// Collapse the filter into inclusive date bounds. A month/year pair
    /// wins over an explicit range; a bare year covers the calendar year.
    pub fn date_bounds(&self) -> (Option<NaiveDate>, Option<NaiveDate>) {
        match (self.month, self.year) {
            (Some(m), Some(y)) if (1..=12).contains(&m) => {
                let start = NaiveDate::from_ymd_opt(y, m, 1);
                let end = start.map(|s| {
                    let (ny, nm) = if m == 12 { (y + 1, 1) } else { (y, m + 1) };
                    NaiveDate::from_ymd_opt(ny, nm, 1)
                        .unwrap_or(s)
                        .pred_opt()
                        .unwrap_or(s)
                });
                (start, end)
            }
            (None, Some(y)) => (
                NaiveDate::from_ymd_opt(y, 1, 1),
                NaiveDate::from_ymd_opt(y, 12, 31),
            ),
            _ => (self.from, self.to),
        }
    }

    pub fn matches(&self, date: NaiveDate) -> bool {
        let (from, to) = self.date_bounds();
        from.is_none_or(|f| date >= f) && to.is_none_or(|t| date <= t)
    }
}

/// One ledger-posting mirror row (`voucher_entries`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntryRow {
    pub voucher_type: VoucherType,
    pub voucher_number: String,
    pub ledger_id: i64,
    pub amount: i64,
}

/// One movement-history row (`sale_history`), keyed by voucher number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaleHistoryRow {
    pub voucher_number: String,
    pub item_id: ItemLedgerId,
    pub quantity: i64,
    pub rate: i64,
    pub amount: i64,
    pub date: NaiveDate,
}

/// Ledger postings mirrored for a voucher: the party ledger for the grand
/// total, each line's key ledger for its amount, and each nonzero per-line
/// tax ledger for that line's tax portion.
pub fn derive_ledger_entries(
    voucher_type: VoucherType,
    number: &str,
    voucher: &PostableVoucher,
) -> Vec<LedgerEntryRow> {
    let mut rows = vec![LedgerEntryRow {
        voucher_type,
        voucher_number: number.to_string(),
        ledger_id: voucher.party_id.as_i64(),
        amount: voucher.total,
    }];

    for line in &voucher.entries {
        if let Some(ledger) = line.ledger_id.or(line.item_id) {
            rows.push(LedgerEntryRow {
                voucher_type,
                voucher_number: number.to_string(),
                ledger_id: ledger.as_i64(),
                amount: line.amount,
            });
        }
        for (ledger_id, rate) in [
            (line.cgst_ledger_id, line.cgst_rate),
            (line.sgst_ledger_id, line.sgst_rate),
            (line.igst_ledger_id, line.igst_rate),
        ] {
            if ledger_id != 0 {
                rows.push(LedgerEntryRow {
                    voucher_type,
                    voucher_number: number.to_string(),
                    ledger_id,
                    amount: line.amount * rate / 100,
                });
            }
        }
    }

    rows
}

/// Movement-history rows for vouchers of a sales kind: one per line that
/// references an item.
pub fn derive_sale_history(number: &str, voucher: &PostableVoucher) -> Vec<SaleHistoryRow> {
    voucher
        .entries
        .iter()
        .filter_map(|line| {
            line.item_id.map(|item_id| SaleHistoryRow {
                voucher_number: number.to_string(),
                item_id,
                quantity: line.quantity,
                rate: line.rate,
                amount: line.amount,
                date: voucher.date,
            })
        })
        .collect()
}

/// Tenant-scoped voucher persistence.
///
/// Every method is filtered by the tenant triple; implementations must make
/// it impossible to read or touch another tenant's rows. Create and update
/// are all-or-nothing: a failure part-way leaves nothing new visible.
#[async_trait]
pub trait VoucherStore: Send + Sync {
    /// Registration state of the posting company, if on file.
    async fn company_state(&self, scope: &TenantScope) -> StoreResult<Option<String>>;

    /// Registration state of a ledger (party account), if on file.
    async fn ledger_state(
        &self,
        scope: &TenantScope,
        ledger: PartyLedgerId,
    ) -> StoreResult<Option<String>>;

    /// Persist a classified voucher: allocate the number, insert the header
    /// and its lines plus derived rows, atomically.
    async fn create(
        &self,
        scope: &TenantScope,
        voucher_type: VoucherType,
        voucher: PostableVoucher,
    ) -> StoreResult<CreatedVoucher>;

    async fn get(
        &self,
        scope: &TenantScope,
        voucher_type: VoucherType,
        id: VoucherId,
    ) -> StoreResult<Option<StoredVoucher>>;

    async fn list(
        &self,
        scope: &TenantScope,
        voucher_type: VoucherType,
        filter: VoucherFilter,
    ) -> StoreResult<Vec<VoucherHeader>>;

    /// Full replace: header fields updated (number preserved), line items
    /// and derived rows deleted and re-inserted, in one transaction.
    async fn update(
        &self,
        scope: &TenantScope,
        voucher_type: VoucherType,
        id: VoucherId,
        voucher: PostableVoucher,
    ) -> StoreResult<()>;

    /// Cascading delete: lines, ledger-entry mirror rows and history rows
    /// are removed before the header. `NotFound` if the header is absent;
    /// in that case nothing is written.
    async fn delete(
        &self,
        scope: &TenantScope,
        voucher_type: VoucherType,
        id: VoucherId,
    ) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn month_year_filter_covers_whole_month() {
        let f = VoucherFilter {
            month: Some(2),
            year: Some(2024),
            ..Default::default()
        };
        assert!(f.matches(d(2024, 2, 1)));
        assert!(f.matches(d(2024, 2, 29)));
        assert!(!f.matches(d(2024, 3, 1)));
        assert!(!f.matches(d(2024, 1, 31)));
    }

    #[test]
    fn december_rolls_into_next_year() {
        let f = VoucherFilter {
            month: Some(12),
            year: Some(2025),
            ..Default::default()
        };
        assert!(f.matches(d(2025, 12, 31)));
        assert!(!f.matches(d(2026, 1, 1)));
    }

    #[test]
    fn range_filter_is_inclusive() {
        let f = VoucherFilter {
            from: Some(d(2025, 4, 1)),
            to: Some(d(2025, 4, 30)),
            ..Default::default()
        };
        assert!(f.matches(d(2025, 4, 1)));
        assert!(f.matches(d(2025, 4, 30)));
        assert!(!f.matches(d(2025, 5, 1)));
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(VoucherFilter::default().matches(d(1990, 1, 1)));
    }
}
