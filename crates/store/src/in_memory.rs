//! In-memory voucher store.
//!
//! Intended for tests/dev. Honors the same contract as the Postgres store:
//! tenant-scoped visibility, all-or-nothing postings, and number allocation
//! that can never hand out the same index twice (here trivially serialized
//! under the write lock).

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use kosh_core::{FiscalYear, PartyLedgerId, TenantScope, VoucherId};
use kosh_vouchers::{format_number, PostableVoucher, VoucherType};

use crate::error::{StoreError, StoreResult};
use crate::store::{
    derive_ledger_entries, derive_sale_history, CreatedVoucher, LedgerEntryRow, SaleHistoryRow,
    StoredLine, StoredVoucher, VoucherFilter, VoucherHeader, VoucherStore,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PartitionKey {
    scope: TenantScope,
    voucher_type: VoucherType,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    vouchers: HashMap<PartitionKey, Vec<StoredVoucher>>,
    ledger_entries: HashMap<TenantScope, Vec<LedgerEntryRow>>,
    sale_history: HashMap<TenantScope, Vec<SaleHistoryRow>>,
    company_states: HashMap<i64, String>,
    ledger_states: HashMap<(TenantScope, i64), String>,
}

/// In-memory implementation of [`VoucherStore`].
#[derive(Debug, Default)]
pub struct InMemoryVoucherStore {
    inner: RwLock<Inner>,
}

impl InMemoryVoucherStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the registration state of a company (tests/dev).
    pub fn set_company_state(&self, scope: &TenantScope, state: impl Into<String>) {
        let mut inner = self.inner.write().expect("lock poisoned");
        inner
            .company_states
            .insert(scope.company_id.as_i64(), state.into());
    }

    /// Seed the registration state of a party ledger (tests/dev).
    pub fn set_ledger_state(
        &self,
        scope: &TenantScope,
        ledger: PartyLedgerId,
        state: impl Into<String>,
    ) {
        let mut inner = self.inner.write().expect("lock poisoned");
        inner
            .ledger_states
            .insert((scope.clone(), ledger.as_i64()), state.into());
    }

    /// Count of ledger-entry mirror rows for a tenant (test inspection).
    pub fn ledger_entry_count(&self, scope: &TenantScope) -> usize {
        let inner = self.inner.read().expect("lock poisoned");
        inner.ledger_entries.get(scope).map_or(0, Vec::len)
    }

    /// Count of movement-history rows for a tenant (test inspection).
    pub fn sale_history_count(&self, scope: &TenantScope) -> usize {
        let inner = self.inner.read().expect("lock poisoned");
        inner.sale_history.get(scope).map_or(0, Vec::len)
    }

    fn next_sequence(
        partition: &[StoredVoucher],
        fiscal_year: FiscalYear,
    ) -> i64 {
        partition
            .iter()
            .filter(|v| v.header.fiscal_year == fiscal_year)
            .map(|v| v.header.sequence)
            .max()
            .unwrap_or(0)
            + 1
    }
}

#[async_trait]
impl VoucherStore for InMemoryVoucherStore {
    async fn company_state(&self, scope: &TenantScope) -> StoreResult<Option<String>> {
        let inner = self.inner.read().map_err(|_| StoreError::backend("lock poisoned"))?;
        Ok(inner.company_states.get(&scope.company_id.as_i64()).cloned())
    }

    async fn ledger_state(
        &self,
        scope: &TenantScope,
        ledger: PartyLedgerId,
    ) -> StoreResult<Option<String>> {
        let inner = self.inner.read().map_err(|_| StoreError::backend("lock poisoned"))?;
        Ok(inner
            .ledger_states
            .get(&(scope.clone(), ledger.as_i64()))
            .cloned())
    }

    async fn create(
        &self,
        scope: &TenantScope,
        voucher_type: VoucherType,
        voucher: PostableVoucher,
    ) -> StoreResult<CreatedVoucher> {
        // Everything derived before any mutation, so a failure cannot leave
        // a partial voucher behind.
        let fiscal_year = FiscalYear::containing(voucher.date);

        let mut inner = self.inner.write().map_err(|_| StoreError::backend("lock poisoned"))?;
        inner.next_id += 1;
        let id = VoucherId::new(inner.next_id);

        let key = PartitionKey {
            scope: scope.clone(),
            voucher_type,
        };
        let sequence = Self::next_sequence(
            inner.vouchers.get(&key).map_or(&[][..], Vec::as_slice),
            fiscal_year,
        );
        let number = format_number(voucher_type, sequence);

        let entries = derive_ledger_entries(voucher_type, &number, &voucher);
        let history = if voucher_type.writes_sale_history() {
            derive_sale_history(&number, &voucher)
        } else {
            Vec::new()
        };

        let lines = voucher
            .entries
            .iter()
            .map(|l| StoredLine {
                voucher_id: id,
                item_id: l.item_id,
                ledger_id: l.ledger_id,
                quantity: l.quantity,
                rate: l.rate,
                amount: l.amount,
                cgst_rate: l.cgst_rate,
                sgst_rate: l.sgst_rate,
                igst_rate: l.igst_rate,
                cgst_ledger_id: l.cgst_ledger_id,
                sgst_ledger_id: l.sgst_ledger_id,
                igst_ledger_id: l.igst_ledger_id,
            })
            .collect();

        let header = VoucherHeader {
            id,
            voucher_type,
            number: number.clone(),
            sequence,
            fiscal_year,
            kind: voucher.kind,
            date: voucher.date,
            party_id: voucher.party_id,
            subtotal: voucher.subtotal,
            cgst_total: voucher.taxes.cgst,
            sgst_total: voucher.taxes.sgst,
            igst_total: voucher.taxes.igst,
            discount_total: voucher.discount_total,
            tds_total: voucher.tds_total,
            total: voucher.total,
            narration: voucher.narration.clone(),
            reference_no: voucher.reference_no.clone(),
            dispatch: voucher.dispatch.clone(),
            is_quotation: voucher.is_quotation,
            sales_ledger_id: voucher.sales_ledger_id,
            created_at: Utc::now(),
        };

        inner
            .vouchers
            .entry(key)
            .or_default()
            .push(StoredVoucher { header, lines });
        inner
            .ledger_entries
            .entry(scope.clone())
            .or_default()
            .extend(entries);
        inner
            .sale_history
            .entry(scope.clone())
            .or_default()
            .extend(history);

        Ok(CreatedVoucher {
            id,
            number,
            sequence,
            fiscal_year,
            kind: voucher.kind,
        })
    }

    async fn get(
        &self,
        scope: &TenantScope,
        voucher_type: VoucherType,
        id: VoucherId,
    ) -> StoreResult<Option<StoredVoucher>> {
        let inner = self.inner.read().map_err(|_| StoreError::backend("lock poisoned"))?;
        let key = PartitionKey {
            scope: scope.clone(),
            voucher_type,
        };
        Ok(inner
            .vouchers
            .get(&key)
            .and_then(|vs| vs.iter().find(|v| v.header.id == id))
            .cloned())
    }

    async fn list(
        &self,
        scope: &TenantScope,
        voucher_type: VoucherType,
        filter: VoucherFilter,
    ) -> StoreResult<Vec<VoucherHeader>> {
        let inner = self.inner.read().map_err(|_| StoreError::backend("lock poisoned"))?;
        let key = PartitionKey {
            scope: scope.clone(),
            voucher_type,
        };
        let mut headers: Vec<VoucherHeader> = inner
            .vouchers
            .get(&key)
            .map_or(&[][..], Vec::as_slice)
            .iter()
            .filter(|v| filter.matches(v.header.date))
            .map(|v| v.header.clone())
            .collect();
        headers.sort_by(|a, b| (a.date, a.sequence).cmp(&(b.date, b.sequence)));
        Ok(headers)
    }

    async fn update(
        &self,
        scope: &TenantScope,
        voucher_type: VoucherType,
        id: VoucherId,
        voucher: PostableVoucher,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().map_err(|_| StoreError::backend("lock poisoned"))?;
        let key = PartitionKey {
            scope: scope.clone(),
            voucher_type,
        };

        let Some(existing) = inner
            .vouchers
            .get_mut(&key)
            .and_then(|vs| vs.iter_mut().find(|v| v.header.id == id))
        else {
            return Err(StoreError::NotFound);
        };

        // Number, sequence and fiscal partition are preserved on update.
        let number = existing.header.number.clone();
        existing.header.kind = voucher.kind;
        existing.header.date = voucher.date;
        existing.header.party_id = voucher.party_id;
        existing.header.subtotal = voucher.subtotal;
        existing.header.cgst_total = voucher.taxes.cgst;
        existing.header.sgst_total = voucher.taxes.sgst;
        existing.header.igst_total = voucher.taxes.igst;
        existing.header.discount_total = voucher.discount_total;
        existing.header.tds_total = voucher.tds_total;
        existing.header.total = voucher.total;
        existing.header.narration = voucher.narration.clone();
        existing.header.reference_no = voucher.reference_no.clone();
        existing.header.dispatch = voucher.dispatch.clone();
        existing.header.is_quotation = voucher.is_quotation;
        existing.header.sales_ledger_id = voucher.sales_ledger_id;

        existing.lines = voucher
            .entries
            .iter()
            .map(|l| StoredLine {
                voucher_id: id,
                item_id: l.item_id,
                ledger_id: l.ledger_id,
                quantity: l.quantity,
                rate: l.rate,
                amount: l.amount,
                cgst_rate: l.cgst_rate,
                sgst_rate: l.sgst_rate,
                igst_rate: l.igst_rate,
                cgst_ledger_id: l.cgst_ledger_id,
                sgst_ledger_id: l.sgst_ledger_id,
                igst_ledger_id: l.igst_ledger_id,
            })
            .collect();

        // Delete-then-reinsert for the derived rows, same as the SQL path.
        if let Some(entries) = inner.ledger_entries.get_mut(scope) {
            entries.retain(|e| !(e.voucher_type == voucher_type && e.voucher_number == number));
        }
        if let Some(history) = inner.sale_history.get_mut(scope) {
            history.retain(|h| h.voucher_number != number);
        }
        let entries = derive_ledger_entries(voucher_type, &number, &voucher);
        inner
            .ledger_entries
            .entry(scope.clone())
            .or_default()
            .extend(entries);
        if voucher_type.writes_sale_history() {
            let history = derive_sale_history(&number, &voucher);
            inner
                .sale_history
                .entry(scope.clone())
                .or_default()
                .extend(history);
        }

        Ok(())
    }

    async fn delete(
        &self,
        scope: &TenantScope,
        voucher_type: VoucherType,
        id: VoucherId,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().map_err(|_| StoreError::backend("lock poisoned"))?;
        let key = PartitionKey {
            scope: scope.clone(),
            voucher_type,
        };

        let Some(number) = inner
            .vouchers
            .get(&key)
            .and_then(|vs| vs.iter().find(|v| v.header.id == id))
            .map(|v| v.header.number.clone())
        else {
            return Err(StoreError::NotFound);
        };

        if let Some(entries) = inner.ledger_entries.get_mut(scope) {
            entries.retain(|e| !(e.voucher_type == voucher_type && e.voucher_number == number));
        }
        if let Some(history) = inner.sale_history.get_mut(scope) {
            history.retain(|h| h.voucher_number != number);
        }
        if let Some(vouchers) = inner.vouchers.get_mut(&key) {
            vouchers.retain(|v| v.header.id != id);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use kosh_core::{CompanyId, ItemLedgerId, OwnerId, OwnerType};
    use kosh_gst::{GstKind, TaxTotals};
    use kosh_vouchers::VoucherLine;

    fn scope() -> TenantScope {
        TenantScope::new(CompanyId::new(1), OwnerType::from("user"), OwnerId::new(7))
    }

    fn other_scope() -> TenantScope {
        TenantScope::new(CompanyId::new(2), OwnerType::from("user"), OwnerId::new(7))
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn line() -> VoucherLine {
        VoucherLine {
            item_id: Some(ItemLedgerId::new(1)),
            ledger_id: None,
            quantity: 2,
            rate: 100,
            amount: 200,
            cgst_rate: 9,
            sgst_rate: 9,
            igst_rate: 0,
            cgst_ledger_id: 5,
            sgst_ledger_id: 6,
            igst_ledger_id: 0,
        }
    }

    fn voucher(date: NaiveDate, kind: GstKind) -> PostableVoucher {
        PostableVoucher {
            kind,
            date,
            party_id: PartyLedgerId::new(11),
            entries: vec![line()],
            subtotal: 200,
            taxes: match kind {
                GstKind::Intra => TaxTotals::new(18, 18, 0),
                GstKind::Inter => TaxTotals::new(0, 0, 36),
            },
            discount_total: 0,
            tds_total: 0,
            total: 236,
            narration: None,
            reference_no: None,
            dispatch: None,
            is_quotation: false,
            sales_ledger_id: None,
        }
    }

    #[tokio::test]
    async fn numbers_are_sequential_within_a_partition() {
        let store = InMemoryVoucherStore::new();
        let s = scope();

        let mut numbers = Vec::new();
        for _ in 0..3 {
            let created = store
                .create(&s, VoucherType::Purchase, voucher(d(2025, 6, 1), GstKind::Intra))
                .await
                .unwrap();
            numbers.push((created.sequence, created.number));
        }

        assert_eq!(
            numbers,
            vec![
                (1, "PRV-0001".to_string()),
                (2, "PRV-0002".to_string()),
                (3, "PRV-0003".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn sequences_are_independent_per_type_and_tenant() {
        let store = InMemoryVoucherStore::new();

        let a = store
            .create(&scope(), VoucherType::Purchase, voucher(d(2025, 6, 1), GstKind::Intra))
            .await
            .unwrap();
        let b = store
            .create(&scope(), VoucherType::Sales, voucher(d(2025, 6, 1), GstKind::Intra))
            .await
            .unwrap();
        let c = store
            .create(&other_scope(), VoucherType::Purchase, voucher(d(2025, 6, 1), GstKind::Intra))
            .await
            .unwrap();

        assert_eq!(a.number, "PRV-0001");
        assert_eq!(b.number, "SAL-0001");
        assert_eq!(c.number, "PRV-0001");
    }

    #[tokio::test]
    async fn sequence_resets_across_the_april_boundary() {
        let store = InMemoryVoucherStore::new();
        let s = scope();

        let before = store
            .create(&s, VoucherType::Sales, voucher(d(2025, 3, 31), GstKind::Intra))
            .await
            .unwrap();
        let after = store
            .create(&s, VoucherType::Sales, voucher(d(2025, 4, 1), GstKind::Intra))
            .await
            .unwrap();

        assert_ne!(before.fiscal_year, after.fiscal_year);
        assert_eq!(before.sequence, 1);
        assert_eq!(after.sequence, 1);
    }

    #[tokio::test]
    async fn concurrent_creates_never_duplicate_numbers() {
        use std::collections::HashSet;
        use std::sync::Arc;

        let store = Arc::new(InMemoryVoucherStore::new());
        let s = scope();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            let s = s.clone();
            handles.push(tokio::spawn(async move {
                store
                    .create(&s, VoucherType::Receipt, voucher(d(2025, 7, 1), GstKind::Inter))
                    .await
                    .unwrap()
                    .number
            }));
        }

        let mut seen = HashSet::new();
        for h in handles {
            assert!(seen.insert(h.await.unwrap()));
        }
        assert_eq!(seen.len(), 16);
    }

    #[tokio::test]
    async fn round_trip_preserves_gst_split_and_ledger_ids() {
        let store = InMemoryVoucherStore::new();
        let s = scope();

        let created = store
            .create(&s, VoucherType::Sales, voucher(d(2025, 6, 10), GstKind::Intra))
            .await
            .unwrap();

        let stored = store
            .get(&s, VoucherType::Sales, created.id)
            .await
            .unwrap()
            .expect("voucher should be readable");

        assert!(stored.header.cgst_total > 0);
        assert!(stored.header.sgst_total > 0);
        assert_eq!(stored.header.igst_total, 0);
        let l = &stored.lines[0];
        assert_eq!(l.cgst_ledger_id, 5);
        assert_eq!(l.sgst_ledger_id, 6);
        assert_eq!(l.igst_ledger_id, 0);
    }

    #[tokio::test]
    async fn vouchers_are_invisible_across_tenants() {
        let store = InMemoryVoucherStore::new();

        let created = store
            .create(&scope(), VoucherType::Sales, voucher(d(2025, 6, 10), GstKind::Intra))
            .await
            .unwrap();

        assert!(store
            .get(&other_scope(), VoucherType::Sales, created.id)
            .await
            .unwrap()
            .is_none());
        assert!(store
            .list(&other_scope(), VoucherType::Sales, VoucherFilter::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn list_honors_date_filters() {
        let store = InMemoryVoucherStore::new();
        let s = scope();

        store
            .create(&s, VoucherType::Purchase, voucher(d(2025, 5, 1), GstKind::Intra))
            .await
            .unwrap();
        store
            .create(&s, VoucherType::Purchase, voucher(d(2025, 6, 1), GstKind::Intra))
            .await
            .unwrap();

        let filter = VoucherFilter {
            month: Some(5),
            year: Some(2025),
            ..Default::default()
        };
        let listed = store.list(&s, VoucherType::Purchase, filter).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].date, d(2025, 5, 1));
    }

    #[tokio::test]
    async fn update_replaces_lines_and_derived_rows() {
        let store = InMemoryVoucherStore::new();
        let s = scope();

        let created = store
            .create(&s, VoucherType::Sales, voucher(d(2025, 6, 10), GstKind::Intra))
            .await
            .unwrap();
        let entries_before = store.ledger_entry_count(&s);
        let history_before = store.sale_history_count(&s);
        assert!(entries_before > 0);
        assert!(history_before > 0);

        // Reclassify to inter-state with two lines.
        let mut replacement = voucher(d(2025, 6, 12), GstKind::Inter);
        let mut second = line();
        second.item_id = Some(ItemLedgerId::new(2));
        replacement.entries.push(second);
        for l in &mut replacement.entries {
            l.cgst_rate = 0;
            l.sgst_rate = 0;
            l.cgst_ledger_id = 0;
            l.sgst_ledger_id = 0;
            l.igst_rate = 18;
            l.igst_ledger_id = 9;
        }

        store
            .update(&s, VoucherType::Sales, created.id, replacement)
            .await
            .unwrap();

        let stored = store
            .get(&s, VoucherType::Sales, created.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.header.number, created.number);
        assert_eq!(stored.header.igst_total, 36);
        assert_eq!(stored.lines.len(), 2);
        assert!(stored.lines.iter().all(|l| l.cgst_ledger_id == 0));
        assert_eq!(store.sale_history_count(&s), 2);
    }

    #[tokio::test]
    async fn update_of_missing_voucher_is_not_found() {
        let store = InMemoryVoucherStore::new();
        let err = store
            .update(
                &scope(),
                VoucherType::Sales,
                VoucherId::new(99),
                voucher(d(2025, 6, 10), GstKind::Intra),
            )
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::NotFound);
    }

    #[tokio::test]
    async fn delete_removes_all_row_sets() {
        let store = InMemoryVoucherStore::new();
        let s = scope();

        let created = store
            .create(&s, VoucherType::Sales, voucher(d(2025, 6, 10), GstKind::Intra))
            .await
            .unwrap();
        assert!(store.ledger_entry_count(&s) > 0);
        assert!(store.sale_history_count(&s) > 0);

        store.delete(&s, VoucherType::Sales, created.id).await.unwrap();

        assert!(store
            .get(&s, VoucherType::Sales, created.id)
            .await
            .unwrap()
            .is_none());
        assert_eq!(store.ledger_entry_count(&s), 0);
        assert_eq!(store.sale_history_count(&s), 0);
    }

    #[tokio::test]
    async fn delete_of_missing_voucher_changes_nothing() {
        let store = InMemoryVoucherStore::new();
        let s = scope();

        let created = store
            .create(&s, VoucherType::Sales, voucher(d(2025, 6, 10), GstKind::Intra))
            .await
            .unwrap();
        let entries = store.ledger_entry_count(&s);

        let err = store
            .delete(&s, VoucherType::Sales, VoucherId::new(12345))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::NotFound);
        assert_eq!(store.ledger_entry_count(&s), entries);
        assert!(store
            .get(&s, VoucherType::Sales, created.id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn state_lookups_return_seeded_values() {
        let store = InMemoryVoucherStore::new();
        let s = scope();

        assert_eq!(store.company_state(&s).await.unwrap(), None);
        store.set_company_state(&s, "Delhi");
        store.set_ledger_state(&s, PartyLedgerId::new(11), "Maharashtra (27)");

        assert_eq!(store.company_state(&s).await.unwrap().as_deref(), Some("Delhi"));
        assert_eq!(
            store
                .ledger_state(&s, PartyLedgerId::new(11))
                .await
                .unwrap()
                .as_deref(),
            Some("Maharashtra (27)")
        );
        assert_eq!(store.ledger_state(&s, PartyLedgerId::new(99)).await.unwrap(), None);
    }
}
