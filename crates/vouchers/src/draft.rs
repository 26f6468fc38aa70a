use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use kosh_core::{DomainError, DomainResult, ItemLedgerId, PartyLedgerId};
use kosh_gst::{GstKind, TaxTotals};

use crate::voucher::VoucherType;

/// The only entry mode accepted for item vouchers.
pub const ITEM_INVOICE_MODE: &str = "item-invoice";

/// One voucher line as supplied by the caller.
///
/// `amount` is trusted input, not derived from `quantity * rate` here.
/// Tax ledger ids use 0 for "absent", matching the nullable columns of the
/// backing schema; the inapplicable side is forced to 0 during
/// classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherLine {
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

impl VoucherLine {
    /// A line is usable only if it carries at least one key reference.
    pub fn has_reference(&self) -> bool {
        self.item_id.is_some() || self.ledger_id.is_some()
    }

    fn constrain(&mut self, kind: GstKind) {
        match kind {
            GstKind::Intra => {
                self.igst_rate = 0;
                self.igst_ledger_id = 0;
            }
            GstKind::Inter => {
                self.cgst_rate = 0;
                self.sgst_rate = 0;
                self.cgst_ledger_id = 0;
                self.sgst_ledger_id = 0;
            }
        }
    }
}

/// Dispatch metadata carried by sales vouchers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchDetails {
    pub doc_no: Option<String>,
    pub through: Option<String>,
    pub destination: Option<String>,
    pub approx_distance: Option<i64>,
}

/// A voucher payload as received from the caller, before validation and
/// classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherDraft {
    pub date: NaiveDate,
    pub party_id: PartyLedgerId,
    pub mode: String,
    pub entries: Vec<VoucherLine>,
    pub subtotal: i64,
    pub taxes: TaxTotals,
    pub discount_total: i64,
    pub tds_total: i64,
    /// Caller-supplied grand total; reconciled from the other fields when absent.
    pub total: Option<i64>,
    pub narration: Option<String>,
    pub reference_no: Option<String>,
    pub dispatch: Option<DispatchDetails>,
    pub is_quotation: bool,
    pub sales_ledger_id: Option<ItemLedgerId>,
}

impl VoucherDraft {
    /// Validate the draft for `voucher_type`, dropping lines that carry no
    /// usable key reference.
    ///
    /// Rejections here happen before any storage work: wrong entry mode, or
    /// no surviving line after the filter.
    pub fn validated(mut self, voucher_type: VoucherType) -> DomainResult<Self> {
        if voucher_type.is_item_voucher() && self.mode != ITEM_INVOICE_MODE {
            return Err(DomainError::validation(format!(
                "mode must be \"{ITEM_INVOICE_MODE}\", got \"{}\"",
                self.mode
            )));
        }

        self.entries.retain(VoucherLine::has_reference);
        if self.entries.is_empty() {
            return Err(DomainError::validation(
                "at least one entry with an itemId or ledgerId is required",
            ));
        }

        Ok(self)
    }

    /// Apply a GST classification: force the inapplicable tax side to zero on
    /// the header and on every line, then reconcile the grand total.
    ///
    /// The caller-supplied `total` is trusted when present; otherwise it is
    /// derived as `subtotal + applicable GST - discount - tds`.
    pub fn classified(mut self, kind: GstKind) -> PostableVoucher {
        let taxes = self.taxes.constrained(kind);
        for line in &mut self.entries {
            line.constrain(kind);
        }

        let total = self
            .total
            .unwrap_or(self.subtotal + taxes.applicable_total() - self.discount_total - self.tds_total);

        PostableVoucher {
            kind,
            date: self.date,
            party_id: self.party_id,
            entries: self.entries,
            subtotal: self.subtotal,
            taxes,
            discount_total: self.discount_total,
            tds_total: self.tds_total,
            total,
            narration: self.narration,
            reference_no: self.reference_no,
            dispatch: self.dispatch,
            is_quotation: self.is_quotation,
            sales_ledger_id: self.sales_ledger_id,
        }
    }
}

/// A validated, classified voucher ready for the store.
///
/// Invariant: `kind == Intra ⇒ taxes.igst == 0`;
/// `kind == Inter ⇒ taxes.cgst == 0 ∧ taxes.sgst == 0`; every line mirrors
/// the same split in its rate and ledger-id fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostableVoucher {
    pub kind: GstKind,
    pub date: NaiveDate,
    pub party_id: PartyLedgerId,
    pub entries: Vec<VoucherLine>,
    pub subtotal: i64,
    pub taxes: TaxTotals,
    pub discount_total: i64,
    pub tds_total: i64,
    pub total: i64,
    pub narration: Option<String>,
    pub reference_no: Option<String>,
    pub dispatch: Option<DispatchDetails>,
    pub is_quotation: bool,
    pub sales_ledger_id: Option<ItemLedgerId>,
}
