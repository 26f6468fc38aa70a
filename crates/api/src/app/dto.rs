//! Request DTOs and JSON response mapping.
//!
//! Requests accept both camelCase and snake_case keys. Numeric fields use
//! `#[serde(default)]` so a missing `cgstTotal` reaches the domain as 0,
//! never as an optional the handlers must coerce. Responses always go out
//! camelCase with a `success` flag.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};

use kosh_core::{ItemLedgerId, PartyLedgerId};
use kosh_gst::TaxTotals;
use kosh_store::{CreatedVoucher, StoredLine, StoredVoucher, VoucherHeader};
use kosh_vouchers::{DispatchDetails, VoucherDraft, VoucherLine};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherRequest {
    // Tenant triple fallback for callers that scope in the body rather
    // than the query string.
    #[serde(default, alias = "company_id")]
    pub company_id: Option<i64>,
    #[serde(default, alias = "owner_type")]
    pub owner_type: Option<String>,
    #[serde(default, alias = "owner_id")]
    pub owner_id: Option<i64>,

    pub date: NaiveDate,
    #[serde(alias = "party_id")]
    pub party_id: i64,
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub entries: Vec<EntryRequest>,

    #[serde(default)]
    pub subtotal: i64,
    #[serde(default, alias = "cgst_total")]
    pub cgst_total: i64,
    #[serde(default, alias = "sgst_total")]
    pub sgst_total: i64,
    #[serde(default, alias = "igst_total")]
    pub igst_total: i64,
    #[serde(default, alias = "discount_total")]
    pub discount_total: i64,
    #[serde(default, alias = "tds_total")]
    pub tds_total: i64,
    #[serde(default)]
    pub total: Option<i64>,

    #[serde(default)]
    pub narration: Option<String>,
    #[serde(default, alias = "reference_no")]
    pub reference_no: Option<String>,

    // Sales extras; ignored by the purchase handlers.
    #[serde(default, alias = "is_quotation")]
    pub is_quotation: bool,
    #[serde(default, alias = "sales_ledger_id")]
    pub sales_ledger_id: Option<i64>,
    #[serde(default, alias = "dispatch_details")]
    pub dispatch_details: Option<DispatchRequest>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryRequest {
    #[serde(default, alias = "item_id")]
    pub item_id: Option<i64>,
    #[serde(default, alias = "ledger_id")]
    pub ledger_id: Option<i64>,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub rate: i64,
    #[serde(default)]
    pub amount: i64,
    #[serde(default, alias = "cgst_rate")]
    pub cgst_rate: i64,
    #[serde(default, alias = "sgst_rate")]
    pub sgst_rate: i64,
    #[serde(default, alias = "igst_rate")]
    pub igst_rate: i64,
    #[serde(default, alias = "cgst_ledger_id")]
    pub cgst_ledger_id: i64,
    #[serde(default, alias = "sgst_ledger_id")]
    pub sgst_ledger_id: i64,
    #[serde(default, alias = "igst_ledger_id")]
    pub igst_ledger_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    #[serde(default, alias = "doc_no")]
    pub doc_no: Option<String>,
    #[serde(default)]
    pub through: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default, alias = "approx_distance")]
    pub approx_distance: Option<i64>,
}

impl VoucherRequest {
    /// Convert into the domain draft. Sales-only fields pass through; the
    /// purchase handlers strip them before calling this.
    pub fn into_draft(self) -> VoucherDraft {
        VoucherDraft {
            date: self.date,
            party_id: PartyLedgerId::new(self.party_id),
            mode: self.mode,
            entries: self.entries.into_iter().map(EntryRequest::into_line).collect(),
            subtotal: self.subtotal,
            taxes: TaxTotals::new(self.cgst_total, self.sgst_total, self.igst_total),
            discount_total: self.discount_total,
            tds_total: self.tds_total,
            total: self.total,
            narration: self.narration,
            reference_no: self.reference_no,
            dispatch: self.dispatch_details.map(DispatchRequest::into_details),
            is_quotation: self.is_quotation,
            sales_ledger_id: self.sales_ledger_id.map(ItemLedgerId::new),
        }
    }

    /// Drop the fields that only sales vouchers carry.
    pub fn without_sales_extras(mut self) -> Self {
        self.is_quotation = false;
        self.sales_ledger_id = None;
        self.dispatch_details = None;
        self
    }
}

impl EntryRequest {
    fn into_line(self) -> VoucherLine {
        VoucherLine {
            item_id: self.item_id.map(ItemLedgerId::new),
            ledger_id: self.ledger_id.map(ItemLedgerId::new),
            quantity: self.quantity,
            rate: self.rate,
            amount: self.amount,
            cgst_rate: self.cgst_rate,
            sgst_rate: self.sgst_rate,
            igst_rate: self.igst_rate,
            cgst_ledger_id: self.cgst_ledger_id,
            sgst_ledger_id: self.sgst_ledger_id,
            igst_ledger_id: self.igst_ledger_id,
        }
    }
}

impl DispatchRequest {
    fn into_details(self) -> DispatchDetails {
        DispatchDetails {
            doc_no: self.doc_no,
            through: self.through,
            destination: self.destination,
            approx_distance: self.approx_distance,
        }
    }
}

// ---------------------------------------------------------------------------
// Response builders

pub fn created_json(created: &CreatedVoucher) -> Value {
    json!({
        "success": true,
        "voucherId": created.id.as_i64(),
        "voucherNumber": created.number,
        "gstType": created.kind.as_str(),
    })
}

pub fn header_json(header: &VoucherHeader) -> Value {
    json!({
        "id": header.id.as_i64(),
        "voucherType": header.voucher_type.tag(),
        "voucherNumber": header.number,
        "sequence": header.sequence,
        "fiscalYear": header.fiscal_year.to_string(),
        "gstType": header.kind.as_str(),
        "date": header.date,
        "partyId": header.party_id.as_i64(),
        "subtotal": header.subtotal,
        "cgstTotal": header.cgst_total,
        "sgstTotal": header.sgst_total,
        "igstTotal": header.igst_total,
        "discountTotal": header.discount_total,
        "tdsTotal": header.tds_total,
        "total": header.total,
        "narration": header.narration,
        "referenceNo": header.reference_no,
        "isQuotation": header.is_quotation,
        "salesLedgerId": header.sales_ledger_id.map(|l| l.as_i64()),
        "dispatchDetails": header.dispatch.as_ref().map(dispatch_json),
        "createdAt": header.created_at,
    })
}

pub fn voucher_json(voucher: &StoredVoucher) -> Value {
    let mut body = header_json(&voucher.header);
    body["entries"] = Value::Array(voucher.lines.iter().map(line_json).collect());
    body
}

fn line_json(line: &StoredLine) -> Value {
    json!({
        "itemId": line.item_id.map(|i| i.as_i64()),
        "ledgerId": line.ledger_id.map(|l| l.as_i64()),
        "quantity": line.quantity,
        "rate": line.rate,
        "amount": line.amount,
        "cgstRate": line.cgst_rate,
        "sgstRate": line.sgst_rate,
        "igstRate": line.igst_rate,
        "cgstLedgerId": line.cgst_ledger_id,
        "sgstLedgerId": line.sgst_ledger_id,
        "igstLedgerId": line.igst_ledger_id,
    })
}

fn dispatch_json(d: &DispatchDetails) -> Value {
    json!({
        "docNo": d.doc_no,
        "through": d.through,
        "destination": d.destination,
        "approxDistance": d.approx_distance,
    })
}
