use core::str::FromStr;
use serde::{Deserialize, Serialize};

use kosh_core::DomainError;

/// Kind of voucher. Determines the number prefix and the backing table family.
///
/// All kinds share the same sequential numbering scheme (per tenant, per
/// kind, per fiscal year); only sales and purchase kinds are exposed over
/// HTTP, payment and receipt participate in numbering alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VoucherType {
    Sales,
    Purchase,
    Payment,
    Receipt,
    SalesOrder,
    PurchaseOrder,
}

impl VoucherType {
    /// Human-facing number prefix, e.g. `PRV-0001`.
    pub fn prefix(&self) -> &'static str {
        match self {
            VoucherType::Sales => "SAL",
            VoucherType::Purchase => "PRV",
            VoucherType::Payment => "PAY",
            VoucherType::Receipt => "RCV",
            VoucherType::SalesOrder => "SOR",
            VoucherType::PurchaseOrder => "POR",
        }
    }

    /// Stable tag used in storage and on the wire.
    pub fn tag(&self) -> &'static str {
        match self {
            VoucherType::Sales => "sales",
            VoucherType::Purchase => "purchase",
            VoucherType::Payment => "payment",
            VoucherType::Receipt => "receipt",
            VoucherType::SalesOrder => "sales-order",
            VoucherType::PurchaseOrder => "purchase-order",
        }
    }

    /// Whether this kind carries item lines (and therefore requires the
    /// `item-invoice` entry mode on create/update).
    pub fn is_item_voucher(&self) -> bool {
        matches!(
            self,
            VoucherType::Sales
                | VoucherType::Purchase
                | VoucherType::SalesOrder
                | VoucherType::PurchaseOrder
        )
    }

    /// Whether vouchers of this kind mirror stock movement into the
    /// sales history table.
    pub fn writes_sale_history(&self) -> bool {
        matches!(self, VoucherType::Sales | VoucherType::SalesOrder)
    }
}

impl core::fmt::Display for VoucherType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for VoucherType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sales" => Ok(VoucherType::Sales),
            "purchase" => Ok(VoucherType::Purchase),
            "payment" => Ok(VoucherType::Payment),
            "receipt" => Ok(VoucherType::Receipt),
            "sales-order" => Ok(VoucherType::SalesOrder),
            "purchase-order" => Ok(VoucherType::PurchaseOrder),
            other => Err(DomainError::validation(format!(
                "unknown voucher type: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [VoucherType; 6] = [
        VoucherType::Sales,
        VoucherType::Purchase,
        VoucherType::Payment,
        VoucherType::Receipt,
        VoucherType::SalesOrder,
        VoucherType::PurchaseOrder,
    ];

    #[test]
    fn tags_round_trip() {
        for vt in ALL {
            assert_eq!(vt.tag().parse::<VoucherType>().unwrap(), vt);
        }
    }

    #[test]
    fn prefixes_are_distinct() {
        for a in ALL {
            for b in ALL {
                if a != b {
                    assert_ne!(a.prefix(), b.prefix());
                }
            }
        }
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert!("journal".parse::<VoucherType>().is_err());
    }
}
