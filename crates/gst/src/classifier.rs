use serde::{Deserialize, Serialize};

/// GST applicability for one voucher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GstKind {
    /// Both parties registered in the same state: CGST + SGST apply.
    Intra,
    /// Different states, or either state unknown: IGST applies.
    Inter,
}

impl GstKind {
    pub fn is_intra(&self) -> bool {
        matches!(self, GstKind::Intra)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GstKind::Intra => "intra",
            GstKind::Inter => "inter",
        }
    }
}

impl core::fmt::Display for GstKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalize a raw state string for comparison.
///
/// State columns frequently carry a parenthesized state-code suffix
/// (`"Maharashtra (27)"`); that suffix is stripped, then the remainder is
/// trimmed and lower-cased. An empty result means the state is unknown.
pub fn normalize_state(raw: &str) -> String {
    let head = match raw.find('(') {
        Some(idx) => &raw[..idx],
        None => raw,
    };
    head.trim().to_lowercase()
}

/// Decide GST applicability from two raw state strings.
///
/// `Intra` only when both states are non-empty after normalization and equal.
/// A missing state on either side deliberately fails open to `Inter` (IGST);
/// this is never an error.
pub fn classify(company_state: &str, counterparty_state: &str) -> GstKind {
    let company = normalize_state(company_state);
    let party = normalize_state(counterparty_state);

    if !company.is_empty() && !party.is_empty() && company == party {
        GstKind::Intra
    } else {
        GstKind::Inter
    }
}

/// Header-level GST totals, in minor units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxTotals {
    pub cgst: i64,
    pub sgst: i64,
    pub igst: i64,
}

impl TaxTotals {
    pub fn new(cgst: i64, sgst: i64, igst: i64) -> Self {
        Self { cgst, sgst, igst }
    }

    /// Zero the side that does not apply under `kind`.
    ///
    /// Invariant afterwards: `Intra ⇒ igst == 0`, `Inter ⇒ cgst == 0 ∧ sgst == 0`.
    pub fn constrained(self, kind: GstKind) -> Self {
        match kind {
            GstKind::Intra => Self { igst: 0, ..self },
            GstKind::Inter => Self {
                cgst: 0,
                sgst: 0,
                ..self
            },
        }
    }

    /// Sum of whichever taxes remain applicable.
    pub fn applicable_total(&self) -> i64 {
        self.cgst + self.sgst + self.igst
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn same_state_is_intra() {
        assert_eq!(classify("Delhi", "Delhi"), GstKind::Intra);
    }

    #[test]
    fn different_states_are_inter() {
        assert_eq!(classify("Gujarat", "Kerala"), GstKind::Inter);
    }

    #[test]
    fn parenthesized_code_suffix_is_stripped() {
        assert_eq!(normalize_state("Maharashtra (27)"), "maharashtra");
        assert_eq!(classify("Maharashtra (27)", "maharashtra"), GstKind::Intra);
    }

    #[test]
    fn comparison_is_case_insensitive() {
        assert_eq!(classify("TAMIL NADU", "tamil nadu"), GstKind::Intra);
    }

    #[test]
    fn missing_state_fails_open_to_inter() {
        assert_eq!(classify("", "Delhi"), GstKind::Inter);
        assert_eq!(classify("Gujarat", ""), GstKind::Inter);
        assert_eq!(classify("", ""), GstKind::Inter);
        assert_eq!(classify("   ", "   "), GstKind::Inter);
        // A bare code suffix normalizes to empty and is treated as unknown.
        assert_eq!(classify("(27)", "(27)"), GstKind::Inter);
    }

    #[test]
    fn constrained_zeroes_the_inapplicable_side() {
        let t = TaxTotals::new(90, 90, 180);
        let intra = t.constrained(GstKind::Intra);
        assert_eq!((intra.cgst, intra.sgst, intra.igst), (90, 90, 0));
        let inter = t.constrained(GstKind::Inter);
        assert_eq!((inter.cgst, inter.sgst, inter.igst), (0, 0, 180));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: for any pair of state strings and any raw totals, the
        /// constrained totals satisfy exactly one of `igst == 0` or
        /// `cgst == 0 && sgst == 0` in the non-degenerate case, and the
        /// applicable branch is dictated solely by the classification.
        #[test]
        fn exactly_one_branch_survives(
            company in "[A-Za-z( )0-9]{0,24}",
            party in "[A-Za-z( )0-9]{0,24}",
            cgst in 1i64..1_000_000,
            sgst in 1i64..1_000_000,
            igst in 1i64..1_000_000,
        ) {
            let kind = classify(&company, &party);
            let t = TaxTotals::new(cgst, sgst, igst).constrained(kind);

            let intra_side_zero = t.cgst == 0 && t.sgst == 0;
            let inter_side_zero = t.igst == 0;
            prop_assert!(intra_side_zero ^ inter_side_zero);

            match kind {
                GstKind::Intra => prop_assert_eq!(t.igst, 0),
                GstKind::Inter => prop_assert_eq!((t.cgst, t.sgst), (0, 0)),
            }
        }

        /// Property: classification is symmetric in its inputs.
        #[test]
        fn classification_is_symmetric(
            a in "[A-Za-z( )0-9]{0,24}",
            b in "[A-Za-z( )0-9]{0,24}",
        ) {
            prop_assert_eq!(classify(&a, &b), classify(&b, &a));
        }
    }
}
