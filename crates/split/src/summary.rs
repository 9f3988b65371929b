use rust_decimal::Decimal;
use serde::Serialize;
use tabsplit_core::{percent_of, round_money, Item};

use crate::policy::TipBase;

/// Per-person amounts, recomputed from the current items on every call.
///
/// This is the input contract of the summary renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonSummary {
    pub name: String,
    pub tax_rate: Decimal,
    pub tip_rate: Decimal,
    pub items: Vec<Item>,
    pub subtotal: Decimal,
    pub tax_amt: Decimal,
    pub tip_amt: Decimal,
    pub total: Decimal,
}

/// Compute a summary. Tax and tip keep full precision until the end;
/// `tax_amt`, `tip_amt` and `total` are each rounded half-up independently.
pub fn summarize_items(
    name: &str,
    tax_rate: Decimal,
    tip_rate: Decimal,
    items: Vec<Item>,
    tip_base: TipBase,
) -> PersonSummary {
    let subtotal: Decimal = items.iter().map(|i| i.price).sum();
    let tax = percent_of(subtotal, tax_rate);
    let tip = match tip_base {
        TipBase::TaxInclusive => percent_of(subtotal + tax, tip_rate),
        TipBase::PreTax => percent_of(subtotal, tip_rate),
    };

    PersonSummary {
        name: name.to_string(),
        tax_rate,
        tip_rate,
        items,
        subtotal: round_money(subtotal),
        tax_amt: round_money(tax),
        tip_amt: round_money(tip),
        total: round_money(subtotal + tax + tip),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportMeta {
    pub engine_version: String,
    pub generated_at: String,
    pub tip_base: TipBase,
    pub pool_generation: u64,
}

/// Whole-bill view: every person, what is still unclaimed, and grand totals.
#[derive(Debug, Clone, Serialize)]
pub struct BillReport {
    pub meta: ReportMeta,
    pub people: Vec<PersonSummary>,
    pub unassigned: Vec<Item>,
    /// Sum of every item price in the pool.
    pub items_total: Decimal,
    pub grand_subtotal: Decimal,
    pub grand_tax: Decimal,
    pub grand_tip: Decimal,
    pub grand_total: Decimal,
    /// Grand tip as a percentage of the grand subtotal.
    pub effective_tip_percent: Decimal,
}

impl BillReport {
    pub(crate) fn build(
        people: Vec<PersonSummary>,
        unassigned: Vec<Item>,
        items_total: Decimal,
        tip_base: TipBase,
        pool_generation: u64,
    ) -> Self {
        let grand_subtotal: Decimal = people.iter().map(|p| p.subtotal).sum();
        let grand_tax: Decimal = people.iter().map(|p| p.tax_amt).sum();
        let grand_tip: Decimal = people.iter().map(|p| p.tip_amt).sum();
        let grand_total: Decimal = people.iter().map(|p| p.total).sum();
        let effective_tip_percent = if grand_subtotal.is_zero() {
            Decimal::ZERO
        } else {
            grand_tip / grand_subtotal * Decimal::ONE_HUNDRED
        };

        Self {
            meta: ReportMeta {
                engine_version: env!("CARGO_PKG_VERSION").to_string(),
                generated_at: chrono::Utc::now().to_rfc3339(),
                tip_base,
                pool_generation,
            },
            people,
            unassigned,
            items_total: round_money(items_total),
            grand_subtotal: round_money(grand_subtotal),
            grand_tax: round_money(grand_tax),
            grand_tip: round_money(grand_tip),
            grand_total: round_money(grand_total),
            effective_tip_percent: round_money(effective_tip_percent),
        }
    }

    /// Every item claimed and at least one person present.
    pub fn is_complete(&self) -> bool {
        self.unassigned.is_empty() && !self.people.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn items(prices: &[&str]) -> Vec<Item> {
        prices
            .iter()
            .enumerate()
            .map(|(i, p)| Item::new(format!("item {i}"), d(p)).unwrap())
            .collect()
    }

    #[test]
    fn tip_on_tax_inclusive_subtotal() {
        let s = summarize_items("Ana", d("8"), d("15"), items(&["10.00", "5.00"]), TipBase::TaxInclusive);
        assert_eq!(s.subtotal.to_string(), "15.00");
        assert_eq!(s.tax_amt.to_string(), "1.20");
        assert_eq!(s.tip_amt.to_string(), "2.43");
        assert_eq!(s.total.to_string(), "18.63");
    }

    #[test]
    fn tip_on_pre_tax_subtotal() {
        let s = summarize_items("Ana", d("8"), d("15"), items(&["10.00", "5.00"]), TipBase::PreTax);
        assert_eq!(s.tip_amt.to_string(), "2.25");
        assert_eq!(s.total.to_string(), "18.45");
    }

    #[test]
    fn total_rounds_from_unrounded_parts() {
        // tax = 0.8883875, tip = (10.01 + 0.8883875) * 0.18 = 1.96170975
        let s = summarize_items("Bo", d("8.875"), d("18"), items(&["10.01"]), TipBase::TaxInclusive);
        assert_eq!(s.tax_amt.to_string(), "0.89");
        assert_eq!(s.tip_amt.to_string(), "1.96");
        // 10.01 + 0.8883875 + 1.96170975 = 12.86009725
        assert_eq!(s.total.to_string(), "12.86");
    }

    #[test]
    fn zero_rates() {
        let s = summarize_items("Cy", d("0"), d("0"), items(&["3.33"]), TipBase::TaxInclusive);
        assert_eq!(s.tax_amt.to_string(), "0.00");
        assert_eq!(s.tip_amt.to_string(), "0.00");
        assert_eq!(s.total.to_string(), "3.33");
    }

    #[test]
    fn report_grand_totals() {
        let a = summarize_items("Ana", d("8"), d("15"), items(&["10.00", "5.00"]), TipBase::TaxInclusive);
        let b = summarize_items("Bo", d("8"), d("20"), items(&["5.00"]), TipBase::TaxInclusive);
        let report = BillReport::build(vec![a, b], Vec::new(), d("20.00"), TipBase::TaxInclusive, 1);
        assert_eq!(report.grand_subtotal, d("20.00"));
        assert_eq!(report.grand_tax, d("1.60"));
        // b tip = 5.40 * 0.20 = 1.08
        assert_eq!(report.grand_tip, d("3.51"));
        assert_eq!(report.grand_total, d("25.11"));
        assert_eq!(report.effective_tip_percent, d("17.55"));
        assert!(report.is_complete());
    }

    #[test]
    fn empty_report_is_incomplete() {
        let report = BillReport::build(Vec::new(), Vec::new(), Decimal::ZERO, TipBase::TaxInclusive, 0);
        assert_eq!(report.effective_tip_percent, Decimal::ZERO);
        assert!(!report.is_complete());
    }
}
