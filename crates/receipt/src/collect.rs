use rust_decimal::Decimal;
use serde::Serialize;
use tabsplit_core::{round_money, Item};

use crate::options::{DiscountPlacement, ParseOptions, DISCOUNT_NOTE};

/// Why a line produced no item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Matched no line strategy.
    Unmatched,
    /// Column header (`Item Qty Price`).
    Header,
    /// Subtotal / total / tax / tip / payment line.
    NonItemKeyword,
    /// Discount with no item to fold into.
    OrphanDiscount,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unmatched => write!(f, "unmatched"),
            Self::Header => write!(f, "header"),
            Self::NonItemKeyword => write!(f, "non_item_keyword"),
            Self::OrphanDiscount => write!(f, "orphan_discount"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedLine {
    /// 1-based line (or table row) number.
    pub line: usize,
    pub text: String,
    pub reason: SkipReason,
}

/// Parse output: the items plus every line that was dropped.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParseReport {
    pub items: Vec<Item>,
    pub skipped: Vec<SkippedLine>,
}

impl ParseReport {
    pub fn skipped_for(&self, reason: SkipReason) -> impl Iterator<Item = &SkippedLine> {
        self.skipped.iter().filter(move |s| s.reason == reason)
    }
}

/// One numbered source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Line {
    pub number: usize,
    pub text: String,
}

/// Split raw text into trimmed, non-empty, numbered lines.
pub(crate) fn split_lines(raw: &str) -> Vec<Line> {
    raw.lines()
        .enumerate()
        .map(|(i, l)| Line {
            number: i + 1,
            text: l.trim().to_string(),
        })
        .filter(|l| !l.text.is_empty())
        .collect()
}

struct PendingDiscount {
    line: usize,
    text: String,
    amount: Decimal,
}

/// Shared sink for every strategy: applies skip filtering and discount folding
/// to each `(description, price)` candidate in order.
pub(crate) struct Collector<'a> {
    opts: &'a ParseOptions,
    items: Vec<Item>,
    skipped: Vec<SkippedLine>,
    pending: Option<PendingDiscount>,
}

impl<'a> Collector<'a> {
    pub fn new(opts: &'a ParseOptions) -> Self {
        Self {
            opts,
            items: Vec::new(),
            skipped: Vec::new(),
            pending: None,
        }
    }

    pub fn skip(&mut self, line: &Line, reason: SkipReason) {
        log::debug!("line {}: skipped ({reason}): {}", line.number, line.text);
        self.skipped.push(SkippedLine {
            line: line.number,
            text: line.text.clone(),
            reason,
        });
    }

    /// Offer a candidate item. `line` is the source used for reporting.
    pub fn offer(&mut self, line: &Line, description: &str, price: Decimal) {
        if self.opts.is_skip_line(description) {
            self.skip(line, SkipReason::NonItemKeyword);
            return;
        }
        if price.is_sign_negative() || self.opts.is_discount_line(description) {
            self.fold(line, price.abs());
            return;
        }
        match Item::new(description, price) {
            Ok(mut item) => {
                if let Some(pending) = self.pending.take() {
                    apply_discount(&mut item, pending.amount);
                }
                log::debug!("line {}: item '{}' {}", line.number, item.description, item.price);
                self.items.push(item);
            }
            Err(_) => self.skip(line, SkipReason::Unmatched),
        }
    }

    fn fold(&mut self, line: &Line, amount: Decimal) {
        match self.opts.discount_placement {
            DiscountPlacement::FollowsItem => match self.items.last_mut() {
                Some(target) => {
                    log::debug!(
                        "line {}: discount {} folded into '{}'",
                        line.number,
                        amount,
                        target.description
                    );
                    apply_discount(target, amount);
                }
                None => self.skip(line, SkipReason::OrphanDiscount),
            },
            DiscountPlacement::PrecedesItem => {
                let total = self.pending.as_ref().map_or(Decimal::ZERO, |p| p.amount) + amount;
                self.pending = Some(PendingDiscount {
                    line: line.number,
                    text: line.text.clone(),
                    amount: total,
                });
            }
        }
    }

    pub fn finish(mut self) -> ParseReport {
        if let Some(pending) = self.pending.take() {
            let line = Line {
                number: pending.line,
                text: pending.text,
            };
            self.skip(&line, SkipReason::OrphanDiscount);
        }
        self.skipped.sort_by_key(|s| s.line);
        ParseReport {
            items: self.items,
            skipped: self.skipped,
        }
    }
}

fn apply_discount(item: &mut Item, amount: Decimal) {
    if amount.is_zero() {
        return;
    }
    item.price = round_money(item.price - amount);
    item.discount = round_money(item.discount + amount);
    if !item.description.ends_with(DISCOUNT_NOTE) {
        item.description.push_str(DISCOUNT_NOTE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn line(n: usize, text: &str) -> Line {
        Line { number: n, text: text.into() }
    }

    #[test]
    fn split_lines_numbers_source_lines() {
        let lines = split_lines("  Burger 12.00 \n\n   \nFries 4.50");
        assert_eq!(lines, vec![line(1, "Burger 12.00"), line(4, "Fries 4.50")]);
    }

    #[test]
    fn two_discounts_annotate_once() {
        let opts = ParseOptions::default();
        let mut c = Collector::new(&opts);
        c.offer(&line(1, "Burger 12.00"), "Burger", d("12.00"));
        c.offer(&line(2, "Discount -2.00"), "Discount", d("-2.00"));
        c.offer(&line(3, "Coupon 1.00"), "Coupon", d("1.00"));
        let report = c.finish();
        assert_eq!(report.items.len(), 1);
        let burger = &report.items[0];
        assert_eq!(burger.price, d("9.00"));
        assert_eq!(burger.discount, d("3.00"));
        assert_eq!(burger.original_price(), d("12.00"));
        assert_eq!(burger.description, "Burger (discount applied)");
    }

    #[test]
    fn preceding_discount_waits_for_next_item() {
        let opts = ParseOptions::default().with_discount_placement(DiscountPlacement::PrecedesItem);
        let mut c = Collector::new(&opts);
        c.offer(&line(1, "Burger 12.00"), "Burger", d("12.00"));
        c.offer(&line(2, "Happy Hour -1.50"), "Happy Hour", d("-1.50"));
        c.offer(&line(3, "Beer 6.00"), "Beer", d("6.00"));
        let report = c.finish();
        assert_eq!(report.items[0].price, d("12.00"));
        assert_eq!(report.items[1].price, d("4.50"));
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn trailing_preceding_discount_is_orphaned() {
        let opts = ParseOptions::default().with_discount_placement(DiscountPlacement::PrecedesItem);
        let mut c = Collector::new(&opts);
        c.offer(&line(1, "Burger 12.00"), "Burger", d("12.00"));
        c.offer(&line(2, "Discount -2.00"), "Discount", d("-2.00"));
        let report = c.finish();
        assert_eq!(report.items[0].price, d("12.00"));
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].reason, SkipReason::OrphanDiscount);
        assert_eq!(report.skipped[0].line, 2);
    }

    #[test]
    fn skip_keyword_wins_over_negative_price() {
        let opts = ParseOptions::default();
        let mut c = Collector::new(&opts);
        c.offer(&line(1, "Burger 12.00"), "Burger", d("12.00"));
        c.offer(&line(2, "Change -5.00"), "Change", d("-5.00"));
        let report = c.finish();
        assert_eq!(report.items[0].price, d("12.00"));
        assert_eq!(report.skipped[0].reason, SkipReason::NonItemKeyword);
    }
}
