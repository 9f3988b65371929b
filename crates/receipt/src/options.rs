use serde::{Deserialize, Serialize};

/// Lines whose description contains one of these are never items.
pub const SKIP_KEYWORDS: &[&str] = &[
    "subtotal",
    "total",
    "tax",
    "tip",
    "change",
    "cash",
    "payment",
    "visa",
    "mastercard",
];

/// Lines whose description contains one of these fold into a neighbouring item.
pub const DISCOUNT_KEYWORDS: &[&str] = &["discount", "happy hour", "coupon", "promo"];

/// Column header lines; dropped and never used as a description.
pub const HEADER_KEYWORDS: &[&str] = &["quantity", "qty"];

/// Suffix added once to an item that absorbed a discount.
pub const DISCOUNT_NOTE: &str = " (discount applied)";

/// Which item a discount line applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiscountPlacement {
    /// Discount lines follow the item they reduce.
    #[default]
    FollowsItem,
    /// Discount lines precede the item they reduce.
    PrecedesItem,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Receipt carries a quantity column (`description / quantity / price`).
    pub includes_quantity: bool,
    /// Fall back to line parsing when a word table has no usable header.
    pub fallback_line_based: bool,
    /// Accept bare integers (`12`) as prices.
    pub allow_integer_prices: bool,
    /// Accept one-decimal amounts (`4.5`) as prices.
    pub allow_one_decimal_prices: bool,
    pub discount_placement: DiscountPlacement,
    /// Max vertical gap (pixels) between words of one table row.
    pub row_merge_threshold: i32,
    pub extra_skip_keywords: Vec<String>,
    pub extra_discount_keywords: Vec<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            includes_quantity: false,
            fallback_line_based: true,
            allow_integer_prices: false,
            allow_one_decimal_prices: false,
            discount_placement: DiscountPlacement::FollowsItem,
            row_merge_threshold: 15,
            extra_skip_keywords: Vec::new(),
            extra_discount_keywords: Vec::new(),
        }
    }
}

impl ParseOptions {
    pub fn with_quantity(mut self, includes_quantity: bool) -> Self {
        self.includes_quantity = includes_quantity;
        self
    }

    pub fn with_integer_prices(mut self, allow: bool) -> Self {
        self.allow_integer_prices = allow;
        self
    }

    pub fn with_one_decimal_prices(mut self, allow: bool) -> Self {
        self.allow_one_decimal_prices = allow;
        self
    }

    pub fn with_discount_placement(mut self, placement: DiscountPlacement) -> Self {
        self.discount_placement = placement;
        self
    }

    pub fn is_skip_line(&self, description: &str) -> bool {
        contains_any(description, SKIP_KEYWORDS, &self.extra_skip_keywords)
    }

    pub fn is_discount_line(&self, description: &str) -> bool {
        contains_any(description, DISCOUNT_KEYWORDS, &self.extra_discount_keywords)
    }

    pub fn is_header_line(&self, line: &str) -> bool {
        contains_any(line, HEADER_KEYWORDS, &[])
    }
}

/// Case-insensitive substring match against built-in and user keywords.
fn contains_any(text: &str, builtin: &[&str], extra: &[String]) -> bool {
    let lower = text.to_lowercase();
    builtin.iter().any(|k| lower.contains(k))
        || extra
            .iter()
            .map(|k| k.trim().to_lowercase())
            .any(|k| !k.is_empty() && lower.contains(&k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_keywords_case_insensitive() {
        let opts = ParseOptions::default();
        assert!(opts.is_skip_line("SUBTOTAL"));
        assert!(opts.is_skip_line("Sales Tax"));
        assert!(opts.is_skip_line("Visa ****1234"));
        assert!(!opts.is_skip_line("Burger"));
    }

    #[test]
    fn extra_keywords_extend_builtins() {
        let opts = ParseOptions {
            extra_skip_keywords: vec!["Gratuity".into(), "  ".into()],
            extra_discount_keywords: vec!["comp".into()],
            ..ParseOptions::default()
        };
        assert!(opts.is_skip_line("gratuity 18%"));
        assert!(!opts.is_skip_line("Burger"));
        assert!(opts.is_discount_line("Manager Comp"));
        assert!(opts.is_discount_line("HAPPY HOUR"));
    }

    #[test]
    fn header_lines() {
        let opts = ParseOptions::default();
        assert!(opts.is_header_line("Item  Qty  Price"));
        assert!(opts.is_header_line("QUANTITY"));
        assert!(!opts.is_header_line("Fries"));
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let opts: ParseOptions =
            serde_json::from_str(r#"{"includes_quantity": true, "discount_placement": "precedesItem"}"#)
                .unwrap();
        assert!(opts.includes_quantity);
        assert!(opts.fallback_line_based);
        assert!(!opts.allow_one_decimal_prices);
        assert_eq!(opts.discount_placement, DiscountPlacement::PrecedesItem);
        assert_eq!(opts.row_merge_threshold, 15);
    }
}
