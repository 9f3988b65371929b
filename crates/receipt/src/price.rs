//! Price token recognition.
//!
//! Accepts `12.00`, `$12.00`, `-2.00`, `-$2.00`, `$-2.00`, `1,234.56` and the
//! parenthesized negatives `(2.00)` / `($2.00)`. Bare integers and one-decimal
//! amounts (`4.5`) only when the options allow them. At most
//! `MAX_PRICE_DIGITS` integer digits.

use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use tabsplit_core::price_in_range;

use crate::options::ParseOptions;

static PRICE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<sign>-)?\$?(?P<sign2>-)?(?P<int>\d{1,3}(?:,\d{3}){1,3}|\d{1,12})(?:\.(?P<frac>\d{1,2}))?$",
    )
    .unwrap()
});

static PAREN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\((?P<inner>[^()]+)\)$").unwrap());

static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(?:\.\d+)?$").unwrap());

static INTEGER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());

/// Parse a single whitespace-free token as a price.
pub fn parse_price(token: &str, opts: &ParseOptions) -> Option<Decimal> {
    let token = token.trim();
    if let Some(caps) = PAREN_RE.captures(token) {
        let inner = caps.name("inner")?.as_str();
        if inner.contains('-') {
            return None;
        }
        return parse_price(inner, opts).map(|v| -v);
    }

    let caps = PRICE_RE.captures(token)?;
    if caps.name("sign").is_some() && caps.name("sign2").is_some() {
        return None;
    }
    let negative = caps.name("sign").is_some() || caps.name("sign2").is_some();
    let int = caps.name("int")?.as_str().replace(',', "");
    let value = match caps.name("frac") {
        Some(frac) if frac.as_str().len() == 1 && !opts.allow_one_decimal_prices => return None,
        Some(frac) => Decimal::from_str(&format!("{int}.{}", frac.as_str())).ok()?,
        None if opts.allow_integer_prices => Decimal::from_str(&int).ok()?,
        None => return None,
    };
    if !price_in_range(value) {
        return None;
    }
    Some(if negative { -value } else { value })
}

/// A line consisting solely of a number (`2`, `1.5`); no sign or currency.
pub fn is_bare_number(token: &str) -> bool {
    NUMBER_RE.is_match(token.trim())
}

pub fn is_integer(token: &str) -> bool {
    INTEGER_RE.is_match(token.trim())
}

/// Split `description price` at the last whitespace run. A dangling `$` or
/// `-$` left on the description (OCR often spaces it out) moves onto the token.
pub fn split_trailing_token(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    let (head, token) = line.rsplit_once(char::is_whitespace)?;
    let head = head.trim_end();
    for marker in ["-$", "$"] {
        if let Some(stripped) = head.strip_suffix(marker) {
            if stripped.is_empty() || stripped.ends_with(char::is_whitespace) {
                return Some((stripped.trim_end().to_string(), format!("{marker}{token}")));
            }
        }
    }
    Some((head.to_string(), token.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn strict() -> ParseOptions {
        ParseOptions::default()
    }

    fn lenient() -> ParseOptions {
        ParseOptions::default()
            .with_integer_prices(true)
            .with_one_decimal_prices(true)
    }

    #[test]
    fn canonical_two_decimal_prices() {
        assert_eq!(parse_price("12.00", &strict()), Some(d("12.00")));
        assert_eq!(parse_price("$4.50", &strict()), Some(d("4.50")));
        assert_eq!(parse_price("-2.00", &strict()), Some(d("-2.00")));
        assert_eq!(parse_price("-$2.00", &strict()), Some(d("-2.00")));
        assert_eq!(parse_price("$-2.00", &strict()), Some(d("-2.00")));
        assert_eq!(parse_price("1,234.56", &strict()), Some(d("1234.56")));
    }

    #[test]
    fn parenthesized_negative() {
        assert_eq!(parse_price("(2.00)", &strict()), Some(d("-2.00")));
        assert_eq!(parse_price("($1,517.82)", &strict()), Some(d("-1517.82")));
        assert_eq!(parse_price("(-2.00)", &strict()), None);
    }

    #[test]
    fn integers_need_opt_in() {
        assert_eq!(parse_price("12", &strict()), None);
        assert_eq!(parse_price("12", &lenient()), Some(d("12")));
        assert_eq!(parse_price("$12", &lenient()), Some(d("12")));
    }

    #[test]
    fn one_decimal_needs_opt_in() {
        assert_eq!(parse_price("4.5", &strict()), None);
        assert_eq!(parse_price("4.5", &lenient()), Some(d("4.5")));
        assert_eq!(parse_price("$-0.5", &lenient()), Some(d("-0.5")));
        assert_eq!(parse_price("(1.5)", &lenient()), Some(d("-1.5")));
    }

    #[test]
    fn integer_digits_are_capped() {
        assert_eq!(parse_price("999999999999.99", &strict()), Some(d("999999999999.99")));
        assert_eq!(parse_price("999,999,999,999.99", &strict()), Some(d("999999999999.99")));
        assert_eq!(parse_price("1000000000000.00", &strict()), None);
        assert_eq!(parse_price("1,000,000,000,000.00", &strict()), None);
        assert_eq!(parse_price("9999999999999999999999999999.00", &strict()), None);
        assert_eq!(parse_price("9999999999999999999999999999", &lenient()), None);
    }

    #[test]
    fn rejects_non_prices() {
        assert_eq!(parse_price("4.5", &strict()), None);
        assert_eq!(parse_price("4.505", &strict()), None);
        assert_eq!(parse_price("--2.00", &strict()), None);
        assert_eq!(parse_price("12,34.00", &strict()), None);
        assert_eq!(parse_price("abc", &lenient()), None);
        assert_eq!(parse_price("", &lenient()), None);
    }

    #[test]
    fn bare_numbers() {
        assert!(is_bare_number("2"));
        assert!(is_bare_number("1.5"));
        assert!(!is_bare_number("$2"));
        assert!(!is_bare_number("-2"));
        assert!(is_integer("3"));
        assert!(!is_integer("3.00"));
    }

    #[test]
    fn split_trailing() {
        assert_eq!(
            split_trailing_token("Burger   12.00"),
            Some(("Burger".into(), "12.00".into()))
        );
        assert_eq!(
            split_trailing_token("Fries $ 4.50"),
            Some(("Fries".into(), "$4.50".into()))
        );
        assert_eq!(
            split_trailing_token("Coupon -$ 1.00"),
            Some(("Coupon".into(), "-$1.00".into()))
        );
        assert_eq!(split_trailing_token("Burger"), None);
    }
}
