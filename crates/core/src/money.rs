use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places carried by every displayed amount.
pub const MONEY_DP: u32 = 2;

/// Integer digits allowed in a single price. Sums and percentages of bounded
/// prices stay far inside `Decimal`'s range.
pub const MAX_PRICE_DIGITS: u32 = 12;

/// `|amount| < 10^MAX_PRICE_DIGITS`.
pub fn price_in_range(amount: Decimal) -> bool {
    amount.abs() < Decimal::from(10_i64.pow(MAX_PRICE_DIGITS))
}

/// Round half-up (midpoint away from zero) to cents.
///
/// The result always carries exactly two decimal places, so `15` becomes
/// `15.00` when serialized.
pub fn round_money(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_DP);
    rounded
}

/// `amount * rate / 100`, unrounded.
pub fn percent_of(amount: Decimal, rate: Decimal) -> Decimal {
    amount * rate / Decimal::ONE_HUNDRED
}

/// Render as `$12.34` / `-$2.00`.
pub fn format_money(amount: Decimal) -> String {
    let rounded = round_money(amount);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-${}", rounded.abs())
    } else {
        format!("${}", rounded.abs())
    }
}
