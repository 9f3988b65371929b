use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::SplitError;

/// What the tip percentage is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TipBase {
    /// Subtotal plus tax.
    #[default]
    TaxInclusive,
    /// Subtotal only.
    PreTax,
}

impl std::fmt::Display for TipBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TaxInclusive => write!(f, "taxInclusive"),
            Self::PreTax => write!(f, "preTax"),
        }
    }
}

/// Rates are percentages in `[0, 100]`.
pub fn validate_rate(which: &'static str, value: Decimal) -> Result<Decimal, SplitError> {
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(SplitError::InvalidRate { which, value });
    }
    Ok(value.normalize())
}
