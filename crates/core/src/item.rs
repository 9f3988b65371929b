use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::{price_in_range, round_money, MAX_PRICE_DIGITS};

/// Opaque item identifier, issued once when the item is parsed.
///
/// Never derived from the description or position, so manual edits do not
/// change an item's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(Uuid);

impl ItemId {
    /// Issue a fresh identifier.
    pub fn issue() -> Self {
        Self(Uuid::new_v4())
    }

    /// First 8 hex digits, for display in listings.
    pub fn short(&self) -> String {
        let mut s = self.0.simple().to_string();
        s.truncate(8);
        s
    }

    /// True if `prefix` (hyphens ignored, case-insensitive) starts this id.
    pub fn matches_prefix(&self, prefix: &str) -> bool {
        let wanted: String = prefix
            .chars()
            .filter(|c| *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        !wanted.is_empty() && self.0.simple().to_string().starts_with(&wanted)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for ItemId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemError {
    /// Description is empty after trimming.
    EmptyDescription,
    /// Price has more than `MAX_PRICE_DIGITS` integer digits.
    PriceOutOfRange(Decimal),
}

impl fmt::Display for ItemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyDescription => write!(f, "item description must not be empty"),
            Self::PriceOutOfRange(price) => write!(
                f,
                "price {price} exceeds {MAX_PRICE_DIGITS} integer digits"
            ),
        }
    }
}

impl std::error::Error for ItemError {}

/// A single receipt line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub description: String,
    /// Current price, after any folded discounts.
    pub price: Decimal,
    /// Total discount folded into `price` (zero when none).
    #[serde(default)]
    pub discount: Decimal,
}

impl Item {
    /// Build an item with a freshly issued id. The description is trimmed and
    /// the price rounded to cents.
    pub fn new(description: impl Into<String>, price: Decimal) -> Result<Self, ItemError> {
        let description = description.into().trim().to_string();
        if description.is_empty() {
            return Err(ItemError::EmptyDescription);
        }
        let price = round_money(price);
        if !price_in_range(price) {
            return Err(ItemError::PriceOutOfRange(price));
        }
        Ok(Self {
            id: ItemId::issue(),
            description,
            price,
            discount: round_money(Decimal::ZERO),
        })
    }

    /// Price before any discount fold.
    pub fn original_price(&self) -> Decimal {
        self.price + self.discount
    }

    pub fn is_discounted(&self) -> bool {
        !self.discount.is_zero()
    }

    /// Same description and amounts, ignoring the id.
    pub fn same_content(&self, other: &Item) -> bool {
        self.description == other.description
            && self.price == other.price
            && self.discount == other.discount
    }
}
