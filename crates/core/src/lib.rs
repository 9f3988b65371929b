//! `tabsplit-core`: shared item model and money helpers.
//!
//! Both the receipt parser and the split engine speak in these types; neither
//! depends on the other.

pub mod item;
pub mod money;

pub use item::{Item, ItemError, ItemId};
pub use money::{format_money, percent_of, price_in_range, round_money, MAX_PRICE_DIGITS, MONEY_DP};
pub use rust_decimal::Decimal;
