use std::fmt;

use rust_decimal::Decimal;
use tabsplit_core::ItemId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitError {
    /// Empty person name or empty item selection.
    InvalidAssignment(String),
    /// Tax or tip rate outside 0–100.
    InvalidRate { which: &'static str, value: Decimal },
    /// Item is already owned by someone.
    ItemAlreadyAssigned { item: ItemId, owner: String },
    /// No item in the current pool matches.
    UnknownItem(String),
    /// A short id matches more than one item.
    AmbiguousItem { reference: String, matches: usize },
    UnknownPerson(String),
    /// Manual edit rejected (blank description, etc.).
    InvalidEdit(String),
}

impl fmt::Display for SplitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAssignment(msg) => write!(f, "invalid assignment: {msg}"),
            Self::InvalidRate { which, value } => {
                write!(f, "{which} rate must be between 0 and 100, got {value}")
            }
            Self::ItemAlreadyAssigned { item, owner } => {
                write!(f, "item {} is already assigned to {owner}", item.short())
            }
            Self::UnknownItem(reference) => write!(f, "no item matches '{reference}'"),
            Self::AmbiguousItem { reference, matches } => {
                write!(f, "'{reference}' matches {matches} items; use a longer id")
            }
            Self::UnknownPerson(name) => write!(f, "unknown person: {name}"),
            Self::InvalidEdit(msg) => write!(f, "invalid edit: {msg}"),
        }
    }
}

impl std::error::Error for SplitError {}
