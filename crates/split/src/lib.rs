//! `tabsplit-split`: bill-splitting allocation engine.
//!
//! Pure engine crate: owns the item pool for one session, tracks who claimed
//! which item, and computes per-person tax, tip and totals. No IO.

pub mod error;
pub mod policy;
pub mod session;
pub mod summary;

pub use error::SplitError;
pub use policy::TipBase;
pub use session::{ItemEdit, Person, Reconciliation, SessionState};
pub use summary::{summarize_items, BillReport, PersonSummary, ReportMeta};
