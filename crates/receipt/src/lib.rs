//! `tabsplit-receipt`: turns OCR text from a receipt into line items.
//!
//! Pure parser crate: text (or word boxes) in, items out. Parsing never
//! fails; lines that yield no item are listed in [`ParseReport::skipped`].

mod collect;
mod lines;
pub mod ocr;
pub mod options;
pub mod price;
pub mod table;

pub use collect::{ParseReport, SkipReason, SkippedLine};
pub use ocr::{extract_text, extract_words, Ocr, OcrError, OcrText, OcrWords};
pub use options::{DiscountPlacement, ParseOptions};
pub use table::{group_rows, parse_words, Word};

use tabsplit_core::Item;

/// Parse receipt text into items, in receipt order.
pub fn parse(raw_text: &str, opts: &ParseOptions) -> Vec<Item> {
    parse_report(raw_text, opts).items
}

/// Parse receipt text, keeping the list of skipped lines.
pub fn parse_report(raw_text: &str, opts: &ParseOptions) -> ParseReport {
    let lines = collect::split_lines(raw_text);
    let mut sink = collect::Collector::new(opts);
    lines::scan(&lines, opts, &mut sink);
    let report = sink.finish();
    log::debug!(
        "parsed {} items from {} lines ({} skipped)",
        report.items.len(),
        lines.len(),
        report.skipped.len()
    );
    report
}
