//! Structured table strategy over word boxes.
//!
//! Words are grouped into rows by vertical proximity, a header row naming a
//! description column and a price column is located, and every later word is
//! assigned to the header column nearest its horizontal centre.

use serde::{Deserialize, Serialize};

use crate::collect::{Collector, Line, ParseReport, SkipReason};
use crate::options::ParseOptions;
use crate::price::parse_price;

const DESCRIPTION_TOKENS: &[&str] = &["description", "item", "items"];
const PRICE_TOKENS: &[&str] = &["price", "amount"];

/// A recognized word and its bounding box, in pixels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl Word {
    pub fn new(text: impl Into<String>, left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            text: text.into(),
            left,
            top,
            width,
            height,
        }
    }

    fn center_x(&self) -> i32 {
        self.left + self.width / 2
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Description,
    Price,
    Other,
}

#[derive(Debug, Clone, Copy)]
struct Column {
    kind: ColumnKind,
    center: i32,
}

/// Group words into rows. Words are ordered by `(top, left)`; a word joins the
/// current row while its top is less than `threshold` below the previous word.
pub fn group_rows(words: &[Word], threshold: i32) -> Vec<Vec<Word>> {
    let mut sorted: Vec<&Word> = words.iter().filter(|w| !w.text.trim().is_empty()).collect();
    sorted.sort_by_key(|w| (w.top, w.left));

    let mut rows: Vec<Vec<Word>> = Vec::new();
    let mut current: Vec<Word> = Vec::new();
    let mut last_top: Option<i32> = None;

    for word in sorted {
        if let Some(prev) = last_top {
            if word.top - prev >= threshold && !current.is_empty() {
                rows.push(std::mem::take(&mut current));
            }
        }
        last_top = Some(word.top);
        current.push(word.clone());
    }
    if !current.is_empty() {
        rows.push(current);
    }

    for row in &mut rows {
        row.sort_by_key(|w| w.left);
    }
    rows
}

fn normalize_token(text: &str) -> String {
    text.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase()
}

/// Locate the header row and its columns.
fn find_header(rows: &[Vec<Word>]) -> Option<(usize, Vec<Column>)> {
    rows.iter().enumerate().find_map(|(idx, row)| {
        let mut has_desc = false;
        let mut has_price = false;
        let columns: Vec<Column> = row
            .iter()
            .map(|w| {
                let token = normalize_token(&w.text);
                let kind = if !has_desc && DESCRIPTION_TOKENS.contains(&token.as_str()) {
                    has_desc = true;
                    ColumnKind::Description
                } else if !has_price && PRICE_TOKENS.contains(&token.as_str()) {
                    has_price = true;
                    ColumnKind::Price
                } else {
                    ColumnKind::Other
                };
                Column {
                    kind,
                    center: w.center_x(),
                }
            })
            .collect();
        (has_desc && has_price).then_some((idx, columns))
    })
}

/// Assign each word to its nearest column; ties go to the leftmost column.
fn cells(row: &[Word], columns: &[Column]) -> Vec<Vec<String>> {
    let mut cells = vec![Vec::new(); columns.len()];
    for word in row {
        let center = word.center_x();
        let nearest = columns
            .iter()
            .enumerate()
            .min_by_key(|(i, c)| ((c.center - center).abs(), *i))
            .map(|(i, _)| i);
        if let Some(i) = nearest {
            cells[i].push(word.text.trim().to_string());
        }
    }
    cells
}

fn row_text(row: &[Word]) -> String {
    row.iter()
        .map(|w| w.text.trim())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse word boxes as a table. Without a usable header (or when the table
/// yields nothing) and with `fallback_line_based` set, the rows are re-joined
/// into text lines and parsed line by line instead.
pub fn parse_words(words: &[Word], opts: &ParseOptions) -> ParseReport {
    let rows = group_rows(words, opts.row_merge_threshold);

    if let Some((header, columns)) = find_header(&rows) {
        let desc_col = columns.iter().position(|c| c.kind == ColumnKind::Description);
        let price_col = columns.iter().position(|c| c.kind == ColumnKind::Price);

        let mut sink = Collector::new(opts);
        for (idx, row) in rows.iter().enumerate() {
            let line = Line {
                number: idx + 1,
                text: row_text(row),
            };
            if idx < header {
                sink.skip(&line, SkipReason::Unmatched);
                continue;
            }
            if idx == header {
                sink.skip(&line, SkipReason::Header);
                continue;
            }
            let cells = cells(row, &columns);
            let description = desc_col.map(|c| cells[c].join(" ")).unwrap_or_default();
            let price = price_col
                .map(|c| cells[c].concat())
                .and_then(|text| parse_price(&text, opts));
            match price {
                Some(price) if !description.trim().is_empty() => {
                    sink.offer(&line, &description, price)
                }
                _ => sink.skip(&line, SkipReason::Unmatched),
            }
        }
        let report = sink.finish();
        if !report.items.is_empty() || !opts.fallback_line_based {
            return report;
        }
        log::debug!("table header found but no rows priced; falling back to lines");
    } else if !opts.fallback_line_based {
        log::debug!("no table header among {} rows", rows.len());
        return ParseReport::default();
    }

    let text = rows.iter().map(|r| row_text(r)).collect::<Vec<_>>().join("\n");
    crate::parse_report(&text, opts)
}
