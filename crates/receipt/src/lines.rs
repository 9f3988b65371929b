//! Line-based strategies.
//!
//! Each line is classified once, then a two-state machine walks the lines
//! left to right:
//!
//! - `SeekPrice`: a `description price` line is emitted directly; a line that
//!   is only a price switches to `SeekDescBackward`; other lines wait.
//! - `SeekDescBackward`: look back from the price line, never past the last
//!   consumed line, for the nearest text line. In quantity mode bare numbers
//!   (the quantity column) are stepped over; otherwise they end the search.
//!
//! A consumed line is never revisited. Waiting lines nobody claims are
//! reported as unmatched.

use rust_decimal::Decimal;

use crate::collect::{Collector, Line, SkipReason};
use crate::options::ParseOptions;
use crate::price::{is_bare_number, is_integer, parse_price, split_trailing_token};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LineShape {
    /// `description price` on one line.
    Priced { description: String, price: Decimal },
    /// Only a price.
    Price(Decimal),
    /// Only a number that is not a price.
    Number,
    Header,
    /// Anything else; a description candidate.
    Text,
}

pub(crate) fn classify(text: &str, opts: &ParseOptions) -> LineShape {
    if opts.is_header_line(text) {
        return LineShape::Header;
    }
    if is_bare_number(text) {
        if opts.includes_quantity && is_integer(text) {
            return LineShape::Number;
        }
        return match parse_price(text, opts) {
            Some(price) => LineShape::Price(price),
            None => LineShape::Number,
        };
    }
    if let Some(price) = parse_price(text, opts) {
        return LineShape::Price(price);
    }
    if let Some((head, token)) = split_trailing_token(text) {
        if let Some(price) = parse_price(&token, opts) {
            let description = if opts.includes_quantity {
                strip_quantity(&head)
            } else {
                head
            };
            if description.is_empty() || is_bare_number(&description) {
                return LineShape::Price(price);
            }
            return LineShape::Priced { description, price };
        }
    }
    LineShape::Text
}

/// Drop a trailing quantity (`Burger 2`) or a leading `2x` / `2 x` marker.
fn strip_quantity(description: &str) -> String {
    let mut desc = description.trim();
    if let Some((head, last)) = desc.rsplit_once(char::is_whitespace) {
        if is_integer(last) {
            desc = head.trim_end();
        }
    }
    if let Some((first, rest)) = desc.split_once(char::is_whitespace) {
        let marker = first.trim_end_matches(['x', 'X']);
        if first.len() > marker.len() && is_integer(marker) {
            desc = rest.trim_start();
        } else if is_integer(first) {
            if let Some(rest) = rest.trim_start().strip_prefix(['x', 'X']) {
                if rest.starts_with(char::is_whitespace) {
                    desc = rest.trim_start();
                }
            }
        }
    }
    desc.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ScanState {
    SeekPrice,
    SeekDescBackward { price_line: usize, price: Decimal },
}

pub(crate) fn scan(lines: &[Line], opts: &ParseOptions, sink: &mut Collector<'_>) {
    let shapes: Vec<LineShape> = lines.iter().map(|l| classify(&l.text, opts)).collect();

    let mut state = ScanState::SeekPrice;
    // First index not yet consumed.
    let mut floor = 0;
    let mut i = 0;

    while i < lines.len() {
        match state {
            ScanState::SeekPrice => match &shapes[i] {
                LineShape::Priced { description, price } => {
                    unclaimed(lines, floor, i, sink);
                    sink.offer(&lines[i], description, *price);
                    floor = i + 1;
                    i += 1;
                }
                LineShape::Price(price) => {
                    state = ScanState::SeekDescBackward {
                        price_line: i,
                        price: *price,
                    };
                }
                LineShape::Header => {
                    unclaimed(lines, floor, i, sink);
                    sink.skip(&lines[i], SkipReason::Header);
                    floor = i + 1;
                    i += 1;
                }
                LineShape::Number | LineShape::Text => i += 1,
            },
            ScanState::SeekDescBackward { price_line, price } => {
                let mut desc_idx = None;
                for j in (floor..price_line).rev() {
                    match shapes[j] {
                        LineShape::Text => {
                            desc_idx = Some(j);
                            break;
                        }
                        LineShape::Number if opts.includes_quantity => continue,
                        _ => break,
                    }
                }
                match desc_idx {
                    Some(j) => {
                        unclaimed(lines, floor, j, sink);
                        sink.offer(&lines[j], &lines[j].text, price);
                    }
                    None => {
                        unclaimed(lines, floor, price_line, sink);
                        sink.skip(&lines[price_line], SkipReason::Unmatched);
                    }
                }
                floor = price_line + 1;
                i = price_line + 1;
                state = ScanState::SeekPrice;
            }
        }
    }

    unclaimed(lines, floor, lines.len(), sink);
}

fn unclaimed(lines: &[Line], from: usize, to: usize, sink: &mut Collector<'_>) {
    for line in &lines[from..to] {
        sink.skip(line, SkipReason::Unmatched);
    }
}
