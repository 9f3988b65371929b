//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain    | Description                               |
//! |---------|-----------|-------------------------------------------|
//! | 0       | Universal | Success                                   |
//! | 1       | Universal | General error (unspecified)               |
//! | 2       | Universal | CLI usage error (bad args, missing file)  |
//! | 3-9     | io        | Reading input, writing output             |
//! | 10-19   | split     | Assignment and item lookup                |
//! | 20-29   | session   | Session file state                        |
//! | 30-39   | ocr       | External OCR engine                       |
//! | 40-49   | export    | Export gate                               |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use tabsplit_receipt::OcrError;
use tabsplit_split::SplitError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// IO (3-9)
// =============================================================================

/// Cannot read input or write output.
pub const EXIT_IO: u8 = 3;

/// Input is not usable receipt text (not UTF-8, bad TSV from OCR).
pub const EXIT_PARSE: u8 = 4;

// =============================================================================
// Split (10-19)
// =============================================================================

/// Blank name or no items selected.
pub const EXIT_SPLIT_INVALID: u8 = 10;

/// Item already owned by someone else.
pub const EXIT_SPLIT_TAKEN: u8 = 11;

/// Item reference matches nothing in the current pool.
pub const EXIT_SPLIT_UNKNOWN_ITEM: u8 = 12;

/// Short item id matches several items.
pub const EXIT_SPLIT_AMBIGUOUS: u8 = 13;

/// Name is not a person in this session.
pub const EXIT_SPLIT_UNKNOWN_PERSON: u8 = 14;

/// Tax or tip rate outside 0-100.
pub const EXIT_SPLIT_RATE: u8 = 15;

// =============================================================================
// Session (20-29)
// =============================================================================

/// Session file exists but cannot be read as a session.
pub const EXIT_SESSION_CORRUPT: u8 = 20;

/// No receipt parsed yet.
pub const EXIT_SESSION_EMPTY: u8 = 21;

// =============================================================================
// OCR (30-39)
// =============================================================================

/// OCR engine not installed.
pub const EXIT_OCR_UNAVAILABLE: u8 = 30;

/// OCR engine ran and failed, or produced no text.
pub const EXIT_OCR_FAILED: u8 = 31;

// =============================================================================
// Export (40-49)
// =============================================================================

/// Bill still has unassigned items (and --allow-partial not given).
pub const EXIT_EXPORT_INCOMPLETE: u8 = 40;

/// Map a SplitError to its exit code.
pub fn split_exit_code(err: &SplitError) -> u8 {
    match err {
        SplitError::InvalidAssignment(_) | SplitError::InvalidEdit(_) => EXIT_SPLIT_INVALID,
        SplitError::InvalidRate { .. } => EXIT_SPLIT_RATE,
        SplitError::ItemAlreadyAssigned { .. } => EXIT_SPLIT_TAKEN,
        SplitError::UnknownItem(_) => EXIT_SPLIT_UNKNOWN_ITEM,
        SplitError::AmbiguousItem { .. } => EXIT_SPLIT_AMBIGUOUS,
        SplitError::UnknownPerson(_) => EXIT_SPLIT_UNKNOWN_PERSON,
    }
}

/// Map an OcrError to its exit code.
pub fn ocr_exit_code(err: &OcrError) -> u8 {
    match err {
        OcrError::Unavailable(_) => EXIT_OCR_UNAVAILABLE,
        OcrError::Failed(_) | OcrError::Unsupported(_) => EXIT_OCR_FAILED,
        OcrError::EmptyImage => EXIT_USAGE,
    }
}
