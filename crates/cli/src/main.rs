// tabsplit CLI - split a restaurant bill from a receipt
//
// State lives in a JSON session file between invocations: `parse` fills the
// item pool, `assign` / `unassign` move items between people and the pool,
// `summary` and `export` read the result.

mod exit_codes;
mod export;
mod ocr;
mod util;

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde_json::json;

use tabsplit_config::{SessionFile, Settings, SettingsError};
use tabsplit_core::{format_money, ItemId};
use tabsplit_receipt::{
    extract_text, extract_words, parse_report, parse_words, DiscountPlacement, OcrError,
    ParseOptions, ParseReport,
};
use tabsplit_split::{ItemEdit, Reconciliation, SessionState, SplitError};

use exit_codes::{
    ocr_exit_code, split_exit_code, EXIT_IO, EXIT_OCR_FAILED, EXIT_PARSE, EXIT_SESSION_CORRUPT,
    EXIT_SESSION_EMPTY, EXIT_SPLIT_INVALID, EXIT_SUCCESS, EXIT_USAGE,
};
use export::ExportFormat;
use ocr::TesseractOcr;
use util::{pad_left, pad_right};

#[derive(Parser)]
#[command(name = "tabsplit")]
#[command(about = "Split a restaurant bill from a receipt")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Session file (default: <config dir>/tabsplit/session.json)
    #[arg(long, global = true, env = "TABSPLIT_SESSION", value_name = "PATH")]
    session: Option<PathBuf>,

    /// Settings file (default: <config dir>/tabsplit/settings.json)
    #[arg(long, global = true, env = "TABSPLIT_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Only report errors
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Log every skipped line and discount fold
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse receipt text (or an image, through OCR) into the item pool
    #[command(after_help = "\
Examples:
  tabsplit parse receipt.txt
  tesseract receipt.png - | tabsplit parse
  tabsplit parse --image receipt.png --text-out receipt.txt
  tabsplit parse --image receipt.png --table
  tabsplit parse receipt.txt --quantity --json

Re-parsing replaces the pool. Items get new ids, so assignments to the
old items are dropped and reported.")]
    Parse {
        /// Receipt text file (omit or `-` to read stdin)
        input: Option<PathBuf>,

        /// Receipt image to run through OCR
        #[arg(long, conflicts_with = "input", value_name = "IMG")]
        image: Option<PathBuf>,

        /// Use OCR word boxes and header columns (requires --image)
        #[arg(long, requires = "image")]
        table: bool,

        /// Save the OCR text for manual correction and re-parsing
        #[arg(long, requires = "image", conflicts_with = "table", value_name = "FILE")]
        text_out: Option<PathBuf>,

        /// Receipt has a quantity column (description / qty / price)
        #[arg(long)]
        quantity: bool,

        /// Accept whole numbers as prices
        #[arg(long)]
        integer_prices: bool,

        /// Accept one-decimal amounts (4.5) as prices
        #[arg(long)]
        one_decimal: bool,

        /// Discount lines come before the item they reduce
        #[arg(long)]
        discount_before: bool,

        /// Print items, skipped lines and reconciliation as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the item pool with short ids and owners
    Items {
        #[arg(long)]
        json: bool,
    },

    /// Correct a parsed item
    #[command(after_help = "\
Examples:
  tabsplit edit 3f2a --description 'Veggie Burger'
  tabsplit edit 3f2a --price 11.50")]
    Edit {
        /// Item id or unique id prefix
        id: String,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        price: Option<Decimal>,
    },

    /// Give items to a person
    #[command(after_help = "\
Rates are percentages (0-100). Without --tax / --tip the person's current
rates are kept; a new person gets the configured defaults.

Examples:
  tabsplit assign Ana 3f2a 9c41 --tax 8.875 --tip 18
  tabsplit assign Bo 77d0")]
    Assign {
        name: String,

        /// Item ids or unique id prefixes
        #[arg(required = true)]
        ids: Vec<String>,

        /// Tax rate (percent)
        #[arg(long)]
        tax: Option<Decimal>,

        /// Tip rate (percent)
        #[arg(long)]
        tip: Option<Decimal>,
    },

    /// Return an item to the unassigned pool
    Unassign {
        name: String,

        /// Item id or unique id prefix
        id: String,
    },

    /// Show totals for one person, or the whole bill
    Summary {
        name: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Write the bill report
    #[command(after_help = "\
Exports are refused while items are unassigned (exit 40) unless
--allow-partial is given.

Examples:
  tabsplit export
  tabsplit export --format csv -o bill.csv
  tabsplit export --format json --allow-partial")]
    Export {
        #[arg(long, short = 'f', value_enum, default_value_t = ExportFormat::Text)]
        format: ExportFormat,

        /// Output file (omit for stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Export even with unassigned items
        #[arg(long)]
        allow_partial: bool,
    },

    /// Delete the session file
    Reset,
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\ntarget:  ", env!("TARGET"),
    )
}

fn init_logging(quiet: bool, verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if quiet {
        builder.filter_level(log::LevelFilter::Error);
    } else if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();
}

/// Per-invocation context shared by commands.
struct Ctx {
    session: SessionFile,
    settings: Settings,
    quiet: bool,
}

impl Ctx {
    /// Print a note to stderr unless --quiet.
    fn note(&self, msg: impl AsRef<str>) {
        if !self.quiet {
            eprintln!("{}", msg.as_ref());
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    let ctx = Ctx {
        session: SessionFile::at_or_default(cli.session),
        settings,
        quiet: cli.quiet,
    };

    let result = match cli.command {
        Commands::Parse {
            input,
            image,
            table,
            text_out,
            quantity,
            integer_prices,
            one_decimal,
            discount_before,
            json,
        } => {
            let mut opts = ctx.settings.parse_options();
            opts.includes_quantity |= quantity;
            opts.allow_integer_prices |= integer_prices;
            opts.allow_one_decimal_prices |= one_decimal;
            if discount_before {
                opts.discount_placement = DiscountPlacement::PrecedesItem;
            }
            cmd_parse(&ctx, input, image, table, text_out, &opts, json)
        }
        Commands::Items { json } => cmd_items(&ctx, json),
        Commands::Edit { id, description, price } => cmd_edit(&ctx, id, description, price),
        Commands::Assign { name, ids, tax, tip } => cmd_assign(&ctx, name, ids, tax, tip),
        Commands::Unassign { name, id } => cmd_unassign(&ctx, name, id),
        Commands::Summary { name, json } => cmd_summary(&ctx, name, json),
        Commands::Export { format, output, allow_partial } => {
            require_session(&ctx).and_then(|state| export::cmd_export(&state, format, output, allow_partial))
        }
        Commands::Reset => cmd_reset(&ctx),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self { code: EXIT_PARSE, message: msg.into(), hint: None }
    }

    pub fn format(msg: impl Into<String>) -> Self {
        Self { code: exit_codes::EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Create error from an engine error with its exit code and a hint.
    pub fn split(err: SplitError) -> Self {
        let hint = match &err {
            SplitError::UnknownItem(_) => {
                Some("list current ids with `tabsplit items`; ids change on every parse".to_string())
            }
            SplitError::AmbiguousItem { .. } => {
                Some("use more characters of the id".to_string())
            }
            SplitError::ItemAlreadyAssigned { item, owner } => {
                Some(format!("run `tabsplit unassign {} {}` first", owner, item.short()))
            }
            SplitError::UnknownPerson(_) => {
                Some("`tabsplit summary` lists everyone with items".to_string())
            }
            _ => None,
        };
        Self { code: split_exit_code(&err), message: err.to_string(), hint }
    }

    /// OCR produced nothing. The session is left as it was.
    pub fn ocr(err: OcrError) -> Self {
        let hint = match &err {
            OcrError::Unavailable(_) => Some(
                "install tesseract (apt install tesseract-ocr / brew install tesseract) \
                 or set \"ocr.command\" in settings.json"
                    .to_string(),
            ),
            _ => Some("pass the receipt as text instead: tabsplit parse receipt.txt".to_string()),
        };
        Self {
            code: ocr_exit_code(&err),
            message: format!("no text extracted: {}", err),
            hint,
        }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ============================================================================
// session file
// ============================================================================

fn load_session(ctx: &Ctx) -> Result<Option<SessionState>, CliError> {
    match ctx.session.load::<SessionState>() {
        Ok(Some(mut state)) => {
            state.check_amounts().map_err(|e| CliError {
                code: EXIT_SESSION_CORRUPT,
                message: format!("session file {} is corrupt: {}", ctx.session.path().display(), e),
                hint: Some("run `tabsplit reset` to start over".to_string()),
            })?;
            if state.tip_base() != ctx.settings.tip_base {
                log::debug!("tip base {:?} from settings", ctx.settings.tip_base);
                state.set_tip_base(ctx.settings.tip_base);
            }
            let rec = state.reconcile();
            if !rec.is_noop() {
                log::warn!(
                    "session file repaired: dropped {} stale assignment(s)",
                    rec.dropped_items.len()
                );
            }
            Ok(Some(state))
        }
        Ok(None) => Ok(None),
        Err(SettingsError::Json(e)) => Err(CliError {
            code: EXIT_SESSION_CORRUPT,
            message: format!("session file {} is corrupt: {}", ctx.session.path().display(), e),
            hint: Some("run `tabsplit reset` to start over".to_string()),
        }),
        Err(e) => Err(CliError::io(format!("{}: {}", ctx.session.path().display(), e))),
    }
}

fn require_session(ctx: &Ctx) -> Result<SessionState, CliError> {
    load_session(ctx)?.ok_or_else(|| CliError {
        code: EXIT_SESSION_EMPTY,
        message: "no receipt parsed yet".to_string(),
        hint: Some("run `tabsplit parse RECEIPT.txt` first".to_string()),
    })
}

fn save_session(ctx: &Ctx, state: &SessionState) -> Result<(), CliError> {
    ctx.session
        .save(state)
        .map_err(|e| CliError::io(format!("cannot save session {}: {}", ctx.session.path().display(), e)))
}

fn resolve_all(state: &SessionState, refs: &[String]) -> Result<Vec<ItemId>, CliError> {
    refs.iter()
        .map(|r| state.resolve_item(r).map_err(CliError::split))
        .collect()
}

fn print_json(value: &impl serde::Serialize) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::format(format!("JSON serialization failed: {}", e)))?;
    println!("{}", json);
    Ok(())
}

// ============================================================================
// parse
// ============================================================================

fn read_text_input(input: Option<PathBuf>) -> Result<String, CliError> {
    let bytes = match input {
        Some(path) if path.as_os_str() != "-" => {
            fs::read(&path).map_err(|e| CliError::io(format!("{}: {}", path.display(), e)))?
        }
        _ => {
            let mut buf = Vec::new();
            io::stdin()
                .read_to_end(&mut buf)
                .map_err(|e| CliError::io(format!("stdin: {}", e)))?;
            buf
        }
    };
    String::from_utf8(bytes).map_err(|_| {
        CliError::parse("receipt text is not valid UTF-8")
            .with_hint("pass images with --image so they go through OCR")
    })
}

fn parse_image(
    ctx: &Ctx,
    path: &Path,
    table: bool,
    text_out: Option<PathBuf>,
    opts: &ParseOptions,
) -> Result<ParseReport, CliError> {
    let bytes = fs::read(path).map_err(|e| CliError::io(format!("{}: {}", path.display(), e)))?;
    let engine = TesseractOcr::new(&ctx.settings.ocr_command, &ctx.settings.ocr_language);

    if table {
        let out = extract_words(&engine, &bytes);
        if let Some(err) = out.failure {
            return Err(CliError::ocr(err));
        }
        if out.value.is_empty() {
            return Err(CliError::ocr(OcrError::Failed("no words recognized".to_string())));
        }
        return Ok(parse_words(&out.value, opts));
    }

    let out = extract_text(&engine, &bytes);
    if let Some(err) = out.failure {
        return Err(CliError::ocr(err));
    }
    if out.value.trim().is_empty() {
        return Err(CliError {
            code: EXIT_OCR_FAILED,
            message: "no text extracted: OCR returned nothing".to_string(),
            hint: Some("check the image is a readable, upright receipt".to_string()),
        });
    }
    if let Some(dest) = text_out {
        fs::write(&dest, &out.value)
            .map_err(|e| CliError::io(format!("{}: {}", dest.display(), e)))?;
        ctx.note(format!("OCR text saved to {}", dest.display()));
    }
    Ok(parse_report(&out.value, opts))
}

fn cmd_parse(
    ctx: &Ctx,
    input: Option<PathBuf>,
    image: Option<PathBuf>,
    table: bool,
    text_out: Option<PathBuf>,
    opts: &ParseOptions,
    json: bool,
) -> Result<(), CliError> {
    let report = match &image {
        Some(path) => parse_image(ctx, path, table, text_out, opts)?,
        None => parse_report(&read_text_input(input)?, opts),
    };

    let mut state = load_session(ctx)?
        .unwrap_or_else(|| SessionState::new(ctx.settings.tip_base));
    let rec = state.replace_pool(report.items);
    save_session(ctx, &state)?;

    if json {
        return print_json(&json!({
            "items": state.items(),
            "skipped": report.skipped,
            "reconciliation": rec,
        }));
    }

    print_items(&state)?;
    ctx.note(format!(
        "parsed {} item(s); {} line(s) skipped",
        state.items().len(),
        report.skipped.len()
    ));
    report_reconciliation(ctx, &rec);
    Ok(())
}

fn report_reconciliation(ctx: &Ctx, rec: &Reconciliation) {
    if !rec.dropped_items.is_empty() {
        ctx.note(format!(
            "dropped {} assignment(s) to items no longer on the receipt",
            rec.dropped_items.len()
        ));
    }
    for name in &rec.removed_people {
        ctx.note(format!("{} has no items left", name));
    }
}

// ============================================================================
// items / edit
// ============================================================================

fn print_items(state: &SessionState) -> Result<(), CliError> {
    let mut lines = vec![format!(
        "{}  {}  {}  OWNER",
        pad_right("ID", 8),
        pad_right("DESCRIPTION", 32),
        pad_left("PRICE", 10)
    )];
    for item in state.items() {
        lines.push(format!(
            "{}  {}  {}  {}",
            item.id.short(),
            pad_right(&item.description, 32),
            pad_left(&format_money(item.price), 10),
            state.owner_of(item.id).unwrap_or("-")
        ));
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for line in lines {
        writeln!(handle, "{}", line).map_err(|e| CliError::io(e.to_string()))?;
    }
    Ok(())
}

fn cmd_items(ctx: &Ctx, json: bool) -> Result<(), CliError> {
    let state = require_session(ctx)?;
    if json {
        let rows: Vec<_> = state
            .items()
            .iter()
            .map(|item| {
                json!({
                    "id": item.id,
                    "short_id": item.id.short(),
                    "description": item.description,
                    "price": item.price,
                    "discount": item.discount,
                    "owner": state.owner_of(item.id),
                })
            })
            .collect();
        return print_json(&rows);
    }
    print_items(&state)?;
    let unassigned = state.unassigned().len();
    if unassigned > 0 {
        ctx.note(format!("{} item(s) unassigned", unassigned));
    }
    Ok(())
}

fn cmd_edit(
    ctx: &Ctx,
    id: String,
    description: Option<String>,
    price: Option<Decimal>,
) -> Result<(), CliError> {
    if description.is_none() && price.is_none() {
        return Err(CliError::args("nothing to change")
            .with_hint("pass --description and/or --price"));
    }
    if price.is_some_and(|p| p.is_sign_negative()) {
        return Err(CliError::args("price must not be negative"));
    }
    let mut state = require_session(ctx)?;
    let id = state.resolve_item(&id).map_err(CliError::split)?;
    let item = state
        .edit_item(id, ItemEdit { description, price })
        .map_err(CliError::split)?;
    ctx.note(format!("{}  {}  {}", item.id.short(), item.description, format_money(item.price)));
    save_session(ctx, &state)
}

// ============================================================================
// assign / unassign
// ============================================================================

fn cmd_assign(
    ctx: &Ctx,
    name: String,
    ids: Vec<String>,
    tax: Option<Decimal>,
    tip: Option<Decimal>,
) -> Result<(), CliError> {
    let mut state = require_session(ctx)?;
    let item_ids = resolve_all(&state, &ids)?;

    let existing = state.person(&name);
    let tax = tax
        .or(existing.map(|p| p.tax_rate()))
        .unwrap_or(ctx.settings.default_tax_rate);
    let tip = tip
        .or(existing.map(|p| p.tip_rate()))
        .unwrap_or(ctx.settings.default_tip_rate);

    state
        .assign(&name, &item_ids, tax, tip)
        .map_err(CliError::split)?;
    save_session(ctx, &state)?;

    let summary = state.summarize(&name).map_err(CliError::split)?;
    print!("{}", export::person_block(&summary));
    let left = state.unassigned().len();
    if left > 0 {
        ctx.note(format!("{} item(s) still unassigned", left));
    }
    Ok(())
}

fn cmd_unassign(ctx: &Ctx, name: String, id: String) -> Result<(), CliError> {
    let mut state = require_session(ctx)?;
    let id = state.resolve_item(&id).map_err(CliError::split)?;
    if !state.unassign(&name, id) {
        let message = match state.owner_of(id) {
            Some(owner) => format!("item {} belongs to {}, not {}", id.short(), owner, name.trim()),
            None => format!("item {} is not assigned", id.short()),
        };
        return Err(CliError { code: EXIT_SPLIT_INVALID, message, hint: None });
    }
    save_session(ctx, &state)?;
    if state.person(&name).is_none() {
        ctx.note(format!("{} has no items left", name.trim()));
    }
    ctx.note(format!("item {} returned to the pool", id.short()));
    Ok(())
}

// ============================================================================
// summary / reset
// ============================================================================

fn cmd_summary(ctx: &Ctx, name: Option<String>, json: bool) -> Result<(), CliError> {
    let state = require_session(ctx)?;
    match name {
        Some(name) => {
            let summary = state.summarize(&name).map_err(CliError::split)?;
            if json {
                print_json(&summary)
            } else {
                print!("{}", export::person_block(&summary));
                Ok(())
            }
        }
        None => {
            let report = state.report();
            let rendered = if json {
                export::render_json(&report)?
            } else {
                export::render_text(&report)
            };
            print!("{}", rendered);
            Ok(())
        }
    }
}

fn cmd_reset(ctx: &Ctx) -> Result<(), CliError> {
    let removed = ctx
        .session
        .remove()
        .map_err(|e| CliError::io(format!("{}: {}", ctx.session.path().display(), e)))?;
    if removed {
        ctx.note(format!("removed {}", ctx.session.path().display()));
    } else {
        ctx.note("no session to remove");
    }
    Ok(())
}
