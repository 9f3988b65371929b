//! `tabsplit export`: render the bill report as text, CSV or JSON.
//!
//! The text layout is the printable per-person summary: name and rates,
//! the items, then subtotal, tax, tip and total, followed by the grand
//! total and effective tip percentage.

use std::io::Write;
use std::path::PathBuf;

use clap::ValueEnum;
use rust_decimal::Decimal;
use serde::Serialize;
use tabsplit_core::format_money;
use tabsplit_split::{BillReport, PersonSummary, SessionState};

use crate::exit_codes::EXIT_EXPORT_INCOMPLETE;
use crate::util::ledger_line;
use crate::CliError;

const TEXT_WIDTH: usize = 44;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Text,
    Csv,
    Json,
}

pub fn cmd_export(
    state: &SessionState,
    format: ExportFormat,
    output: Option<PathBuf>,
    allow_partial: bool,
) -> Result<(), CliError> {
    let report = state.report();
    if !report.is_complete() && !allow_partial {
        let message = if report.people.is_empty() {
            "nobody has been assigned any items".to_string()
        } else {
            format!("{} item(s) are still unassigned", report.unassigned.len())
        };
        return Err(CliError {
            code: EXIT_EXPORT_INCOMPLETE,
            message,
            hint: Some("assign the remaining items or pass --allow-partial".to_string()),
        });
    }

    let rendered = render(&report, format)?;
    match output {
        Some(path) => {
            std::fs::write(&path, rendered)
                .map_err(|e| CliError::io(format!("{}: {}", path.display(), e)))?;
            log::info!("wrote {:?} export to {}", format, path.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(rendered.as_bytes())
                .map_err(|e| CliError::io(e.to_string()))?;
        }
    }
    Ok(())
}

pub fn render(report: &BillReport, format: ExportFormat) -> Result<String, CliError> {
    match format {
        ExportFormat::Text => Ok(render_text(report)),
        ExportFormat::Csv => render_csv(report),
        ExportFormat::Json => render_json(report),
    }
}

pub fn render_json(report: &BillReport) -> Result<String, CliError> {
    let mut json = serde_json::to_string_pretty(report)
        .map_err(|e| CliError::format(format!("JSON serialization failed: {}", e)))?;
    json.push('\n');
    Ok(json)
}

fn percent(rate: Decimal) -> String {
    format!("{}%", rate.normalize())
}

/// Per-person block, shared with `tabsplit summary`.
pub fn person_block(p: &PersonSummary) -> String {
    let mut out = String::new();
    out.push_str(&p.name);
    out.push('\n');
    out.push_str(&format!("Tax: {}, Tip: {}\n", percent(p.tax_rate), percent(p.tip_rate)));
    for item in &p.items {
        out.push_str("  ");
        out.push_str(&ledger_line(&item.description, &format_money(item.price), TEXT_WIDTH - 2));
        out.push('\n');
    }
    for (label, amount) in [
        ("Subtotal", p.subtotal),
        ("Tax", p.tax_amt),
        ("Tip", p.tip_amt),
        ("Total", p.total),
    ] {
        out.push_str("  ");
        out.push_str(&ledger_line(label, &format_money(amount), TEXT_WIDTH - 2));
        out.push('\n');
    }
    out
}

pub fn render_text(report: &BillReport) -> String {
    let mut out = String::new();
    for person in &report.people {
        out.push_str(&person_block(person));
        out.push('\n');
    }
    out.push_str(&ledger_line("GRAND TOTAL", &format_money(report.grand_total), TEXT_WIDTH));
    out.push('\n');
    out.push_str(&format!(
        "Effective tip percentage: {}%\n",
        report.effective_tip_percent
    ));
    if !report.unassigned.is_empty() {
        out.push_str(&format!("\nUnassigned ({}):\n", report.unassigned.len()));
        for item in &report.unassigned {
            out.push_str("  ");
            out.push_str(&ledger_line(&item.description, &format_money(item.price), TEXT_WIDTH - 2));
            out.push('\n');
        }
    }
    out
}

#[derive(Serialize)]
struct CsvRow<'a> {
    name: &'a str,
    items: String,
    tax_rate: Option<Decimal>,
    tip_rate: Option<Decimal>,
    subtotal: Decimal,
    tax: Decimal,
    tip: Decimal,
    total: Decimal,
}

/// One row per person, then a `TOTAL` row.
pub fn render_csv(report: &BillReport) -> Result<String, CliError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    let csv_err = |e: csv::Error| CliError::format(format!("CSV write failed: {}", e));

    for p in &report.people {
        wtr.serialize(CsvRow {
            name: &p.name,
            items: p
                .items
                .iter()
                .map(|i| i.description.as_str())
                .collect::<Vec<_>>()
                .join("; "),
            tax_rate: Some(p.tax_rate),
            tip_rate: Some(p.tip_rate),
            subtotal: p.subtotal,
            tax: p.tax_amt,
            tip: p.tip_amt,
            total: p.total,
        })
        .map_err(csv_err)?;
    }
    wtr.serialize(CsvRow {
        name: "TOTAL",
        items: String::new(),
        tax_rate: None,
        tip_rate: None,
        subtotal: report.grand_subtotal,
        tax: report.grand_tax,
        tip: report.grand_tip,
        total: report.grand_total,
    })
    .map_err(csv_err)?;

    let bytes = wtr
        .into_inner()
        .map_err(|e| CliError::format(format!("CSV write failed: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| CliError::format(e.to_string()))
}
