//! Report exports: pipe-delimited text, xlsx and csv.
//!
//! All writers take the already filtered and sorted rows; nothing here
//! recomputes statistics.

use std::path::Path;

use chrono::{DateTime, Local, NaiveDate};
use rust_xlsxwriter::{Format, Workbook};
use sigma_core::error::{Result, SigmaError};
use sigma_core::formatting::{
    format_fixed, format_fixed_opt, format_money, format_sigma_band, format_timestamp, slugify,
};
use sigma_core::models::{ComputedRow, MonthColumn};
use tracing::info;

/// First line of the text report.
pub const REPORT_TITLE: &str = "IGARAPE DIGITAL | VALIDACAO DE FOLHA POR VERBA | 6 SIGMA";

const FILE_PREFIX: &str = "igarape_verbas_sigma";
const XLSX_SHEET: &str = "Export";
const MONEY_FORMAT: &str = "#,##0.00";
const Z_FORMAT: &str = "0.00";

// ── Context ───────────────────────────────────────────────────────────────────

/// Where the data came from, printed in the text report header.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub generated_at: DateTime<Local>,
    pub source_file: Option<String>,
    pub sheet: Option<String>,
    pub metric: Option<String>,
}

impl ReportContext {
    pub fn now() -> Self {
        Self {
            generated_at: Local::now(),
            source_file: None,
            sheet: None,
            metric: None,
        }
    }
}

// ── File names ────────────────────────────────────────────────────────────────

/// `igarape_verbas_sigma_<date>.txt`
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use sigma_data::export::txt_file_name;
///
/// let d = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
/// assert_eq!(txt_file_name(d), "igarape_verbas_sigma_2025-06-30.txt");
/// ```
pub fn txt_file_name(date: NaiveDate) -> String {
    format!("{}_{}.txt", FILE_PREFIX, date.format("%Y-%m-%d"))
}

/// `igarape_verbas_sigma_<metric-slug>_<date>.xlsx`, or
/// `igarape_verbas_sigma_export_<date>.xlsx` without a metric.
pub fn xlsx_file_name(metric: Option<&str>, date: NaiveDate) -> String {
    let slug = metric.map(slugify).filter(|s| !s.is_empty());
    match slug {
        Some(slug) => format!("{}_{}_{}.xlsx", FILE_PREFIX, slug, date.format("%Y-%m-%d")),
        None => format!("{}_export_{}.xlsx", FILE_PREFIX, date.format("%Y-%m-%d")),
    }
}

// ── Plain text ────────────────────────────────────────────────────────────────

/// Render the pipe-delimited report.
pub fn render_txt(
    rows: &[ComputedRow],
    months: &[MonthColumn],
    visible: &[String],
    ctx: &ReportContext,
) -> String {
    let mut lines: Vec<String> = vec![
        REPORT_TITLE.to_string(),
        format!("Gerado em: {}", format_timestamp(&ctx.generated_at)),
    ];
    if let Some(f) = &ctx.source_file {
        lines.push(format!("Arquivo: {}", f));
    }
    if let Some(s) = &ctx.sheet {
        lines.push(format!("Aba: {}", s));
    }
    if let Some(m) = &ctx.metric {
        lines.push(format!("Métrica: {}", m));
    }
    lines.push(String::new());

    let mut header: Vec<String> = vec!["Verba".into(), "Grupo".into()];
    header.extend(visible.iter().cloned());
    header.extend(
        ["Ref", "Media", "Sigma", "LCL", "UCL", "Z", "Status", "Faixa"]
            .iter()
            .map(|s| s.to_string()),
    );
    header.extend(months.iter().map(|m| m.label.clone()));
    lines.push(header.join(" | "));
    lines.push(String::new());

    for row in rows {
        let mut cells: Vec<String> = vec![row.verba_key().to_string(), row.group_label.clone()];
        cells.extend(visible.iter().map(|c| row.descriptive(c).to_string()));
        cells.push(format_money(Some(row.ref_val)));
        cells.push(format_money(row.mean));
        cells.push(format_money(row.sigma));
        cells.push(format_money(row.lcl));
        cells.push(format_money(row.ucl));
        cells.push(format_fixed_opt(row.z, 4));
        cells.push(row.status.label().to_string());
        cells.push(format_sigma_band(row.mean, row.sigma));
        cells.extend(
            (0..months.len())
                .map(|i| format_fixed(row.month_values.get(i).copied().flatten().unwrap_or(0.0), 2)),
        );
        lines.push(cells.join(" | "));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

pub fn write_txt(
    path: &Path,
    rows: &[ComputedRow],
    months: &[MonthColumn],
    visible: &[String],
    ctx: &ReportContext,
) -> Result<()> {
    std::fs::write(path, render_txt(rows, months, visible, ctx))?;
    info!(path = %path.display(), rows = rows.len(), "text report written");
    Ok(())
}

// ── Tabular ───────────────────────────────────────────────────────────────────

/// One exported cell, before it is handed to a concrete writer.
#[derive(Debug, Clone, PartialEq)]
pub enum TabularCell {
    Text(String),
    Money(f64),
    Z(f64),
    Blank,
}

/// Header of the xlsx/csv export.
pub fn tabular_header(descriptive: &[String], months: &[MonthColumn]) -> Vec<String> {
    let mut header: Vec<String> = ["Verba", "Grupo", "Ref", "Media", "Sigma", "LCL", "UCL", "Z", "Status"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    header.extend(descriptive.iter().cloned());
    header.extend(months.iter().map(|m| m.label.clone()));
    header
}

/// One row of the xlsx/csv export, aligned with [`tabular_header`].
pub fn tabular_row(row: &ComputedRow, descriptive: &[String], months: &[MonthColumn]) -> Vec<TabularCell> {
    let money = |v: Option<f64>| v.map(TabularCell::Money).unwrap_or(TabularCell::Blank);
    let mut cells = vec![
        TabularCell::Text(row.verba_key().to_string()),
        TabularCell::Text(row.group_label.clone()),
        TabularCell::Money(row.ref_val),
        money(row.mean),
        money(row.sigma),
        money(row.lcl),
        money(row.ucl),
        row.z
            .map(|z| TabularCell::Z((z * 1e6).round() / 1e6))
            .unwrap_or(TabularCell::Blank),
        TabularCell::Text(row.status.label().to_string()),
    ];
    cells.extend(
        descriptive
            .iter()
            .map(|c| TabularCell::Text(row.descriptive(c).to_string())),
    );
    cells.extend(
        (0..months.len())
            .map(|i| TabularCell::Money(row.month_values.get(i).copied().flatten().unwrap_or(0.0))),
    );
    cells
}

/// Write an xlsx workbook, or a csv file when `path` ends in `.csv`.
pub fn write_tabular(
    path: &Path,
    rows: &[ComputedRow],
    months: &[MonthColumn],
    descriptive: &[String],
) -> Result<()> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if is_csv {
        write_csv(path, rows, months, descriptive)
    } else {
        write_xlsx(path, rows, months, descriptive)
    }
}

pub fn write_xlsx(
    path: &Path,
    rows: &[ComputedRow],
    months: &[MonthColumn],
    descriptive: &[String],
) -> Result<()> {
    let xlsx_err = |e: rust_xlsxwriter::XlsxError| SigmaError::Export(e.to_string());

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(XLSX_SHEET).map_err(xlsx_err)?;

    let bold = Format::new().set_bold();
    let money = Format::new().set_num_format(MONEY_FORMAT);
    let zfmt = Format::new().set_num_format(Z_FORMAT);

    for (c, h) in tabular_header(descriptive, months).iter().enumerate() {
        sheet
            .write_string_with_format(0, c as u16, h, &bold)
            .map_err(xlsx_err)?;
    }

    for (r, row) in rows.iter().enumerate() {
        let r32 = (r + 1) as u32;
        for (c, cell) in tabular_row(row, descriptive, months).into_iter().enumerate() {
            let c16 = c as u16;
            match cell {
                TabularCell::Text(s) => {
                    sheet.write_string(r32, c16, s).map_err(xlsx_err)?;
                }
                TabularCell::Money(n) => {
                    sheet
                        .write_number_with_format(r32, c16, n, &money)
                        .map_err(xlsx_err)?;
                }
                TabularCell::Z(n) => {
                    sheet
                        .write_number_with_format(r32, c16, n, &zfmt)
                        .map_err(xlsx_err)?;
                }
                TabularCell::Blank => {}
            }
        }
    }

    sheet.set_freeze_panes(1, 0).map_err(xlsx_err)?;
    workbook.save(path).map_err(xlsx_err)?;
    info!(path = %path.display(), rows = rows.len(), "xlsx export written");
    Ok(())
}

pub fn write_csv(
    path: &Path,
    rows: &[ComputedRow],
    months: &[MonthColumn],
    descriptive: &[String],
) -> Result<()> {
    let csv_err = |e: csv::Error| SigmaError::Export(e.to_string());

    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    writer
        .write_record(tabular_header(descriptive, months))
        .map_err(csv_err)?;
    for row in rows {
        let record: Vec<String> = tabular_row(row, descriptive, months)
            .into_iter()
            .map(|cell| match cell {
                TabularCell::Text(s) => s,
                TabularCell::Money(n) | TabularCell::Z(n) => n.to_string(),
                TabularCell::Blank => String::new(),
            })
            .collect();
        writer.write_record(&record).map_err(csv_err)?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = rows.len(), "csv export written");
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
