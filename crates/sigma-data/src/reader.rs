//! Spreadsheet decoding into cell grids and header-keyed tables.
//!
//! Workbooks (xlsx, xlsm, xls, ods) go through calamine; delimited text
//! through the csv crate. Both end up as [`SheetGrid`]s, which
//! [`table_from_grid`] turns into a [`RawTable`] given a header row.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use calamine::{open_workbook_auto, Data, Reader};
use sigma_core::error::{Result, SigmaError};
use sigma_core::models::{CellValue, RawTable};
use tracing::{debug, warn};

// ── Types ─────────────────────────────────────────────────────────────────────

/// One worksheet as a rectangular-ish grid of cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetGrid {
    pub name: String,
    pub rows: Vec<Vec<CellValue>>,
}

/// Every sheet of a decoded file, in workbook order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkbookData {
    pub sheets: Vec<SheetGrid>,
}

impl WorkbookData {
    pub fn sheet(&self, name: &str) -> Option<&SheetGrid> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Decode `path`, choosing the backend from the file extension.
pub fn read_workbook(path: &Path) -> Result<WorkbookData> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "csv" | "txt" | "tsv" => {
            let bytes = std::fs::read(path).map_err(|source| SigmaError::FileRead {
                path: path.to_path_buf(),
                source,
            })?;
            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .filter(|s| !s.is_empty())
                .unwrap_or("csv")
                .to_string();
            let grid = read_csv_bytes(&name, &bytes)?;
            Ok(WorkbookData { sheets: vec![grid] })
        }
        _ => read_spreadsheet(path),
    }
}

/// Decode every worksheet of an xlsx/xls/ods file.
pub fn read_spreadsheet(path: &Path) -> Result<WorkbookData> {
    if !path.exists() {
        return Err(SigmaError::FileRead {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        });
    }

    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("failed to open workbook: {}", path.display()))
        .map_err(|e| SigmaError::Workbook(format!("{e:#}")))?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        match workbook.worksheet_range(&name) {
            Ok(range) => {
                let rows: Vec<Vec<CellValue>> = range
                    .rows()
                    .map(|r| r.iter().map(cell_from_data).collect())
                    .collect();
                debug!(sheet = %name, rows = rows.len(), "worksheet decoded");
                sheets.push(SheetGrid { name, rows });
            }
            Err(e) => {
                warn!(sheet = %name, error = %e, "skipping unreadable worksheet");
            }
        }
    }
    Ok(WorkbookData { sheets })
}

/// Decode delimited text. The delimiter (`;`, `,` or tab) is sniffed from the
/// first line; invalid UTF-8 is read as Latin-1.
pub fn read_csv_bytes(name: &str, bytes: &[u8]) -> Result<SheetGrid> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let delimiter = detect_delimiter(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.byte_records() {
        let record = record.map_err(|e| SigmaError::Csv(e.to_string()))?;
        rows.push(
            record
                .iter()
                .map(|field| CellValue::from(decode_field(field).as_str()))
                .collect(),
        );
    }
    debug!(rows = rows.len(), delimiter = %(delimiter as char), "csv decoded");
    Ok(SheetGrid {
        name: name.to_string(),
        rows,
    })
}

/// Pick the delimiter that occurs most often on the first line.
pub fn detect_delimiter(bytes: &[u8]) -> u8 {
    let first_line = bytes.split(|b| *b == b'\n').next().unwrap_or(&[]);
    [b';', b',', b'\t']
        .into_iter()
        .map(|d| (d, first_line.iter().filter(|b| **b == d).count()))
        .max_by_key(|(_, n)| *n)
        .filter(|(_, n)| *n > 0)
        .map(|(d, _)| d)
        .unwrap_or(b',')
}

/// Build a header-keyed table using row `header_row` as the header.
///
/// Header names are trimmed; blank ones become `__EMPTY`, `__EMPTY_1`, …
/// and repeats get `_1`, `_2`, … suffixes. Data rows with no visible content
/// are dropped, and every kept row is padded or cut to the header width.
pub fn table_from_grid(rows: &[Vec<CellValue>], header_row: usize) -> RawTable {
    let Some(header) = rows.get(header_row) else {
        return RawTable::default();
    };
    let columns = dedupe_headers(header);
    let width = columns.len();

    let data: Vec<Vec<CellValue>> = rows
        .iter()
        .skip(header_row + 1)
        .filter(|r| r.iter().take(width).any(|c| !c.is_blank()))
        .map(|r| {
            let mut row: Vec<CellValue> = r.iter().take(width).cloned().collect();
            row.resize(width, CellValue::Empty);
            row
        })
        .collect();

    RawTable::new(columns, data)
}

/// First sheet whose first row mentions a code column, else the first sheet.
pub fn detect_main_sheet(workbook: &WorkbookData) -> Option<&SheetGrid> {
    workbook
        .sheets
        .iter()
        .find(|s| {
            s.rows.first().is_some_and(|header| {
                let joined = header
                    .iter()
                    .map(CellValue::text)
                    .collect::<Vec<_>>()
                    .join(" | ")
                    .to_lowercase();
                joined.contains("código") || joined.contains("codigo")
            })
        })
        .or_else(|| workbook.sheets.first())
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Convert a calamine cell into the crate's cell model.
pub fn cell_from_data(cell: &Data) -> CellValue {
    match cell {
        Data::Float(v) => CellValue::Number(*v),
        Data::Int(v) => CellValue::Number(*v as f64),
        Data::String(v) => CellValue::from(v.as_str()),
        Data::Bool(v) => CellValue::Text(v.to_string()),
        Data::DateTime(v) => CellValue::Text(v.to_string()),
        Data::DateTimeIso(v) => CellValue::Text(v.to_string()),
        Data::DurationIso(v) => CellValue::Text(v.to_string()),
        Data::Error(v) => CellValue::Text(format!("{v:?}")),
        Data::Empty => CellValue::Empty,
    }
}

fn decode_field(field: &[u8]) -> String {
    match std::str::from_utf8(field) {
        Ok(s) => s.to_string(),
        Err(_) => field.iter().map(|b| *b as char).collect(),
    }
}

fn dedupe_headers(header: &[CellValue]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::with_capacity(header.len());
    for cell in header {
        let base = match cell.text() {
            t if t.is_empty() => "__EMPTY".to_string(),
            t => t,
        };
        let name = match seen.get(&base).copied() {
            None => base.clone(),
            Some(n) => {
                let mut k = n;
                let mut candidate = format!("{}_{}", base, k);
                while seen.contains_key(&candidate) {
                    k += 1;
                    candidate = format!("{}_{}", base, k);
                }
                seen.insert(base.clone(), k + 1);
                candidate
            }
        };
        seen.entry(base).or_insert(1);
        seen.insert(name.clone(), 1);
        out.push(name);
    }
    out
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn t(s: &str) -> CellValue {
        CellValue::from(s)
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter(b"a;b;c\n1;2;3"), b';');
        assert_eq!(detect_delimiter(b"a,b,c\n"), b',');
        assert_eq!(detect_delimiter(b"a\tb\n"), b'\t');
        assert_eq!(detect_delimiter(b"abc\n"), b',');
    }

    #[test]
    fn test_read_csv_semicolon_with_decimal_commas() {
        let csv = "Código;Descrição;JUN/25 - Valor\n001;SALARIO;\"1.234,56\"\n";
        let grid = read_csv_bytes("folha", csv.as_bytes()).unwrap();
        assert_eq!(grid.rows.len(), 2);
        assert_eq!(grid.rows[1][2], t("1.234,56"));
    }

    #[test]
    fn test_read_csv_strips_bom_and_decodes_latin1() {
        let mut bytes = b"\xEF\xBB\xBFCodigo;Descri".to_vec();
        bytes.extend_from_slice(&[0xE7, 0xE3]); // "çã" in Latin-1
        bytes.extend_from_slice(b"o\n1;x\n");
        let grid = read_csv_bytes("f", &bytes).unwrap();
        assert_eq!(grid.rows[0][0], t("Codigo"));
        assert_eq!(grid.rows[0][1], t("Descrição"));
    }

    #[test]
    fn test_table_from_grid_dedupes_and_pads() {
        let rows = vec![
            vec![t("Nome"), t(""), t("Nome"), t(" Nome "), t("")],
            vec![t("a"), t("b")],
            vec![CellValue::Empty, t("  ")],
            vec![t("c"), t("d"), t("e"), t("f"), t("g"), t("extra")],
        ];
        let table = table_from_grid(&rows, 0);
        assert_eq!(
            table.columns,
            vec!["Nome", "__EMPTY", "Nome_1", "Nome_2", "__EMPTY_1"]
        );
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].len(), 5);
        assert_eq!(table.rows[0][4], CellValue::Empty);
        assert_eq!(table.rows[1].len(), 5);
    }

    #[test]
    fn test_table_from_grid_header_offset() {
        let rows = vec![
            vec![t("RELATÓRIO DE VERBAS")],
            vec![],
            vec![t("Código"), t("Descrição")],
            vec![t("1"), t("SAL")],
        ];
        let table = table_from_grid(&rows, 2);
        assert_eq!(table.columns, vec!["Código", "Descrição"]);
        assert_eq!(table.len(), 1);
        assert!(table_from_grid(&rows, 10).columns.is_empty());
    }

    #[test]
    fn test_detect_main_sheet_prefers_code_header() {
        let wb = WorkbookData {
            sheets: vec![
                SheetGrid {
                    name: "Capa".to_string(),
                    rows: vec![vec![t("Relatório")]],
                },
                SheetGrid {
                    name: "Dados".to_string(),
                    rows: vec![vec![t("CÓDIGO"), t("Descrição")]],
                },
            ],
        };
        // uppercase accented text lowercases to "código"
        assert_eq!(detect_main_sheet(&wb).map(|s| s.name.as_str()), Some("Dados"));

        let wb = WorkbookData {
            sheets: vec![SheetGrid {
                name: "Only".to_string(),
                rows: vec![],
            }],
        };
        assert_eq!(detect_main_sheet(&wb).map(|s| s.name.as_str()), Some("Only"));
        assert!(detect_main_sheet(&WorkbookData::default()).is_none());
    }

    #[test]
    fn test_cell_from_data() {
        assert_eq!(cell_from_data(&Data::Int(3)), CellValue::Number(3.0));
        assert_eq!(cell_from_data(&Data::Float(1.5)), CellValue::Number(1.5));
        assert_eq!(cell_from_data(&Data::String(String::new())), CellValue::Empty);
        assert_eq!(cell_from_data(&Data::Bool(true)), t("true"));
        assert_eq!(cell_from_data(&Data::Empty), CellValue::Empty);
    }

    #[test]
    fn test_read_workbook_csv_from_disk() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("folha.csv");
        std::fs::write(&path, "Código,Descrição\n1,SAL\n").unwrap();
        let wb = read_workbook(&path).unwrap();
        assert_eq!(wb.sheets.len(), 1);
        assert_eq!(wb.sheets[0].name, "folha");
    }

    #[test]
    fn test_read_workbook_missing_file() {
        let tmp = TempDir::new().expect("tempdir");
        let err = read_workbook(&tmp.path().join("nada.xlsx")).unwrap_err();
        assert!(matches!(err, SigmaError::FileRead { .. }));
        let err = read_workbook(&tmp.path().join("nada.csv")).unwrap_err();
        assert!(matches!(err, SigmaError::FileRead { .. }));
    }
}
