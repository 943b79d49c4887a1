use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::SigmaError;

// ── Raw cells ─────────────────────────────────────────────────────────────────

/// A single spreadsheet cell as it came out of the decoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    /// A native numeric cell.
    Number(f64),
    /// Any textual content (including dates rendered as text).
    Text(String),
    /// A blank cell.
    #[default]
    Empty,
}

impl CellValue {
    /// Trimmed textual rendering of the cell; `""` for blanks.
    ///
    /// Whole numbers print without a fractional part, so `123.0` becomes `"123"`.
    pub fn text(&self) -> String {
        match self {
            CellValue::Number(n) if n.is_finite() => n.to_string(),
            CellValue::Number(_) => String::new(),
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Empty => String::new(),
        }
    }

    /// `true` when the cell carries no visible content.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s.to_string())
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

// ── RawTable ──────────────────────────────────────────────────────────────────

/// Imported rows together with the ordered column list computed at import.
///
/// Every row is aligned with `columns`; short rows are treated as padded with
/// [`CellValue::Empty`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl RawTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self { columns, rows }
    }

    /// Position of `name` in the column list.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at `row` / `col`, or an empty cell when out of range.
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    /// Trimmed text of the named column in `row`; `""` when the column is unknown.
    pub fn text(&self, row: usize, column: &str) -> String {
        match self.column_index(column) {
            Some(col) => self.cell(row, col).text(),
            None => String::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ── Months ────────────────────────────────────────────────────────────────────

/// One calendar month found in the headers, with every metric it carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthDescriptor {
    /// Sortable key, `YYYY-MM`.
    pub key: String,
    /// Display label, `MMM/YY`.
    pub label: String,
    pub month: u32,
    pub year: i32,
    /// Metric name → source column header.
    pub metrics: BTreeMap<String, String>,
}

/// A month projected onto the active metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthColumn {
    pub key: String,
    pub label: String,
    pub month: u32,
    pub year: i32,
    /// Source column for the active metric, `None` when that month lacks it.
    pub header: Option<String>,
}

// ── Groups ────────────────────────────────────────────────────────────────────

/// Placeholder label for rows aggregated without any grouping column value.
pub const NO_GROUP_LABEL: &str = "(Sem grupo)";

/// Aggregation unit: one verba combined with one value per grouping column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Case-normalised identity (`VERBA|PART1|PART2...`).
    pub key: String,
    /// `code - description` as shown to the user.
    pub verba_key: String,
    pub code: String,
    pub description: String,
    /// Grouping columns the group was built with.
    pub group_by: Vec<String>,
    /// Value of each grouping column, aligned with `group_by`.
    pub group_parts: Vec<String>,
    /// First-seen values of the descriptive columns that are not grouping columns.
    pub extras: BTreeMap<String, String>,
    /// Month label → summed metric value.
    pub values: BTreeMap<String, f64>,
}

impl Group {
    /// Non-empty group parts joined with `" | "`, or [`NO_GROUP_LABEL`].
    pub fn label(&self) -> String {
        let parts: Vec<&str> = self
            .group_parts
            .iter()
            .map(|p| p.as_str())
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            NO_GROUP_LABEL.to_string()
        } else {
            parts.join(" | ")
        }
    }

    /// Value of a descriptive column, looking in grouping columns as well.
    pub fn descriptive(&self, column: &str) -> &str {
        if let Some(v) = self.extras.get(column) {
            return v;
        }
        self.group_by
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.group_parts.get(i))
            .map(|s| s.as_str())
            .unwrap_or("")
    }
}

// ── Status ────────────────────────────────────────────────────────────────────

/// Classification of a reference value against its history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// `|z| ≤ 2`.
    Acceptable,
    /// `2 < |z| ≤ 3`.
    Warning,
    /// `|z| > 3`.
    OutOfRange,
    /// No usable history or zero spread.
    NoHistory,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Acceptable,
        Status::Warning,
        Status::OutOfRange,
        Status::NoHistory,
    ];

    /// Portuguese label used in reports and filters.
    pub fn label(&self) -> &'static str {
        match self {
            Status::Acceptable => "Aceitável",
            Status::Warning => "Alerta",
            Status::OutOfRange => "Fora",
            Status::NoHistory => "Sem histórico",
        }
    }

    /// Classify a z-score. `None` maps to [`Status::NoHistory`].
    pub fn from_z(z: Option<f64>) -> Self {
        match z {
            None => Status::NoHistory,
            Some(z) => {
                let a = z.abs();
                if a <= 2.0 {
                    Status::Acceptable
                } else if a <= 3.0 {
                    Status::Warning
                } else {
                    Status::OutOfRange
                }
            }
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Status {
    type Err = SigmaError;

    /// Accepts the Portuguese labels (accent optional) and the English names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_lowercase();
        match norm.as_str() {
            "aceitável" | "aceitavel" | "acceptable" | "ok" => Ok(Status::Acceptable),
            "alerta" | "warning" | "warn" => Ok(Status::Warning),
            "fora" | "out" | "outofrange" | "out-of-range" => Ok(Status::OutOfRange),
            "sem histórico" | "sem historico" | "nohistory" | "no-history" => {
                Ok(Status::NoHistory)
            }
            _ => Err(SigmaError::Config(format!("unknown status '{}'", s))),
        }
    }
}

// ── ComputedRow ───────────────────────────────────────────────────────────────

/// A group enriched with its statistics for the current parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedRow {
    pub group: Group,
    pub group_label: String,
    /// Per-month values aligned with the month list; `None` where absent.
    pub month_values: Vec<Option<f64>>,
    pub ref_val: f64,
    pub mean: Option<f64>,
    pub sigma: Option<f64>,
    pub lcl: Option<f64>,
    pub ucl: Option<f64>,
    pub z: Option<f64>,
    pub status: Status,
}

impl ComputedRow {
    pub fn verba_key(&self) -> &str {
        &self.group.verba_key
    }

    /// Descriptive column value for this row.
    pub fn descriptive(&self, column: &str) -> &str {
        self.group.descriptive(column)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
