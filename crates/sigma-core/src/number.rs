//! Locale-tolerant number parsing for spreadsheet cells.
//!
//! Payroll sheets mix Brazilian (`1.234,56`) and English (`1,234.56`)
//! conventions, often within the same file. A value that cannot be read as a
//! finite number is *absent*, never zero.

use crate::models::CellValue;

/// Parse a cell into a finite number.
///
/// # Examples
///
/// ```
/// use sigma_core::models::CellValue;
/// use sigma_core::number::parse_cell;
///
/// assert_eq!(parse_cell(&CellValue::Number(7.5)), Some(7.5));
/// assert_eq!(parse_cell(&CellValue::Text("1.234,56".into())), Some(1234.56));
/// assert_eq!(parse_cell(&CellValue::Empty), None);
/// ```
pub fn parse_cell(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Number(n) if n.is_finite() => Some(*n),
        CellValue::Number(_) => None,
        CellValue::Text(s) => parse_number(s),
        CellValue::Empty => None,
    }
}

/// Parse free text into a finite number.
///
/// All whitespace is stripped first. When both `,` and `.` appear, whichever
/// comes last is the decimal separator and the other is dropped. A lone comma
/// is the decimal separator; otherwise commas are thousands separators.
pub fn parse_number(raw: &str) -> Option<f64> {
    let s: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if s.is_empty() {
        return None;
    }

    let last_comma = s.rfind(',');
    let last_dot = s.rfind('.');

    let normalized = match (last_comma, last_dot) {
        (Some(c), Some(d)) if c > d => s.replace('.', "").replacen(',', ".", 1),
        (Some(_), Some(_)) => s.replace(',', ""),
        (Some(_), None) => s.replacen(',', ".", 1),
        _ => s.replace(',', ""),
    };

    normalized.parse::<f64>().ok().filter(|n| n.is_finite())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
