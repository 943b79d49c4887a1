//! Brazilian number and date rendering for reports.

use chrono::{DateTime, TimeZone};

/// Format a number with `.` thousands separators and a `,` decimal mark.
///
/// # Examples
///
/// ```
/// use sigma_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5, 2), "1.234,50");
/// assert_eq!(format_number(1234567.0, 0), "1.234.567");
/// assert_eq!(format_number(-9876.5, 1), "-9.876,5");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    let fixed = format!("{:.prec$}", value.abs(), prec = decimals as usize);
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let grouped = group_thousands(int_part, '.');
    let body = match frac_part {
        Some(f) => format!("{},{}", grouped, f),
        None => grouped,
    };

    if value < 0.0 && body.chars().any(|c| c.is_ascii_digit() && c != '0') {
        format!("-{}", body)
    } else {
        body
    }
}

/// Money-style rendering with two decimals; `""` when the value is undefined.
///
/// # Examples
///
/// ```
/// use sigma_core::formatting::format_money;
///
/// assert_eq!(format_money(Some(1234.56)), "1.234,56");
/// assert_eq!(format_money(None), "");
/// ```
pub fn format_money(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format_number(v, 2),
        _ => String::new(),
    }
}

/// Fixed decimals with a comma decimal mark and no grouping.
///
/// # Examples
///
/// ```
/// use sigma_core::formatting::format_fixed;
///
/// assert_eq!(format_fixed(1234.5, 2), "1234,50");
/// assert_eq!(format_fixed(-0.12345, 4), "-0,1235");
/// ```
pub fn format_fixed(value: f64, decimals: u32) -> String {
    format!("{:.prec$}", value, prec = decimals as usize).replace('.', ",")
}

/// `Some` → [`format_fixed`], `None` → `""`.
pub fn format_fixed_opt(value: Option<f64>, decimals: u32) -> String {
    match value {
        Some(v) if v.is_finite() => format_fixed(v, decimals),
        _ => String::new(),
    }
}

/// The `μ ± 3σ` band rendered in money format; `""` if either part is missing.
pub fn format_sigma_band(mean: Option<f64>, sigma: Option<f64>) -> String {
    match (mean, sigma) {
        (Some(m), Some(s)) => format!("{} ± {}", format_number(m, 2), format_number(3.0 * s, 2)),
        _ => String::new(),
    }
}

/// `dd/mm/yyyy HH:MM:SS`, as used in report headers.
pub fn format_timestamp<Tz: TimeZone>(ts: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    ts.format("%d/%m/%Y %H:%M:%S").to_string()
}

/// Lowercase slug made of `[a-z0-9_]`, used in export file names.
pub fn slugify(s: &str) -> String {
    let folded = crate::collation::fold(s);
    let mut out = String::with_capacity(folded.len());
    let mut last_sep = true;
    for c in folded.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_sep = false;
        } else if !last_sep {
            out.push('_');
            last_sep = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// Insert `sep` every three digits from the right.
fn group_thousands(digits: &str, sep: char) -> String {
    let bytes = digits.as_bytes();
    let len = bytes.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, &b) in bytes.iter().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(b as char);
    }
    out
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    #[test]
    fn test_format_number_grouping() {
        assert_eq!(format_number(0.0, 2), "0,00");
        assert_eq!(format_number(999.999, 2), "1.000,00");
        assert_eq!(format_number(1_000_000.0, 2), "1.000.000,00");
        assert_eq!(format_number(12.0, 0), "12");
    }

    #[test]
    fn test_format_number_negative_zero_has_no_sign() {
        assert_eq!(format_number(-0.001, 2), "0,00");
        assert_eq!(format_number(-1234.5, 2), "-1.234,50");
    }

    #[test]
    fn test_format_money_undefined_is_blank() {
        assert_eq!(format_money(None), "");
        assert_eq!(format_money(Some(f64::NAN)), "");
    }

    #[test]
    fn test_format_fixed() {
        assert_eq!(format_fixed(2.0, 4), "2,0000");
        assert_eq!(format_fixed(0.0, 2), "0,00");
        assert_eq!(format_fixed_opt(None, 4), "");
    }

    #[test]
    fn test_format_sigma_band() {
        assert_eq!(format_sigma_band(Some(100.0), Some(10.0)), "100,00 ± 30,00");
        assert_eq!(format_sigma_band(Some(100.0), None), "");
    }

    #[test]
    fn test_format_timestamp() {
        let ts = Utc.from_utc_datetime(
            &NaiveDate::from_ymd_opt(2025, 6, 3)
                .unwrap()
                .and_hms_opt(14, 5, 9)
                .unwrap(),
        );
        assert_eq!(format_timestamp(&ts), "03/06/2025 14:05:09");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Valor"), "valor");
        assert_eq!(slugify("Dt Pgto"), "dt_pgto");
        assert_eq!(slugify("  Horas Extras 50% "), "horas_extras_50");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands("1", '.'), "1");
        assert_eq!(group_thousands("1234", '.'), "1.234");
        assert_eq!(group_thousands("123456", '.'), "123.456");
    }
}
