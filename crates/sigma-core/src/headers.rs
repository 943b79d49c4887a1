//! Month/metric header recognition.
//!
//! Monthly columns follow `MMM/AA - <metric>` (`JUN/25 - Valor`), with a
//! numeric fallback `AAAA-MM - <metric>` (`2026-02 - Valor`). Everything else
//! is an ordinary descriptive column.

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use crate::collation::sort_pt;
use crate::models::MonthDescriptor;

/// Portuguese month abbreviations, January first.
pub const MONTHS_PT: [&str; 12] = [
    "JAN", "FEV", "MAR", "ABR", "MAI", "JUN", "JUL", "AGO", "SET", "OUT", "NOV", "DEZ",
];

/// Canonical name of the monetary metric.
pub const METRIC_AMOUNT: &str = "Valor";
/// Canonical name of the hours metric.
pub const METRIC_HOURS: &str = "Hora";
/// Canonical name of the payment-date metric.
pub const METRIC_PAYMENT_DATE: &str = "Dt Pgto";

// ── Parsed header ─────────────────────────────────────────────────────────────

/// A header recognised as one month of one metric.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthHeader {
    pub key: String,
    pub label: String,
    pub month: u32,
    pub year: i32,
    pub metric: String,
    /// The header exactly as it appears in the sheet (trimmed).
    pub source_header: String,
}

/// Outcome of a single matcher.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderMatch {
    Matched(MonthHeader),
    NoMatch,
}

// ── Matchers ──────────────────────────────────────────────────────────────────

/// One header convention. Matchers are tried in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderMatcher {
    /// `JUN/25 - Valor`.
    Abbreviated,
    /// `2026-02 - Valor` or `2026/02 - Valor`.
    Numeric,
}

fn abbreviated_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(JAN|FEV|MAR|ABR|MAI|JUN|JUL|AGO|SET|OUT|NOV|DEZ)\s*/\s*(\d{2})\s*-\s*(.+)$")
            .expect("regex is valid")
    })
}

fn numeric_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(20\d{2})\s*[-/]\s*(\d{2})\s*-\s*(.+)$").expect("regex is valid")
    })
}

impl HeaderMatcher {
    /// Try this convention against an already-normalised header.
    pub fn apply(&self, normalized: &str, source: &str) -> HeaderMatch {
        match self {
            HeaderMatcher::Abbreviated => {
                let Some(caps) = abbreviated_re().captures(normalized) else {
                    return HeaderMatch::NoMatch;
                };
                let mon = &caps[1];
                let Some(idx) = MONTHS_PT.iter().position(|m| *m == mon) else {
                    return HeaderMatch::NoMatch;
                };
                let Ok(yy) = caps[2].parse::<i32>() else {
                    return HeaderMatch::NoMatch;
                };
                build_match(idx as u32 + 1, 2000 + yy, &caps[3], source)
            }
            HeaderMatcher::Numeric => {
                let Some(caps) = numeric_re().captures(normalized) else {
                    return HeaderMatch::NoMatch;
                };
                let (Ok(year), Ok(month)) = (caps[1].parse::<i32>(), caps[2].parse::<u32>())
                else {
                    return HeaderMatch::NoMatch;
                };
                if !(1..=12).contains(&month) {
                    return HeaderMatch::NoMatch;
                }
                build_match(month, year, &caps[3], source)
            }
        }
    }
}

fn build_match(month: u32, year: i32, metric_raw: &str, source: &str) -> HeaderMatch {
    let metric = normalize_metric_name(metric_raw);
    if metric.is_empty() {
        return HeaderMatch::NoMatch;
    }
    HeaderMatch::Matched(MonthHeader {
        key: month_key(year, month),
        label: month_label(year, month),
        month,
        year,
        metric,
        source_header: source.to_string(),
    })
}

// ── HeaderParser ──────────────────────────────────────────────────────────────

/// Runs an ordered list of [`HeaderMatcher`]s and stops at the first hit.
#[derive(Debug, Clone)]
pub struct HeaderParser {
    matchers: Vec<HeaderMatcher>,
}

impl Default for HeaderParser {
    fn default() -> Self {
        Self {
            matchers: vec![HeaderMatcher::Abbreviated, HeaderMatcher::Numeric],
        }
    }
}

impl HeaderParser {
    pub fn new(matchers: Vec<HeaderMatcher>) -> Self {
        Self { matchers }
    }

    /// Classify `header`. `None` means an ordinary descriptive column.
    pub fn parse(&self, header: &str) -> Option<MonthHeader> {
        let source = header.trim();
        let normalized = normalize_header(source);
        if normalized.is_empty() {
            return None;
        }
        self.matchers
            .iter()
            .find_map(|m| match m.apply(&normalized, source) {
                HeaderMatch::Matched(h) => Some(h),
                HeaderMatch::NoMatch => None,
            })
    }
}

/// Convenience wrapper around the default parser.
///
/// # Examples
///
/// ```
/// use sigma_core::headers::parse_month_header;
///
/// let h = parse_month_header("JUN/25 - Valor").unwrap();
/// assert_eq!(h.key, "2025-06");
/// assert_eq!(h.label, "JUN/25");
/// assert_eq!(h.metric, "Valor");
/// assert!(parse_month_header("Nome").is_none());
/// ```
pub fn parse_month_header(header: &str) -> Option<MonthHeader> {
    HeaderParser::default().parse(header)
}

// ── Normalisation helpers ─────────────────────────────────────────────────────

/// Uppercase, trim and collapse runs of whitespace to one space.
pub fn normalize_header(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Map raw metric text onto its canonical name.
///
/// Known synonyms collapse to `Valor`, `Hora` and `Dt Pgto`; anything else is
/// title-cased (first letter upper, the rest lower).
pub fn normalize_metric_name(raw: &str) -> String {
    let m = normalize_header(raw);
    if m.is_empty() {
        return String::new();
    }
    if m.contains("VALOR") {
        return METRIC_AMOUNT.to_string();
    }
    if m.contains("HORA") {
        return METRIC_HOURS.to_string();
    }
    if ["DT PGTO", "DT. PGTO", "DATA PGTO", "PAGTO"]
        .iter()
        .any(|p| m.contains(p))
    {
        return METRIC_PAYMENT_DATE.to_string();
    }
    let lower = m.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `YYYY-MM`.
pub fn month_key(year: i32, month: u32) -> String {
    format!("{:04}-{:02}", year, month)
}

/// `MMM/YY` using the Portuguese abbreviation.
pub fn month_label(year: i32, month: u32) -> String {
    let abbr = MONTHS_PT
        .get(month.saturating_sub(1) as usize)
        .copied()
        .unwrap_or("???");
    format!("{}/{:02}", abbr, year.rem_euclid(100))
}

// ── MonthIndexBuilder ─────────────────────────────────────────────────────────

/// Everything derived from one pass over the headers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthIndex {
    /// Distinct months, ascending by key.
    pub months: Vec<MonthDescriptor>,
    /// Distinct metric names, pt-BR ordered.
    pub metrics: Vec<String>,
    /// Headers recognised as month columns.
    pub month_headers: BTreeSet<String>,
}

impl MonthIndex {
    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }
}

/// Folds every header into a [`MonthIndex`].
#[derive(Debug, Clone, Default)]
pub struct MonthIndexBuilder {
    parser: HeaderParser,
}

impl MonthIndexBuilder {
    pub fn new(parser: HeaderParser) -> Self {
        Self { parser }
    }

    /// Scan all headers once, merging metrics of the same month.
    pub fn build<S: AsRef<str>>(&self, headers: &[S]) -> MonthIndex {
        let mut by_key: BTreeMap<String, MonthDescriptor> = BTreeMap::new();
        let mut metrics: BTreeSet<String> = BTreeSet::new();
        let mut month_headers = BTreeSet::new();

        for header in headers {
            let raw = header.as_ref();
            let Some(parsed) = self.parser.parse(raw) else {
                continue;
            };
            month_headers.insert(raw.to_string());
            metrics.insert(parsed.metric.clone());

            let entry = by_key
                .entry(parsed.key.clone())
                .or_insert_with(|| MonthDescriptor {
                    key: parsed.key.clone(),
                    label: parsed.label.clone(),
                    month: parsed.month,
                    year: parsed.year,
                    metrics: BTreeMap::new(),
                });
            entry.metrics.insert(parsed.metric, raw.to_string());
        }

        let mut metrics: Vec<String> = metrics.into_iter().collect();
        sort_pt(&mut metrics);

        tracing::debug!(
            months = by_key.len(),
            metrics = metrics.len(),
            "month index built"
        );

        MonthIndex {
            months: by_key.into_values().collect(),
            metrics,
            month_headers,
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
