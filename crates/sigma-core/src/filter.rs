//! Narrowing and ordering of computed rows.
//!
//! Filters run in a fixed order: verba, free text, status, z bounds,
//! descriptive columns. The sort runs last and is stable.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::collation::compare_pt;
use crate::columns::FilterMode;
use crate::error::SigmaError;
use crate::models::{ComputedRow, Status};

// ── Sort keys ─────────────────────────────────────────────────────────────────

/// Column a result set can be ordered by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SortKey {
    Verba,
    GroupLabel,
    Code,
    Description,
    /// A month value, by label.
    Month(String),
    /// A descriptive column, by name.
    Extra(String),
    RefVal,
    Mean,
    Sigma,
    Lcl,
    Ucl,
    Z,
    Status,
}

impl SortKey {
    /// Keys that exist independently of the loaded sheet, in display order.
    pub const FIXED: [SortKey; 11] = [
        SortKey::Verba,
        SortKey::GroupLabel,
        SortKey::Code,
        SortKey::Description,
        SortKey::RefVal,
        SortKey::Mean,
        SortKey::Sigma,
        SortKey::Lcl,
        SortKey::Ucl,
        SortKey::Z,
        SortKey::Status,
    ];
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKey::Verba => f.write_str("verba"),
            SortKey::GroupLabel => f.write_str("grupo"),
            SortKey::Code => f.write_str("codigo"),
            SortKey::Description => f.write_str("descricao"),
            SortKey::Month(label) => write!(f, "m:{}", label),
            SortKey::Extra(col) => write!(f, "extra:{}", col),
            SortKey::RefVal => f.write_str("ref"),
            SortKey::Mean => f.write_str("media"),
            SortKey::Sigma => f.write_str("sigma"),
            SortKey::Lcl => f.write_str("lcl"),
            SortKey::Ucl => f.write_str("ucl"),
            SortKey::Z => f.write_str("z"),
            SortKey::Status => f.write_str("status"),
        }
    }
}

impl FromStr for SortKey {
    type Err = SigmaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(label) = s.strip_prefix("m:") {
            return Ok(SortKey::Month(label.to_uppercase()));
        }
        if let Some(col) = s.strip_prefix("extra:") {
            return Ok(SortKey::Extra(col.to_string()));
        }
        match s.to_lowercase().as_str() {
            "verba" | "verbakey" => Ok(SortKey::Verba),
            "grupo" | "group" | "grouplabel" => Ok(SortKey::GroupLabel),
            "codigo" | "código" | "code" => Ok(SortKey::Code),
            "descricao" | "descrição" | "desc" | "description" => Ok(SortKey::Description),
            "ref" | "refval" => Ok(SortKey::RefVal),
            "media" | "média" | "mean" | "mu" => Ok(SortKey::Mean),
            "sigma" | "σ" => Ok(SortKey::Sigma),
            "lcl" => Ok(SortKey::Lcl),
            "ucl" => Ok(SortKey::Ucl),
            "z" => Ok(SortKey::Z),
            "status" => Ok(SortKey::Status),
            _ => Err(SigmaError::Config(format!("unknown sort key '{}'", s))),
        }
    }
}

/// Comparable projection of one row for a [`SortKey`].
#[derive(Debug, Clone, PartialEq)]
pub enum SortValue {
    Number(f64),
    Text(String),
}

impl SortValue {
    fn as_text(&self) -> String {
        match self {
            SortValue::Number(n) => n.to_string(),
            SortValue::Text(s) => s.clone(),
        }
    }

    fn compare(&self, other: &SortValue) -> Ordering {
        match (self, other) {
            (SortValue::Number(a), SortValue::Number(b)) => {
                a.partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (SortValue::Text(a), SortValue::Text(b)) => compare_pt(a, b),
            _ => compare_pt(&self.as_text(), &other.as_text()),
        }
    }
}

fn number(v: Option<f64>) -> Option<SortValue> {
    v.filter(|n| n.is_finite()).map(SortValue::Number)
}

fn text(s: &str) -> Option<SortValue> {
    Some(SortValue::Text(s.trim().to_lowercase()))
}

/// Value of `row` under `key`; `None` is undefined and always sorts last.
pub fn sort_value(row: &ComputedRow, key: &SortKey) -> Option<SortValue> {
    match key {
        SortKey::Verba => text(&row.group.verba_key),
        SortKey::GroupLabel => text(&row.group_label),
        SortKey::Code => text(&row.group.code),
        SortKey::Description => text(&row.group.description),
        SortKey::Month(label) => number(row.group.values.get(label).copied()),
        SortKey::Extra(col) => text(row.descriptive(col)),
        SortKey::RefVal => number(Some(row.ref_val)),
        SortKey::Mean => number(row.mean),
        SortKey::Sigma => number(row.sigma),
        SortKey::Lcl => number(row.lcl),
        SortKey::Ucl => number(row.ucl),
        SortKey::Z => number(row.z),
        SortKey::Status => text(row.status.label()),
    }
}

// ── Sort state ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn reversed(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// Current sort column and direction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortState {
    pub key: Option<SortKey>,
    pub direction: SortDirection,
}

impl SortState {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self {
            key: Some(key),
            direction,
        }
    }

    /// Select `key`: the same key flips direction, a new key starts ascending.
    pub fn toggle(&mut self, key: SortKey) {
        if self.key.as_ref() == Some(&key) {
            self.direction = self.direction.reversed();
        } else {
            self.key = Some(key);
            self.direction = SortDirection::Ascending;
        }
    }

    /// Stable in-place sort; undefined values go last in either direction.
    pub fn apply(&self, rows: &mut [ComputedRow]) {
        let Some(key) = &self.key else {
            return;
        };
        let dir = self.direction;
        rows.sort_by(|a, b| {
            match (sort_value(a, key), sort_value(b, key)) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(va), Some(vb)) => {
                    let ord = va.compare(&vb);
                    match dir {
                        SortDirection::Ascending => ord,
                        SortDirection::Descending => ord.reverse(),
                    }
                }
            }
        });
    }
}

// ── Filters ───────────────────────────────────────────────────────────────────

/// A filter on one descriptive column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnFilter {
    pub column: String,
    pub mode: FilterMode,
    pub value: String,
}

impl ColumnFilter {
    pub fn equals(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            mode: FilterMode::Equals,
            value: value.into(),
        }
    }

    pub fn contains(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            mode: FilterMode::Contains,
            value: value.into(),
        }
    }

    /// `true` when the filter has no value and therefore keeps every row.
    pub fn is_inactive(&self) -> bool {
        self.value.trim().is_empty()
    }

    fn matches(&self, row: &ComputedRow) -> bool {
        let wanted = self.value.trim();
        let actual = row.descriptive(&self.column).trim();
        match self.mode {
            FilterMode::Equals => actual == wanted,
            FilterMode::Contains => actual.to_lowercase().contains(&wanted.to_lowercase()),
        }
    }
}

/// Every user-controlled narrowing criterion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowFilters {
    /// Exact `code - description` match.
    pub verba: Option<String>,
    /// Case-insensitive substring over the row's text fields.
    pub search: Option<String>,
    pub status: Option<Status>,
    pub min_z: Option<f64>,
    pub max_z: Option<f64>,
    pub columns: Vec<ColumnFilter>,
}

impl RowFilters {
    /// Drop filters on columns that are no longer present.
    pub fn retain_columns(&mut self, available: &[String]) {
        self.columns.retain(|f| available.contains(&f.column));
    }
}

fn haystack(row: &ComputedRow) -> String {
    let g = &row.group;
    let mut parts: Vec<&str> = vec![
        g.verba_key.as_str(),
        row.group_label.as_str(),
        g.code.as_str(),
        g.description.as_str(),
        row.status.label(),
    ];
    parts.extend(g.extras.values().map(String::as_str));
    parts.join(" ").to_lowercase()
}

// ── FilterSortPipeline ────────────────────────────────────────────────────────

/// Applies [`RowFilters`] then a [`SortState`].
#[derive(Debug, Clone, Default)]
pub struct FilterSortPipeline {
    pub filters: RowFilters,
    pub sort: SortState,
}

impl FilterSortPipeline {
    pub fn new(filters: RowFilters, sort: SortState) -> Self {
        Self { filters, sort }
    }

    /// Run every stage and return the surviving rows in order.
    pub fn apply(&self, mut rows: Vec<ComputedRow>) -> Vec<ComputedRow> {
        let before = rows.len();
        let f = &self.filters;

        if let Some(verba) = f.verba.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            rows.retain(|r| r.group.verba_key == verba);
        }

        if let Some(q) = f
            .search
            .as_deref()
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty())
        {
            rows.retain(|r| haystack(r).contains(&q));
        }

        if let Some(status) = f.status {
            rows.retain(|r| r.status == status);
        }

        if let Some(min) = f.min_z.filter(|v| v.is_finite()) {
            rows.retain(|r| r.z.is_some_and(|z| z >= min));
        }
        if let Some(max) = f.max_z.filter(|v| v.is_finite()) {
            rows.retain(|r| r.z.is_some_and(|z| z <= max));
        }

        for cf in f.columns.iter().filter(|c| !c.is_inactive()) {
            rows.retain(|r| cf.matches(r));
        }

        self.sort.apply(&mut rows);

        tracing::debug!(before, after = rows.len(), sort = ?self.sort.key, "rows filtered");
        rows
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Group;
    use std::collections::BTreeMap;

    fn row(code: &str, desc: &str, company: &str, z: Option<f64>, jun: Option<f64>) -> ComputedRow {
        let mut values = BTreeMap::new();
        if let Some(v) = jun {
            values.insert("JUN/25".to_string(), v);
        }
        let group = Group {
            key: format!("{code} - {desc}|{company}").to_uppercase(),
            verba_key: format!("{code} - {desc}"),
            code: code.to_string(),
            description: desc.to_string(),
            group_by: vec!["Empresa".to_string()],
            group_parts: vec![company.to_string()],
            extras: BTreeMap::from([("Nome".to_string(), format!("Pessoa {company}"))]),
            values,
        };
        ComputedRow {
            group_label: group.label(),
            group,
            month_values: vec![jun],
            ref_val: jun.unwrap_or(0.0),
            mean: z.map(|_| 100.0),
            sigma: z.map(|_| 10.0),
            lcl: z.map(|_| 70.0),
            ucl: z.map(|_| 130.0),
            z,
            status: Status::from_z(z),
        }
    }

    fn sample() -> Vec<ComputedRow> {
        vec![
            row("001", "SALARIO", "ACME", Some(0.5), Some(300.0)),
            row("002", "HORA EXTRA", "ACME", Some(2.5), None),
            row("001", "SALARIO", "Beta", Some(-4.0), Some(100.0)),
            row("003", "BONUS", "Beta", None, Some(200.0)),
        ]
    }

    fn codes(rows: &[ComputedRow]) -> Vec<String> {
        rows.iter()
            .map(|r| format!("{}/{}", r.group.code, r.group_label))
            .collect()
    }

    // ── filters ───────────────────────────────────────────────────────────────

    #[test]
    fn test_verba_filter_is_exact() {
        let p = FilterSortPipeline {
            filters: RowFilters {
                verba: Some("001 - SALARIO".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(codes(&p.apply(sample())), vec!["001/ACME", "001/Beta"]);
    }

    #[test]
    fn test_search_covers_status_and_extras() {
        let mut p = FilterSortPipeline::default();
        p.filters.search = Some("ALERTA".to_string());
        assert_eq!(codes(&p.apply(sample())), vec!["002/ACME"]);

        p.filters.search = Some("pessoa beta".to_string());
        assert_eq!(p.apply(sample()).len(), 2);
    }

    #[test]
    fn test_status_filter() {
        let mut p = FilterSortPipeline::default();
        p.filters.status = Some(Status::NoHistory);
        assert_eq!(codes(&p.apply(sample())), vec!["003/Beta"]);
    }

    #[test]
    fn test_z_bounds_drop_undefined_z() {
        let mut p = FilterSortPipeline::default();
        p.filters.min_z = Some(-10.0);
        let out = p.apply(sample());
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|r| r.z.is_some()));

        p.filters.max_z = Some(1.0);
        assert_eq!(codes(&p.apply(sample())), vec!["001/ACME", "001/Beta"]);
    }

    #[test]
    fn test_column_filters() {
        let mut p = FilterSortPipeline::default();
        p.filters.columns = vec![ColumnFilter::equals("Empresa", "Beta")];
        assert_eq!(p.apply(sample()).len(), 2);

        p.filters.columns = vec![ColumnFilter::contains("Nome", "ACM")];
        assert_eq!(p.apply(sample()).len(), 2);

        p.filters.columns = vec![ColumnFilter::equals("Empresa", "beta")];
        assert!(p.apply(sample()).is_empty());

        p.filters.columns = vec![ColumnFilter::equals("Empresa", "  ")];
        assert_eq!(p.apply(sample()).len(), 4);
    }

    #[test]
    fn test_status_counts_partition_filtered_rows() {
        let mut p = FilterSortPipeline::default();
        p.filters.search = Some("a".to_string());
        let out = p.apply(sample());
        let total: usize = Status::ALL
            .iter()
            .map(|s| out.iter().filter(|r| r.status == *s).count())
            .sum();
        assert_eq!(total, out.len());
    }

    #[test]
    fn test_retain_columns_drops_stale_filters() {
        let mut f = RowFilters {
            columns: vec![ColumnFilter::equals("Empresa", "x"), ColumnFilter::equals("Gone", "y")],
            ..Default::default()
        };
        f.retain_columns(&["Empresa".to_string()]);
        assert_eq!(f.columns.len(), 1);
    }

    // ── sorting ───────────────────────────────────────────────────────────────

    #[test]
    fn test_month_sort_toggles_and_keeps_undefined_last() {
        let mut p = FilterSortPipeline::default();
        p.sort.toggle(SortKey::Month("JUN/25".to_string()));
        assert_eq!(p.sort.direction, SortDirection::Ascending);
        assert_eq!(
            codes(&p.apply(sample())),
            vec!["001/Beta", "003/Beta", "001/ACME", "002/ACME"]
        );

        p.sort.toggle(SortKey::Month("JUN/25".to_string()));
        assert_eq!(p.sort.direction, SortDirection::Descending);
        assert_eq!(
            codes(&p.apply(sample())),
            vec!["001/ACME", "003/Beta", "001/Beta", "002/ACME"]
        );
    }

    #[test]
    fn test_new_key_resets_to_ascending() {
        let mut s = SortState::new(SortKey::Z, SortDirection::Descending);
        s.toggle(SortKey::Verba);
        assert_eq!(s.key, Some(SortKey::Verba));
        assert_eq!(s.direction, SortDirection::Ascending);
    }

    #[test]
    fn test_z_sort_undefined_last_descending() {
        let p = FilterSortPipeline::new(
            RowFilters::default(),
            SortState::new(SortKey::Z, SortDirection::Descending),
        );
        let out = p.apply(sample());
        let zs: Vec<Option<f64>> = out.iter().map(|r| r.z).collect();
        assert_eq!(zs, vec![Some(2.5), Some(0.5), Some(-4.0), None]);
    }

    #[test]
    fn test_text_sort_is_stable_and_collated() {
        let p = FilterSortPipeline::new(
            RowFilters::default(),
            SortState::new(SortKey::Description, SortDirection::Ascending),
        );
        assert_eq!(
            codes(&p.apply(sample())),
            vec!["003/Beta", "002/ACME", "001/ACME", "001/Beta"]
        );
    }

    #[test]
    fn test_extra_sort_reads_group_columns() {
        let p = FilterSortPipeline::new(
            RowFilters::default(),
            SortState::new(SortKey::Extra("Empresa".to_string()), SortDirection::Descending),
        );
        let out = p.apply(sample());
        assert_eq!(out[0].group_label, "Beta");
        assert_eq!(out[3].group_label, "ACME");
    }

    #[test]
    fn test_mixed_values_compare_as_text() {
        let a = SortValue::Number(10.0);
        let b = SortValue::Text("9".to_string());
        assert_eq!(a.compare(&b), Ordering::Less);
    }

    #[test]
    fn test_sort_key_parse_and_display() {
        for raw in ["verba", "grupo", "m:JUN/25", "extra:Nome", "ref", "media", "z", "status"] {
            let key: SortKey = raw.parse().unwrap();
            assert_eq!(key.to_string(), raw);
        }
        assert_eq!("m:jun/25".parse::<SortKey>().unwrap(), SortKey::Month("JUN/25".into()));
        assert!("nonsense".parse::<SortKey>().is_err());
    }
}
