//! Aggregate views over a filtered result set.

use std::collections::HashMap;

use crate::models::{ComputedRow, MonthColumn, Status};
use crate::statistics::{mean, stdev_sample};

// ── KPIs ──────────────────────────────────────────────────────────────────────

/// Headline counters for the current result set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Kpis {
    pub total: usize,
    pub acceptable: usize,
    pub warning: usize,
    pub out_of_range: usize,
    pub no_history: usize,
    /// Mean of the defined z-scores.
    pub mean_z: Option<f64>,
}

impl Kpis {
    pub fn from_rows(rows: &[ComputedRow]) -> Self {
        let count = |s: Status| rows.iter().filter(|r| r.status == s).count();
        let zs: Vec<f64> = rows.iter().filter_map(|r| r.z).collect();
        Self {
            total: rows.len(),
            acceptable: count(Status::Acceptable),
            warning: count(Status::Warning),
            out_of_range: count(Status::OutOfRange),
            no_history: count(Status::NoHistory),
            mean_z: mean(&zs),
        }
    }
}

// ── Month totals ──────────────────────────────────────────────────────────────

/// Colour class of a month total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalClass {
    Ok,
    Warn,
    /// Zero or non-finite total.
    Na,
}

/// Classify `value` against the non-zero entries of `series`.
///
/// Fewer than two non-zero entries, or zero spread, counts as `Ok`; only
/// `|z| > 2` is flagged.
pub fn classify_total(series: &[f64], value: f64) -> TotalClass {
    if !value.is_finite() || value == 0.0 {
        return TotalClass::Na;
    }
    let xs: Vec<f64> = series
        .iter()
        .copied()
        .filter(|x| x.is_finite() && *x != 0.0)
        .collect();
    let (Some(mu), Some(sd)) = (mean(&xs), stdev_sample(&xs)) else {
        return TotalClass::Ok;
    };
    if sd == 0.0 {
        return TotalClass::Ok;
    }
    if ((value - mu) / sd).abs() > 2.0 {
        TotalClass::Warn
    } else {
        TotalClass::Ok
    }
}

/// Per-month sums across all rows and across the flagged statuses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthTotals {
    pub labels: Vec<String>,
    pub all: Vec<f64>,
    pub out_of_range: Vec<f64>,
    pub warning: Vec<f64>,
}

impl MonthTotals {
    pub fn from_rows(rows: &[ComputedRow], months: &[MonthColumn]) -> Self {
        let n = months.len();
        let mut totals = MonthTotals {
            labels: months.iter().map(|m| m.label.clone()).collect(),
            all: vec![0.0; n],
            out_of_range: vec![0.0; n],
            warning: vec![0.0; n],
        };
        for row in rows {
            for (i, m) in months.iter().enumerate() {
                let v = row.group.values.get(&m.label).copied().unwrap_or(0.0);
                totals.all[i] += v;
                match row.status {
                    Status::OutOfRange => totals.out_of_range[i] += v,
                    Status::Warning => totals.warning[i] += v,
                    _ => {}
                }
            }
        }
        totals
    }

    /// Classes for the all-rows series.
    pub fn all_classes(&self) -> Vec<TotalClass> {
        self.all.iter().map(|v| classify_total(&self.all, *v)).collect()
    }

    /// Classes for the warning series.
    pub fn warning_classes(&self) -> Vec<TotalClass> {
        self.warning
            .iter()
            .map(|v| classify_total(&self.warning, *v))
            .collect()
    }
}

// ── Diagnostics ───────────────────────────────────────────────────────────────

/// One verba ranked by out-of-range rows.
#[derive(Debug, Clone, PartialEq)]
pub struct VerbaRank {
    pub verba_key: String,
    pub total: usize,
    pub out_of_range: usize,
}

/// Overview of what the import and the current parameters produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    pub group_count: usize,
    pub month_count: usize,
    pub group_by: Vec<String>,
    pub descriptive_count: usize,
    pub visible_count: usize,
    pub no_history: usize,
    pub out_of_range: usize,
    /// Up to five verbas with the most out-of-range rows.
    pub top_out_of_range: Vec<VerbaRank>,
}

impl Diagnostics {
    pub fn build(
        rows: &[ComputedRow],
        month_count: usize,
        group_by: &[String],
        descriptive_count: usize,
        visible_count: usize,
    ) -> Self {
        let mut order: Vec<String> = Vec::new();
        let mut by_verba: HashMap<String, VerbaRank> = HashMap::new();
        for r in rows {
            let key = if r.group.verba_key.trim().is_empty() {
                "Sem verba".to_string()
            } else {
                r.group.verba_key.clone()
            };
            let entry = by_verba.entry(key.clone()).or_insert_with(|| {
                order.push(key.clone());
                VerbaRank {
                    verba_key: key,
                    total: 0,
                    out_of_range: 0,
                }
            });
            entry.total += 1;
            if r.status == Status::OutOfRange {
                entry.out_of_range += 1;
            }
        }

        let mut ranks: Vec<VerbaRank> = order
            .into_iter()
            .filter_map(|k| by_verba.remove(&k))
            .collect();
        ranks.sort_by(|a, b| b.out_of_range.cmp(&a.out_of_range));
        ranks.truncate(5);

        Self {
            group_count: rows.len(),
            month_count,
            group_by: group_by.to_vec(),
            descriptive_count,
            visible_count,
            no_history: rows.iter().filter(|r| r.status == Status::NoHistory).count(),
            out_of_range: rows.iter().filter(|r| r.status == Status::OutOfRange).count(),
            top_out_of_range: ranks,
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
