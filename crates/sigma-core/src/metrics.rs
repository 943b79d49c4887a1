//! Selection of the metrics that behave as numeric quantities.

use regex::Regex;
use std::sync::OnceLock;

use crate::headers::METRIC_AMOUNT;
use crate::models::{MonthColumn, MonthDescriptor, RawTable};
use crate::number::parse_cell;

// ── Config ────────────────────────────────────────────────────────────────────

/// Sampling parameters for [`MetricSelector`].
#[derive(Debug, Clone)]
pub struct MetricSelectorConfig {
    /// How many leading records to inspect.
    pub sample_rows: usize,
    /// How many leading months to inspect.
    pub sample_months: usize,
    /// Minimum share of parseable cells for a metric to count as numeric.
    pub min_numeric_ratio: f64,
}

impl Default for MetricSelectorConfig {
    fn default() -> Self {
        Self {
            sample_rows: 80,
            sample_months: 8,
            min_numeric_ratio: 0.5,
        }
    }
}

// ── Scoring ───────────────────────────────────────────────────────────────────

/// Parse statistics for one metric over the sample.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NumericScore {
    pub attempted: usize,
    pub numeric: usize,
}

impl NumericScore {
    /// Share of attempted cells that parsed as numbers; `0.0` when nothing was attempted.
    pub fn ratio(&self) -> f64 {
        if self.attempted == 0 {
            0.0
        } else {
            self.numeric as f64 / self.attempted as f64
        }
    }
}

fn date_like_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(dt|data)\b|pgto").expect("regex is valid"))
}

/// `true` for metric names that denote dates rather than quantities.
pub fn is_date_like(metric: &str) -> bool {
    date_like_re().is_match(metric)
}

// ── MetricSelector ────────────────────────────────────────────────────────────

/// Decides which metrics are offered for analysis.
pub struct MetricSelector {
    config: MetricSelectorConfig,
}

impl MetricSelector {
    pub fn new(config: MetricSelectorConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(MetricSelectorConfig::default())
    }

    /// Count parseable cells of `metric` in the leading rows × months sample.
    pub fn score(&self, table: &RawTable, months: &[MonthDescriptor], metric: &str) -> NumericScore {
        let mut score = NumericScore::default();
        let columns: Vec<usize> = months
            .iter()
            .take(self.config.sample_months)
            .filter_map(|m| m.metrics.get(metric))
            .filter_map(|h| table.column_index(h))
            .collect();

        for row in 0..table.len().min(self.config.sample_rows) {
            for &col in &columns {
                score.attempted += 1;
                if parse_cell(table.cell(row, col)).is_some() {
                    score.numeric += 1;
                }
            }
        }
        score
    }

    /// Metrics usable as numeric sums, amount first.
    ///
    /// Never empty while `metrics` is non-empty: when nothing qualifies the
    /// amount metric (if present at all) or the first name is returned.
    pub fn select(
        &self,
        table: &RawTable,
        months: &[MonthDescriptor],
        metrics: &[String],
    ) -> Vec<String> {
        let mut kept: Vec<String> = Vec::new();
        for metric in metrics {
            if is_date_like(metric) {
                tracing::debug!(metric = %metric, "metric rejected as date-like");
                continue;
            }
            let score = self.score(table, months, metric);
            if score.attempted > 0 && score.ratio() >= self.config.min_numeric_ratio {
                kept.push(metric.clone());
            } else {
                tracing::warn!(
                    metric = %metric,
                    attempted = score.attempted,
                    numeric = score.numeric,
                    "metric dropped: too few numeric samples"
                );
            }
        }

        if let Some(pos) = kept.iter().position(|m| m == METRIC_AMOUNT) {
            let amount = kept.remove(pos);
            kept.insert(0, amount);
        }

        if kept.is_empty() {
            if metrics.iter().any(|m| m == METRIC_AMOUNT) {
                kept.push(METRIC_AMOUNT.to_string());
            } else if let Some(first) = metrics.first() {
                kept.push(first.clone());
            }
        }
        kept
    }
}

/// Choose the active metric among `options`.
///
/// Priority: `preferred` → `imported` → the amount metric → first option.
pub fn choose_metric(options: &[String], preferred: Option<&str>, imported: Option<&str>) -> Option<String> {
    let offered = |m: &str| options.iter().any(|o| o == m);
    preferred
        .filter(|m| offered(m))
        .or(imported.filter(|m| offered(m)))
        .map(str::to_string)
        .or_else(|| offered(METRIC_AMOUNT).then(|| METRIC_AMOUNT.to_string()))
        .or_else(|| options.first().cloned())
}

/// Project each month onto `metric`; months lacking it get `header: None`.
pub fn months_for_metric(months: &[MonthDescriptor], metric: &str) -> Vec<MonthColumn> {
    months
        .iter()
        .map(|m| MonthColumn {
            key: m.key.clone(),
            label: m.label.clone(),
            month: m.month,
            year: m.year,
            header: m.metrics.get(metric).cloned(),
        })
        .collect()
}

// ── Tests ──────────────────────────────────────────────────────────────────────
