//! Historical baseline and control limits per group.

use crate::models::{ComputedRow, Group, MonthColumn, Status};

// ── Basic statistics ──────────────────────────────────────────────────────────

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (denominator `n − 1`); `None` below two values.
///
/// # Examples
///
/// ```
/// use sigma_core::statistics::stdev_sample;
///
/// assert_eq!(stdev_sample(&[100.0]), None);
/// assert_eq!(stdev_sample(&[2.0, 4.0]), Some(2.0_f64.sqrt()));
/// ```
pub fn stdev_sample(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mu = mean(values)?;
    let var = values.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

// ── Parameters ────────────────────────────────────────────────────────────────

/// Knobs that change the baseline without rebuilding groups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatisticsParams {
    /// Month label under validation; `None` or unknown means the last month.
    pub reference: Option<String>,
    /// Most recent history months to keep; values below 2 mean unbounded.
    pub window: Option<usize>,
    /// Drop zero values from the history.
    pub ignore_zeros: bool,
}

impl StatisticsParams {
    /// The window actually applied, if any.
    pub fn effective_window(&self) -> Option<usize> {
        self.window.filter(|n| *n >= 2)
    }
}

/// Accept a raw window entry the way the input box does: floor, and ignore
/// anything below 2.
pub fn window_from_input(raw: f64) -> Option<usize> {
    if raw.is_finite() && raw >= 2.0 {
        Some(raw.floor() as usize)
    } else {
        None
    }
}

/// Index of `reference` in `months`, falling back to the last month.
pub fn reference_index(months: &[MonthColumn], reference: Option<&str>) -> Option<usize> {
    if months.is_empty() {
        return None;
    }
    reference
        .and_then(|label| months.iter().position(|m| m.label == label))
        .or(Some(months.len() - 1))
}

/// Label of the month the reference resolves to.
pub fn reference_label(months: &[MonthColumn], reference: Option<&str>) -> Option<String> {
    reference_index(months, reference).map(|i| months[i].label.clone())
}

// ── Per-month classification ──────────────────────────────────────────────────

/// Colour class of a single month value against the group baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellClass {
    Ok,
    Warn,
    Danger,
    /// Value or baseline missing, or zero spread.
    Na,
}

/// Classify one month value with the group's mean and sigma.
pub fn classify_value(value: Option<f64>, mean: Option<f64>, sigma: Option<f64>) -> CellClass {
    let (Some(v), Some(mu), Some(sd)) = (value, mean, sigma) else {
        return CellClass::Na;
    };
    if sd == 0.0 {
        return CellClass::Na;
    }
    match Status::from_z(Some((v - mu) / sd)) {
        Status::Acceptable => CellClass::Ok,
        Status::Warning => CellClass::Warn,
        _ => CellClass::Danger,
    }
}

// ── StatisticsEngine ──────────────────────────────────────────────────────────

/// Turns groups into [`ComputedRow`]s for one parameter set.
pub struct StatisticsEngine {
    params: StatisticsParams,
}

impl StatisticsEngine {
    pub fn new(params: StatisticsParams) -> Self {
        Self { params }
    }

    pub fn with_defaults() -> Self {
        Self::new(StatisticsParams::default())
    }

    pub fn params(&self) -> &StatisticsParams {
        &self.params
    }

    /// Eligible history values before the reference month, window applied.
    pub fn history(&self, values: &[Option<f64>], ref_idx: usize) -> Vec<f64> {
        let mut hist: Vec<f64> = values
            .iter()
            .take(ref_idx)
            .filter_map(|v| *v)
            .filter(|v| !(self.params.ignore_zeros && *v == 0.0))
            .collect();
        if let Some(n) = self.params.effective_window() {
            if hist.len() > n {
                hist.drain(..hist.len() - n);
            }
        }
        hist
    }

    /// Compute the statistics of one group.
    pub fn compute(&self, group: &Group, months: &[MonthColumn]) -> ComputedRow {
        let month_values: Vec<Option<f64>> = months
            .iter()
            .map(|m| group.values.get(&m.label).copied().filter(|v| v.is_finite()))
            .collect();

        let ref_idx = reference_index(months, self.params.reference.as_deref());
        let hist = ref_idx
            .map(|i| self.history(&month_values, i))
            .unwrap_or_default();

        let mu = mean(&hist);
        let sigma = stdev_sample(&hist);
        let ref_val = ref_idx
            .and_then(|i| month_values[i])
            .unwrap_or(0.0);

        let z = match (mu, sigma) {
            (Some(m), Some(s)) if s != 0.0 => Some((ref_val - m) / s),
            _ => None,
        };
        let (lcl, ucl) = match (mu, sigma) {
            (Some(m), Some(s)) => (Some(m - 3.0 * s), Some(m + 3.0 * s)),
            _ => (None, None),
        };

        ComputedRow {
            group_label: group.label(),
            group: group.clone(),
            month_values,
            ref_val,
            mean: mu,
            sigma,
            lcl,
            ucl,
            z,
            status: Status::from_z(z),
        }
    }

    /// Compute every group, preserving input order.
    pub fn compute_all(&self, groups: &[Group], months: &[MonthColumn]) -> Vec<ComputedRow> {
        let rows: Vec<ComputedRow> = groups.iter().map(|g| self.compute(g, months)).collect();
        tracing::debug!(
            rows = rows.len(),
            reference = ?self.params.reference,
            window = ?self.params.effective_window(),
            ignore_zeros = self.params.ignore_zeros,
            "statistics computed"
        );
        rows
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
