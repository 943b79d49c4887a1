//! The validation session: single owner of all analysis state.
//!
//! A [`ValidationSession`] holds the imported dataset, the user's
//! selections and every derived collection. Each mutator names the earliest
//! [`Stage`] it invalidates and the session rebuilds from there onward, so
//! the rows returned by [`ValidationSession::rows`] are always consistent
//! with the current parameters.

use std::path::Path;

use sigma_core::columns::{default_filter_columns, default_visible, profile_filter_column, retain_existing, CategoricalConfig, FilterColumnProfile};
use sigma_core::error::{Result, SigmaError};
use sigma_core::filter::{FilterSortPipeline, RowFilters, SortKey, SortState};
use sigma_core::models::{ComputedRow, Group, MonthColumn};
use sigma_core::statistics::{reference_label, StatisticsEngine, StatisticsParams};
use sigma_core::summary::{Diagnostics, Kpis, MonthTotals};
use sigma_data::aggregator::GroupAggregator;
use sigma_data::export::{render_txt, write_tabular, write_txt, ReportContext};
use sigma_data::import::{DatasetImporter, ImportedDataset};
use sigma_data::store::{StateKey, StateStore};
use tracing::{debug, info, warn};

// ── Stage ─────────────────────────────────────────────────────────────────────

/// Pipeline stages, in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// Group records for the active metric and grouping columns.
    Aggregate,
    /// Statistics per group.
    Compute,
    /// Filters and sort over the computed rows.
    Filter,
}

// ── ValidationSession ─────────────────────────────────────────────────────────

pub struct ValidationSession {
    store: Option<StateStore>,
    importer: DatasetImporter,
    categorical: CategoricalConfig,

    dataset: Option<ImportedDataset>,
    aggregator: Option<GroupAggregator>,
    group_by: Vec<String>,
    visible: Vec<String>,
    months: Vec<MonthColumn>,
    params: StatisticsParams,
    pipeline: FilterSortPipeline,

    groups: Vec<Group>,
    computed: Vec<ComputedRow>,
    rows: Vec<ComputedRow>,
}

impl ValidationSession {
    /// A session persisting into `store`, or purely in memory when `None`.
    pub fn new(store: Option<StateStore>) -> Self {
        Self {
            store,
            importer: DatasetImporter::with_defaults(),
            categorical: CategoricalConfig::default(),
            dataset: None,
            aggregator: None,
            group_by: Vec::new(),
            visible: Vec::new(),
            months: Vec::new(),
            params: StatisticsParams::default(),
            pipeline: FilterSortPipeline::default(),
            groups: Vec::new(),
            computed: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(None)
    }

    // ── Loading ───────────────────────────────────────────────────────────

    /// Import a spreadsheet. On error the current state is left untouched.
    pub fn import_file(&mut self, path: &Path, sheet: Option<&str>) -> Result<()> {
        let preferred = self.store.as_ref().and_then(StateStore::load_metric);
        let dataset = self
            .importer
            .import_file(path, sheet, preferred.as_deref())?;
        self.install(dataset, true);
        Ok(())
    }

    /// Swap in an already assembled dataset and persist it.
    pub fn import_dataset(&mut self, dataset: ImportedDataset) {
        self.install(dataset, true);
    }

    /// Reload the last persisted import. `Ok(false)` when there is none.
    pub fn restore(&mut self) -> Result<bool> {
        let Some(store) = &self.store else {
            return Ok(false);
        };
        let Some((table, meta)) = store.load_import() else {
            debug!("no persisted import to restore");
            return Ok(false);
        };
        let preferred = store.load_metric();
        let dataset = self.importer.restore(table, meta, preferred.as_deref())?;
        self.install(dataset, false);
        info!(records = self.record_count(), "previous import restored");
        Ok(true)
    }

    fn install(&mut self, dataset: ImportedDataset, persist_rows: bool) {
        let aggregator = GroupAggregator::new(dataset.columns.clone());
        let saved_group_by = self.saved_strings(StateKey::GroupBy);
        let saved_visible = self.saved_strings(StateKey::VisibleColumns);

        self.group_by = aggregator.resolve_group_by(&saved_group_by);
        self.visible = resolve_visible(&saved_visible, &dataset.columns.descriptive);
        self.pipeline
            .filters
            .retain_columns(&dataset.columns.descriptive);
        self.months = dataset.month_columns();

        if persist_rows {
            self.persist(|s| s.save_import(&dataset.table, &dataset.meta));
        }
        if let Some(metric) = dataset.metric() {
            self.persist(|s| s.save(StateKey::Metric, metric));
        }
        let (group_by, visible) = (self.group_by.clone(), self.visible.clone());
        self.persist(|s| s.save(StateKey::GroupBy, &group_by));
        self.persist(|s| s.save(StateKey::VisibleColumns, &visible));

        self.aggregator = Some(aggregator);
        self.dataset = Some(dataset);
        self.recompute(Stage::Aggregate);
    }

    /// Drop every persisted key and reset to an empty session.
    pub fn clear(&mut self) -> Result<()> {
        if let Some(store) = &self.store {
            store.clear()?;
        }
        let store = self.store.take();
        *self = Self::new(store);
        info!("session cleared");
        Ok(())
    }

    // ── Parameters ────────────────────────────────────────────────────────

    /// Switch the active metric; it must be one of the offered options.
    pub fn set_metric(&mut self, metric: &str) -> Result<()> {
        let Some(ds) = self.dataset.as_mut() else {
            return Err(SigmaError::Config("no data loaded".to_string()));
        };
        if !ds.metric_options.iter().any(|m| m == metric) {
            return Err(SigmaError::Config(format!(
                "metric '{}' is not available (options: {})",
                metric,
                ds.metric_options.join(", ")
            )));
        }
        ds.meta.metric = Some(metric.to_string());
        self.months = ds.month_columns();
        let meta = ds.meta.clone();
        self.persist(|s| s.save(StateKey::Metric, metric));
        self.persist(|s| s.save(StateKey::Meta, &meta));
        self.recompute(Stage::Aggregate);
        Ok(())
    }

    /// Change the grouping columns; stale or empty selections fall back to
    /// the defaults.
    pub fn set_group_by(&mut self, columns: &[String]) {
        let Some(aggregator) = &self.aggregator else {
            return;
        };
        self.group_by = aggregator.resolve_group_by(columns);
        let group_by = self.group_by.clone();
        self.persist(|s| s.save(StateKey::GroupBy, &group_by));
        self.recompute(Stage::Aggregate);
    }

    /// Change the descriptive columns shown in reports.
    pub fn set_visible(&mut self, columns: &[String]) {
        self.visible = resolve_visible(columns, self.descriptive_columns());
        let visible = self.visible.clone();
        self.persist(|s| s.save(StateKey::VisibleColumns, &visible));
    }

    pub fn set_params(&mut self, params: StatisticsParams) {
        self.params = params;
        self.recompute(Stage::Compute);
    }

    pub fn set_reference(&mut self, reference: Option<String>) {
        self.params.reference = reference;
        self.recompute(Stage::Compute);
    }

    pub fn set_window(&mut self, window: Option<usize>) {
        self.params.window = window;
        self.recompute(Stage::Compute);
    }

    pub fn set_ignore_zeros(&mut self, ignore: bool) {
        self.params.ignore_zeros = ignore;
        self.recompute(Stage::Compute);
    }

    pub fn set_filters(&mut self, mut filters: RowFilters) {
        if self.dataset.is_some() {
            filters.retain_columns(self.descriptive_columns());
        }
        self.pipeline.filters = filters;
        self.recompute(Stage::Filter);
    }

    pub fn set_sort(&mut self, sort: SortState) {
        self.pipeline.sort = sort;
        self.recompute(Stage::Filter);
    }

    /// Select a sort key: the same key flips direction, a new one starts ascending.
    pub fn toggle_sort(&mut self, key: SortKey) {
        self.pipeline.sort.toggle(key);
        self.recompute(Stage::Filter);
    }

    /// Clear every filter, keeping the sort.
    pub fn reset_filters(&mut self) {
        self.pipeline.filters = RowFilters::default();
        self.recompute(Stage::Filter);
    }

    // ── Recompute ─────────────────────────────────────────────────────────

    fn recompute(&mut self, from: Stage) {
        let (Some(ds), Some(aggregator)) = (&self.dataset, &self.aggregator) else {
            self.groups.clear();
            self.computed.clear();
            self.rows.clear();
            return;
        };

        if from <= Stage::Aggregate {
            self.groups = aggregator
                .aggregate(&ds.table, &self.group_by, &self.months)
                .groups;
        }
        if from <= Stage::Compute {
            self.computed = StatisticsEngine::new(self.params.clone()).compute_all(&self.groups, &self.months);
        }
        self.rows = self.pipeline.apply(self.computed.clone());
        debug!(
            stage = ?from,
            groups = self.groups.len(),
            visible_rows = self.rows.len(),
            "session recomputed"
        );
    }

    fn saved_strings(&self, key: StateKey) -> Vec<String> {
        self.store
            .as_ref()
            .map(|s| s.load_strings(key))
            .unwrap_or_default()
    }

    /// Persistence failures never interrupt the analysis.
    fn persist<F>(&self, f: F)
    where
        F: FnOnce(&StateStore) -> Result<()>,
    {
        if let Some(store) = &self.store {
            if let Err(e) = f(store) {
                warn!(error = %e, "failed to persist state");
            }
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn has_data(&self) -> bool {
        self.dataset.is_some()
    }

    pub fn dataset(&self) -> Option<&ImportedDataset> {
        self.dataset.as_ref()
    }

    pub fn record_count(&self) -> usize {
        self.dataset.as_ref().map_or(0, |d| d.table.len())
    }

    /// Filtered and sorted rows.
    pub fn rows(&self) -> &[ComputedRow] {
        &self.rows
    }

    /// Every computed row, before filtering.
    pub fn computed(&self) -> &[ComputedRow] {
        &self.computed
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn months(&self) -> &[MonthColumn] {
        &self.months
    }

    pub fn group_by(&self) -> &[String] {
        &self.group_by
    }

    pub fn visible(&self) -> &[String] {
        &self.visible
    }

    pub fn descriptive_columns(&self) -> &[String] {
        self.dataset
            .as_ref()
            .map(|d| d.columns.descriptive.as_slice())
            .unwrap_or(&[])
    }

    pub fn metric(&self) -> Option<&str> {
        self.dataset.as_ref().and_then(|d| d.metric())
    }

    pub fn metric_options(&self) -> &[String] {
        self.dataset
            .as_ref()
            .map(|d| d.metric_options.as_slice())
            .unwrap_or(&[])
    }

    pub fn params(&self) -> &StatisticsParams {
        &self.params
    }

    pub fn filters(&self) -> &RowFilters {
        &self.pipeline.filters
    }

    pub fn sort(&self) -> &SortState {
        &self.pipeline.sort
    }

    /// Label of the month under validation.
    pub fn reference_label(&self) -> Option<String> {
        reference_label(&self.months, self.params.reference.as_deref())
    }

    pub fn verba_options(&self) -> Vec<String> {
        match (&self.dataset, &self.aggregator) {
            (Some(ds), Some(a)) => a.verba_options(&ds.table),
            _ => Vec::new(),
        }
    }

    // ── Summaries ─────────────────────────────────────────────────────────

    pub fn kpis(&self) -> Kpis {
        Kpis::from_rows(&self.rows)
    }

    pub fn month_totals(&self) -> MonthTotals {
        MonthTotals::from_rows(&self.rows, &self.months)
    }

    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics::build(
            &self.rows,
            self.months.len(),
            &self.group_by,
            self.descriptive_columns().len(),
            self.visible.len(),
        )
    }

    /// Mode and options of every dedicated filter column.
    pub fn filter_profiles(&self) -> Vec<FilterColumnProfile> {
        let Some(ds) = &self.dataset else {
            return Vec::new();
        };
        default_filter_columns(&ds.columns.descriptive, &self.visible)
            .iter()
            .map(|col| {
                let values: Vec<String> = (0..ds.table.len()).map(|r| ds.table.text(r, col)).collect();
                profile_filter_column(col, values.iter().map(String::as_str), &self.categorical)
            })
            .collect()
    }

    // ── Exports ───────────────────────────────────────────────────────────

    pub fn report_context(&self) -> ReportContext {
        let mut ctx = ReportContext::now();
        if let Some(ds) = &self.dataset {
            ctx.source_file = ds.meta.source_file.clone();
            ctx.sheet = ds.meta.sheet.clone();
            ctx.metric = ds.meta.metric.clone();
        }
        ctx
    }

    /// The text report of the current rows.
    pub fn render_report(&self) -> String {
        render_txt(&self.rows, &self.months, &self.visible, &self.report_context())
    }

    pub fn export_txt(&self, path: &Path) -> Result<()> {
        write_txt(path, &self.rows, &self.months, &self.visible, &self.report_context())
    }

    /// xlsx, or csv when `path` ends in `.csv`.
    pub fn export_tabular(&self, path: &Path) -> Result<()> {
        write_tabular(path, &self.rows, &self.months, self.descriptive_columns())
    }
}

fn resolve_visible(requested: &[String], descriptive: &[String]) -> Vec<String> {
    retain_existing(requested, descriptive).unwrap_or_else(|| default_visible(descriptive))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
