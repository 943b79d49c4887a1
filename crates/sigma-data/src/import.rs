//! Import pipeline: worksheet grid → validated, interpreted dataset.
//!
//! Nothing here mutates shared state. A dataset is either fully assembled
//! or the whole import fails, so callers can swap it in atomically.

use std::path::Path;

use chrono::Utc;
use sigma_core::columns::{base_columns, descriptive_columns, guess_code_column, guess_description_column};
use sigma_core::error::{Result, SigmaError};
use sigma_core::headers::{MonthIndex, MonthIndexBuilder};
use sigma_core::metrics::{choose_metric, months_for_metric, MetricSelector};
use sigma_core::models::{MonthColumn, RawTable};
use tracing::{debug, info, warn};

use crate::aggregator::AggregationColumns;
use crate::reader::{detect_main_sheet, read_workbook, table_from_grid, SheetGrid, WorkbookData};
use crate::store::{ImportMeta, META_VERSION};

/// Header row tried when row 0 lacks the code/description columns.
pub const FALLBACK_HEADER_ROW: usize = 2;

// ── ImportedDataset ───────────────────────────────────────────────────────────

/// A table together with everything derived from its headers.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedDataset {
    pub table: RawTable,
    pub meta: ImportMeta,
    pub index: MonthIndex,
    /// Numeric metrics, amount first.
    pub metric_options: Vec<String>,
    pub columns: AggregationColumns,
    /// Non-month, non code/description columns in sheet order.
    pub base_columns: Vec<String>,
}

impl ImportedDataset {
    /// The active metric recorded in the metadata.
    pub fn metric(&self) -> Option<&str> {
        self.meta.metric.as_deref()
    }

    /// Months projected onto the active metric.
    pub fn month_columns(&self) -> Vec<MonthColumn> {
        match self.metric() {
            Some(metric) => months_for_metric(&self.index.months, metric),
            None => Vec::new(),
        }
    }
}

// ── DatasetImporter ───────────────────────────────────────────────────────────

/// Runs header recognition and metric selection over a raw table.
pub struct DatasetImporter {
    index_builder: MonthIndexBuilder,
    selector: MetricSelector,
}

impl DatasetImporter {
    pub fn new(index_builder: MonthIndexBuilder, selector: MetricSelector) -> Self {
        Self {
            index_builder,
            selector,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(MonthIndexBuilder::default(), MetricSelector::with_defaults())
    }

    /// Read `path` and import its main sheet (or `sheet` when given).
    pub fn import_file(
        &self,
        path: &Path,
        sheet: Option<&str>,
        preferred_metric: Option<&str>,
    ) -> Result<ImportedDataset> {
        let workbook = read_workbook(path)?;
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        self.import_workbook(&workbook, source, sheet, preferred_metric)
    }

    pub fn import_workbook(
        &self,
        workbook: &WorkbookData,
        source_file: Option<String>,
        sheet: Option<&str>,
        preferred_metric: Option<&str>,
    ) -> Result<ImportedDataset> {
        if workbook.sheets.is_empty() {
            return Err(SigmaError::NoSheets);
        }
        let grid = match sheet {
            Some(name) => workbook
                .sheet(name)
                .ok_or_else(|| SigmaError::Config(format!("sheet '{}' not found", name)))?,
            None => detect_main_sheet(workbook).ok_or(SigmaError::NoSheets)?,
        };
        self.import_grid(grid, source_file, preferred_metric)
    }

    /// Interpret one worksheet, retrying with the header on row 2 when the
    /// first row does not carry the code/description columns.
    pub fn import_grid(
        &self,
        grid: &SheetGrid,
        source_file: Option<String>,
        preferred_metric: Option<&str>,
    ) -> Result<ImportedDataset> {
        let mut table = table_from_grid(&grid.rows, 0);
        if table.is_empty() {
            return Err(SigmaError::EmptySheet(grid.name.clone()));
        }

        let mut base = locate_base_columns(&table.columns);
        if base.is_none() {
            debug!(sheet = %grid.name, "code/description not on first row, retrying with offset header");
            let retry = table_from_grid(&grid.rows, FALLBACK_HEADER_ROW);
            base = locate_base_columns(&retry.columns);
            if base.is_some() {
                table = retry;
            }
        }
        let (code, description) = base.ok_or(SigmaError::MissingBaseColumns)?;
        if table.is_empty() {
            return Err(SigmaError::EmptySheet(grid.name.clone()));
        }

        let meta = ImportMeta {
            imported_at: Utc::now(),
            source_file,
            sheet: Some(grid.name.clone()),
            months: Vec::new(),
            metric_options: Vec::new(),
            metric: None,
            code_column: code,
            description_column: description,
            version: META_VERSION.to_string(),
        };
        let dataset = self.interpret(table, meta, preferred_metric)?;

        info!(
            sheet = %grid.name,
            records = dataset.table.len(),
            months = dataset.index.months.len(),
            metric = ?dataset.metric(),
            "spreadsheet imported"
        );
        Ok(dataset)
    }

    /// Rebuild a dataset from a persisted table and its metadata.
    ///
    /// Months and metric options are derived from the headers again; the
    /// recorded code/description columns are used when still present.
    pub fn restore(
        &self,
        table: RawTable,
        mut meta: ImportMeta,
        preferred_metric: Option<&str>,
    ) -> Result<ImportedDataset> {
        if !table.columns.contains(&meta.code_column)
            || !table.columns.contains(&meta.description_column)
        {
            warn!("persisted code/description columns missing, guessing again");
            let (code, description) =
                locate_base_columns(&table.columns).ok_or(SigmaError::MissingBaseColumns)?;
            meta.code_column = code;
            meta.description_column = description;
        }
        let dataset = self.interpret(table, meta, preferred_metric)?;
        debug!(records = dataset.table.len(), "dataset restored");
        Ok(dataset)
    }

    fn interpret(
        &self,
        table: RawTable,
        mut meta: ImportMeta,
        preferred_metric: Option<&str>,
    ) -> Result<ImportedDataset> {
        let index = self.index_builder.build(&table.columns);
        if index.is_empty() {
            return Err(SigmaError::NoMonthColumns);
        }
        let metric_options = self.selector.select(&table, &index.months, &index.metrics);
        let imported = meta.metric.clone();
        meta.metric = choose_metric(&metric_options, preferred_metric, imported.as_deref());

        let base_columns = base_columns(
            &table.columns,
            &index.month_headers,
            &meta.code_column,
            &meta.description_column,
        );
        let columns = AggregationColumns {
            code: meta.code_column.clone(),
            description: meta.description_column.clone(),
            descriptive: descriptive_columns(&base_columns),
            base: base_columns.clone(),
        };
        meta.months = index.months.clone();
        meta.metric_options = metric_options.clone();

        Ok(ImportedDataset {
            table,
            meta,
            index,
            metric_options,
            columns,
            base_columns,
        })
    }
}

fn locate_base_columns(headers: &[String]) -> Option<(String, String)> {
    Some((guess_code_column(headers)?, guess_description_column(headers)?))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
