use std::path::PathBuf;
use thiserror::Error;

/// Message shown to the user whenever an import is rejected.
pub const IMPORT_HINT: &str = "Falha ao importar. Confirme que existem colunas 'Código', \
'Descrição' e colunas mensais no formato 'MMM/AA - <Métrica>' (ex.: 'JUN/25 - Valor').";

/// All errors produced by the verba validation crates.
#[derive(Error, Debug)]
pub enum SigmaError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The spreadsheet container could not be decoded.
    #[error("Failed to open workbook: {0}")]
    Workbook(String),

    /// A delimited text file could not be decoded.
    #[error("Failed to read CSV: {0}")]
    Csv(String),

    /// The workbook contains no worksheets.
    #[error("Workbook has no sheets")]
    NoSheets,

    /// The selected worksheet has a header but no data rows.
    #[error("Sheet '{0}' has no data rows")]
    EmptySheet(String),

    /// No code or no description column could be located.
    #[error("Code/description columns not found")]
    MissingBaseColumns,

    /// No header follows the `MMM/AA - <metric>` convention.
    #[error("No month columns found")]
    NoMonthColumns,

    /// A JSON document could not be parsed or written.
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// An export target could not be produced.
    #[error("Export failed: {0}")]
    Export(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SigmaError {
    /// `true` for the conditions that reject an import outright.
    pub fn is_import_rejection(&self) -> bool {
        matches!(
            self,
            SigmaError::NoSheets
                | SigmaError::EmptySheet(_)
                | SigmaError::MissingBaseColumns
                | SigmaError::NoMonthColumns
        )
    }

    /// Text suitable for showing to the end user.
    ///
    /// Import rejections collapse to the single column-convention hint; every
    /// other error keeps its own description.
    pub fn user_message(&self) -> String {
        if self.is_import_rejection() {
            IMPORT_HINT.to_string()
        } else {
            self.to_string()
        }
    }
}

/// Convenience alias used throughout the sigma crates.
pub type Result<T> = std::result::Result<T, SigmaError>;
