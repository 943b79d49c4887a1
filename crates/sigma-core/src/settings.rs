use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, SigmaError};
use crate::filter::{ColumnFilter, RowFilters, SortDirection, SortKey, SortState};
use crate::models::Status;
use crate::statistics::StatisticsParams;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Six-sigma validation of payroll verbas across months
#[derive(Parser, Debug, Clone)]
#[command(
    name = "verba-sigma",
    about = "Six-sigma validation of payroll verbas across months",
    version
)]
pub struct Settings {
    /// Spreadsheet to import (xlsx, xls, ods or csv); omit to reuse the last import
    pub file: Option<PathBuf>,

    /// Worksheet to read (defaults to the first sheet with a code column)
    #[arg(long)]
    pub sheet: Option<String>,

    /// Metric to analyse (e.g. Valor, Hora)
    #[arg(long)]
    pub metric: Option<String>,

    /// Reference month label, e.g. JUN/25 (defaults to the last month)
    #[arg(long)]
    pub ref_month: Option<String>,

    /// Most recent history months used for the baseline (2 or more)
    #[arg(long)]
    pub window: Option<usize>,

    /// Ignore zero values when building the history
    #[arg(long)]
    pub ignore_zeros: bool,

    /// Grouping column (repeatable)
    #[arg(long = "group-by")]
    pub group_by: Vec<String>,

    /// Visible descriptive column (repeatable)
    #[arg(long)]
    pub visible: Vec<String>,

    /// Only this verba (`code - description`)
    #[arg(long)]
    pub verba: Option<String>,

    /// Free-text search
    #[arg(long)]
    pub search: Option<String>,

    /// Status filter (Aceitável, Alerta, Fora, Sem histórico)
    #[arg(long)]
    pub status: Option<String>,

    /// Minimum z-score
    #[arg(long, allow_hyphen_values = true)]
    pub min_z: Option<f64>,

    /// Maximum z-score
    #[arg(long, allow_hyphen_values = true)]
    pub max_z: Option<f64>,

    /// Exact column filter, COLUMN=VALUE (repeatable)
    #[arg(long = "filter")]
    pub filters: Vec<String>,

    /// Substring column filter, COLUMN=TEXT (repeatable)
    #[arg(long = "contains")]
    pub contains: Vec<String>,

    /// Sort key (verba, grupo, ref, media, sigma, lcl, ucl, z, status, m:<MES>, extra:<COLUNA>)
    #[arg(long)]
    pub sort: Option<String>,

    /// Sort descending
    #[arg(long)]
    pub desc: bool,

    /// View mode
    #[arg(long, default_value = "table", value_parser = ["table", "summary", "tui"])]
    pub view: String,

    /// Display theme
    #[arg(long, default_value = "dark", value_parser = ["light", "dark", "classic"])]
    pub theme: String,

    /// Write the pipe-delimited report to this path (a directory picks the default name)
    #[arg(long)]
    pub export_txt: Option<PathBuf>,

    /// Write the tabular export to this path (.xlsx, or .csv)
    #[arg(long)]
    pub export_xlsx: Option<PathBuf>,

    /// Directory holding the persisted import and selections
    #[arg(long)]
    pub state_dir: Option<PathBuf>,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration and the persisted import
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.verba-sigma/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<usize>,
}

impl LastUsedParams {
    /// Uses `~/.verba-sigma/last_used.json`.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&home_dir())
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(".verba-sigma").join("last_used.json")
    }

    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(error = %e, path = %path.display(), "ignoring unreadable last-used params");
            Self::default()
        })
    }

    /// Atomically write params to an explicit path.
    pub fn save_to(&self, path: &Path) -> std::result::Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &Path) -> std::result::Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// The user's home directory, or `.` when it cannot be determined.
pub fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Default location of the persisted import, `~/.verba-sigma/state`.
pub fn default_state_dir() -> PathBuf {
    home_dir().join(".verba-sigma").join("state")
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(std::env::args_os().collect(), &LastUsedParams::config_path())
    }

    /// Full implementation; accepts args and an explicit config path so that
    /// tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(args: Vec<std::ffi::OsString>, config_path: &Path) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            if let Err(e) = LastUsedParams::clear_at(config_path) {
                tracing::warn!(error = %e, "failed to clear last-used params");
            }
            return Self::apply_debug(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // clap keys args by field name, not by the long flag spelling.
        if !is_arg_explicitly_set(&matches, "view") {
            if let Some(v) = last.view {
                settings.view = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "theme") {
            if let Some(v) = last.theme {
                settings.theme = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "window") && settings.window.is_none() {
            settings.window = last.window;
        }

        settings = Self::apply_debug(settings);

        let params = LastUsedParams::from(&settings);
        if let Err(e) = params.save_to(config_path) {
            tracing::warn!(error = %e, "failed to persist last-used params");
        }

        settings
    }

    fn apply_debug(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// Statistics parameters requested on the command line.
    pub fn statistics_params(&self) -> StatisticsParams {
        StatisticsParams {
            reference: self.ref_month.as_ref().map(|m| m.trim().to_uppercase()),
            window: self.window,
            ignore_zeros: self.ignore_zeros,
        }
    }

    /// Row filters requested on the command line.
    pub fn row_filters(&self) -> Result<RowFilters> {
        let status = self
            .status
            .as_deref()
            .map(str::parse::<Status>)
            .transpose()?;

        let mut columns = Vec::new();
        for raw in &self.filters {
            let (col, val) = split_assignment(raw)?;
            columns.push(ColumnFilter::equals(col, val));
        }
        for raw in &self.contains {
            let (col, val) = split_assignment(raw)?;
            columns.push(ColumnFilter::contains(col, val));
        }

        Ok(RowFilters {
            verba: self.verba.clone(),
            search: self.search.clone(),
            status,
            min_z: self.min_z,
            max_z: self.max_z,
            columns,
        })
    }

    /// Sort requested on the command line.
    pub fn sort_state(&self) -> Result<SortState> {
        let Some(raw) = &self.sort else {
            return Ok(SortState::default());
        };
        let key: SortKey = raw.parse()?;
        let direction = if self.desc {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };
        Ok(SortState::new(key, direction))
    }

    /// Directory of the persisted import.
    pub fn resolved_state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(default_state_dir)
    }
}

fn split_assignment(raw: &str) -> Result<(String, String)> {
    raw.split_once('=')
        .map(|(c, v)| (c.trim().to_string(), v.trim().to_string()))
        .filter(|(c, _)| !c.is_empty())
        .ok_or_else(|| SigmaError::Config(format!("expected COLUMN=VALUE, got '{}'", raw)))
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            view: Some(s.view.clone()),
            theme: Some(s.theme.clone()),
            window: s.window,
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::FilterMode;
    use tempfile::TempDir;

    fn tmp_config_path(tmp: &TempDir) -> PathBuf {
        LastUsedParams::config_path_in(tmp.path())
    }

    // ── LastUsedParams ────────────────────────────────────────────────────────

    #[test]
    fn test_last_used_params_save_load() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        let params = LastUsedParams {
            view: Some("summary".to_string()),
            theme: Some("light".to_string()),
            window: Some(6),
        };
        params.save_to(&path).expect("save");
        assert_eq!(LastUsedParams::load_from(&path), params);
    }

    #[test]
    fn test_last_used_params_clear() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        LastUsedParams::default().save_to(&path).expect("save");
        assert!(path.exists());
        LastUsedParams::clear_at(&path).expect("clear");
        assert!(!path.exists());
    }

    #[test]
    fn test_last_used_params_default_when_corrupt() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(LastUsedParams::load_from(&path), LastUsedParams::default());
    }

    // ── CLI parsing ───────────────────────────────────────────────────────────

    #[test]
    fn test_settings_default_values() {
        let s = Settings::parse_from(["verba-sigma"]);
        assert!(s.file.is_none());
        assert_eq!(s.view, "table");
        assert_eq!(s.theme, "dark");
        assert_eq!(s.log_level, "INFO");
        assert!(s.window.is_none());
        assert!(!s.ignore_zeros);
        assert!(s.group_by.is_empty());
        assert!(!s.clear);
    }

    #[test]
    fn test_settings_repeatable_and_negative_args() {
        let s = Settings::parse_from([
            "verba-sigma",
            "folha.xlsx",
            "--group-by",
            "Empresa",
            "--group-by",
            "CPF",
            "--min-z",
            "-3",
            "--filter",
            "Clas=A",
            "--contains",
            "Nome=silva",
        ]);
        assert_eq!(s.file, Some(PathBuf::from("folha.xlsx")));
        assert_eq!(s.group_by, vec!["Empresa", "CPF"]);
        assert_eq!(s.min_z, Some(-3.0));

        let f = s.row_filters().unwrap();
        assert_eq!(f.min_z, Some(-3.0));
        assert_eq!(f.columns.len(), 2);
        assert_eq!(f.columns[0].mode, FilterMode::Equals);
        assert_eq!(f.columns[1].mode, FilterMode::Contains);
        assert_eq!(f.columns[1].value, "silva");
    }

    #[test]
    fn test_row_filters_rejects_bad_assignment() {
        let s = Settings::parse_from(["verba-sigma", "--filter", "semigual"]);
        assert!(s.row_filters().is_err());
        let s = Settings::parse_from(["verba-sigma", "--status", "talvez"]);
        assert!(s.row_filters().is_err());
    }

    #[test]
    fn test_statistics_params_from_cli() {
        let s = Settings::parse_from(["verba-sigma", "--ref-month", "jun/25", "--window", "4"]);
        let p = s.statistics_params();
        assert_eq!(p.reference.as_deref(), Some("JUN/25"));
        assert_eq!(p.window, Some(4));
    }

    #[test]
    fn test_sort_state_from_cli() {
        let s = Settings::parse_from(["verba-sigma", "--sort", "z", "--desc"]);
        let sort = s.sort_state().unwrap();
        assert_eq!(sort.key, Some(SortKey::Z));
        assert_eq!(sort.direction, SortDirection::Descending);
        assert_eq!(Settings::parse_from(["verba-sigma"]).sort_state().unwrap(), SortState::default());
    }

    // ── load_with_last_used ───────────────────────────────────────────────────

    #[test]
    fn test_load_with_last_used_merges_persisted_values() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        LastUsedParams {
            theme: Some("classic".to_string()),
            window: Some(6),
            ..Default::default()
        }
        .save_to(&config_path)
        .expect("save");

        let s = Settings::load_with_last_used_impl(vec!["verba-sigma".into()], &config_path);
        assert_eq!(s.theme, "classic");
        assert_eq!(s.window, Some(6));
    }

    #[test]
    fn test_load_with_last_used_cli_overrides_persisted() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        LastUsedParams {
            theme: Some("classic".to_string()),
            window: Some(6),
            ..Default::default()
        }
        .save_to(&config_path)
        .expect("save");

        let s = Settings::load_with_last_used_impl(
            vec![
                "verba-sigma".into(),
                "--theme".into(),
                "light".into(),
                "--window".into(),
                "3".into(),
            ],
            &config_path,
        );
        assert_eq!(s.theme, "light");
        assert_eq!(s.window, Some(3));
    }

    #[test]
    fn test_load_with_last_used_clear_removes_file() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        LastUsedParams::default().save_to(&config_path).expect("save");

        Settings::load_with_last_used_impl(
            vec!["verba-sigma".into(), "--clear".into()],
            &config_path,
        );
        assert!(!config_path.exists());
    }

    #[test]
    fn test_load_with_last_used_debug_overrides_log_level() {
        let tmp = TempDir::new().expect("tempdir");
        let s = Settings::load_with_last_used_impl(
            vec!["verba-sigma".into(), "--debug".into()],
            &tmp_config_path(&tmp),
        );
        assert_eq!(s.log_level, "DEBUG");
    }

    #[test]
    fn test_load_with_last_used_persists_after_run() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        Settings::load_with_last_used_impl(
            vec!["verba-sigma".into(), "--view".into(), "summary".into()],
            &config_path,
        );
        let loaded = LastUsedParams::load_from(&config_path);
        assert_eq!(loaded.view.as_deref(), Some("summary"));
    }
}
