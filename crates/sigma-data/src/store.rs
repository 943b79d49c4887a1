//! Key-value persistence of the last import and the user's selections.
//!
//! Each key lives in its own JSON file under the state directory and is
//! loaded and saved independently. A key that is missing or unreadable is
//! simply "no prior state".

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sigma_core::error::{Result, SigmaError};
use sigma_core::models::{MonthDescriptor, RawTable};
use tracing::{debug, warn};

/// Format version written into [`ImportMeta`].
pub const META_VERSION: &str = "v2.0";

// ── Keys ──────────────────────────────────────────────────────────────────────

/// Every key the store knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKey {
    RawRows,
    Meta,
    VisibleColumns,
    GroupBy,
    Metric,
}

impl StateKey {
    pub const ALL: [StateKey; 5] = [
        StateKey::RawRows,
        StateKey::Meta,
        StateKey::VisibleColumns,
        StateKey::GroupBy,
        StateKey::Metric,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StateKey::RawRows => "raw_rows",
            StateKey::Meta => "meta",
            StateKey::VisibleColumns => "visible_columns",
            StateKey::GroupBy => "group_by",
            StateKey::Metric => "metric",
        }
    }
}

// ── ImportMeta ────────────────────────────────────────────────────────────────

/// What was imported, from where, and how it was interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportMeta {
    pub imported_at: DateTime<Utc>,
    pub source_file: Option<String>,
    pub sheet: Option<String>,
    /// Months found in the headers, with every metric mapping.
    pub months: Vec<MonthDescriptor>,
    pub metric_options: Vec<String>,
    pub metric: Option<String>,
    pub code_column: String,
    pub description_column: String,
    pub version: String,
}

// ── StateStore ────────────────────────────────────────────────────────────────

/// Directory-backed JSON store.
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: StateKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.name()))
    }

    /// Atomically write `value` under `key`.
    pub fn save<T: Serialize + ?Sized>(&self, key: StateKey, value: &T) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string(value)?;
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;
        debug!(key = key.name(), "state saved");
        Ok(())
    }

    /// Load `key`, or `None` when it is absent or cannot be decoded.
    pub fn load<T: DeserializeOwned>(&self, key: StateKey) -> Option<T> {
        let path = self.path(key);
        let content = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(key = key.name(), error = %e, "ignoring unreadable state key");
                None
            }
        }
    }

    pub fn remove(&self, key: StateKey) -> Result<()> {
        let path = self.path(key);
        if path.exists() {
            std::fs::remove_file(&path).map_err(|source| SigmaError::FileRead { path, source })?;
        }
        Ok(())
    }

    /// Remove every key.
    pub fn clear(&self) -> Result<()> {
        for key in StateKey::ALL {
            self.remove(key)?;
        }
        debug!(dir = %self.dir.display(), "state cleared");
        Ok(())
    }

    // ── Typed accessors ───────────────────────────────────────────────────────

    pub fn save_import(&self, table: &RawTable, meta: &ImportMeta) -> Result<()> {
        self.save(StateKey::RawRows, table)?;
        self.save(StateKey::Meta, meta)
    }

    /// The persisted table and its metadata, only when both load.
    pub fn load_import(&self) -> Option<(RawTable, ImportMeta)> {
        let table: RawTable = self.load(StateKey::RawRows)?;
        let meta: ImportMeta = self.load(StateKey::Meta)?;
        if table.columns.is_empty() {
            return None;
        }
        Some((table, meta))
    }

    pub fn load_strings(&self, key: StateKey) -> Vec<String> {
        self.load(key).unwrap_or_default()
    }

    pub fn load_metric(&self) -> Option<String> {
        self.load::<String>(StateKey::Metric).filter(|m| !m.is_empty())
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
