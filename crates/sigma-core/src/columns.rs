//! Column-name heuristics: base columns, default selections and filter modes.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

use crate::collation::sort_pt;

// ── Base columns ──────────────────────────────────────────────────────────────

fn code_patterns() -> &'static [Regex] {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        [r"(?i)^c[oó]digo$", r"(?i)^codigo$", r"(?i)\bc[oó]d\b", r"(?i)\bcod\b"]
            .iter()
            .map(|p| Regex::new(p).expect("regex is valid"))
            .collect()
    })
}

fn description_patterns() -> &'static [Regex] {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        [r"(?i)^descri[cç][aã]o$", r"(?i)descric", r"(?i)\bdescricao\b"]
            .iter()
            .map(|p| Regex::new(p).expect("regex is valid"))
            .collect()
    })
}

/// First header matching the earliest pattern that hits anything.
fn guess_column(headers: &[String], patterns: &[Regex]) -> Option<String> {
    patterns.iter().find_map(|re| {
        headers
            .iter()
            .find(|h| re.is_match(h.trim()))
            .cloned()
    })
}

/// Locate the verba code column.
pub fn guess_code_column(headers: &[String]) -> Option<String> {
    guess_column(headers, code_patterns())
}

/// Locate the verba description column.
pub fn guess_description_column(headers: &[String]) -> Option<String> {
    guess_column(headers, description_patterns())
}

/// Columns that are neither month columns nor the code/description pair,
/// in sheet order.
pub fn base_columns(
    headers: &[String],
    month_headers: &BTreeSet<String>,
    code_col: &str,
    desc_col: &str,
) -> Vec<String> {
    headers
        .iter()
        .filter(|h| !month_headers.contains(*h))
        .filter(|h| h.as_str() != code_col && h.as_str() != desc_col)
        .cloned()
        .collect()
}

/// Base columns in pt-BR order, as listed in pickers and exports.
pub fn descriptive_columns(base: &[String]) -> Vec<String> {
    let mut cols = base.to_vec();
    sort_pt(&mut cols);
    cols
}

// ── Default selections ────────────────────────────────────────────────────────

/// Lowercase and strip everything outside `[a-z0-9]`.
///
/// # Examples
///
/// ```
/// use sigma_core::columns::norm_key;
///
/// assert_eq!(norm_key("C.R."), "cr");
/// assert_eq!(norm_key("Centro de Custo"), "centrodecusto");
/// ```
pub fn norm_key(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// Columns whose [`norm_key`] equals one of `keys`, in `keys` order.
pub fn pick_by_keys(columns: &[String], keys: &[&str]) -> Vec<String> {
    keys.iter()
        .filter_map(|k| columns.iter().find(|c| norm_key(c) == *k).cloned())
        .collect()
}

/// Columns matching any of `patterns` (case-insensitive), in `columns`
/// order, capped at `max`.
pub fn pick_by_patterns(columns: &[String], patterns: &[&str], max: usize) -> Vec<String> {
    let matchers: Vec<Regex> = patterns
        .iter()
        .filter_map(|p| Regex::new(&format!("(?i){}", p)).ok())
        .collect();
    columns
        .iter()
        .filter(|c| matchers.iter().any(|re| re.is_match(c)))
        .take(max)
        .cloned()
        .collect()
}

const GROUP_KEYS: &[&str] = &["empresa", "cpf"];
const GROUP_PATTERNS: &[&str] = &[
    r"estabelecimento",
    r"centro\s*de\s*custo",
    r"c\.?r\.?",
    r"matr",
    r"empresa",
];

const VISIBLE_KEYS: &[&str] = &["cr", "clas", "nome", "processo"];
const VISIBLE_PATTERNS: &[&str] = &[
    r"empresa",
    r"estabelecimento",
    r"centro\s*de\s*custo",
    r"c\.?r\.?",
    r"processo",
    r"clas",
    r"matr",
    r"nome",
];

const FILTER_KEYS: &[&str] = &["cr", "clas"];

/// Grouping columns used when the user has not chosen any.
///
/// `columns` is expected in sheet order; the first three matches win.
pub fn default_group_by(columns: &[String]) -> Vec<String> {
    let fixed = pick_by_keys(columns, GROUP_KEYS);
    if !fixed.is_empty() {
        return fixed;
    }
    pick_by_patterns(columns, GROUP_PATTERNS, 3)
}

/// Descriptive columns shown by default, picked from the pt-BR ordered list.
pub fn default_visible(columns: &[String]) -> Vec<String> {
    let fixed = pick_by_keys(columns, VISIBLE_KEYS);
    if !fixed.is_empty() {
        return fixed;
    }
    pick_by_patterns(columns, VISIBLE_PATTERNS, 6)
}

/// Columns offered as dedicated filters.
pub fn default_filter_columns(columns: &[String], visible: &[String]) -> Vec<String> {
    let fixed = pick_by_keys(columns, FILTER_KEYS);
    if !fixed.is_empty() {
        return fixed;
    }
    visible.to_vec()
}

/// Keep only the saved entries that still exist in `columns`.
///
/// Returns `None` when nothing survives so the caller can fall back to a default.
pub fn retain_existing(saved: &[String], columns: &[String]) -> Option<Vec<String>> {
    let kept: Vec<String> = saved
        .iter()
        .filter(|c| columns.contains(c))
        .cloned()
        .collect();
    if kept.is_empty() {
        None
    } else {
        Some(kept)
    }
}

// ── Filter mode scoring ───────────────────────────────────────────────────────

/// How a descriptive-column filter compares values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Exact match against one of a short list of options.
    Equals,
    /// Case-insensitive substring match.
    Contains,
}

/// Thresholds that decide whether a column is small-categorical.
#[derive(Debug, Clone)]
pub struct CategoricalConfig {
    pub min_distinct: usize,
    pub max_distinct: usize,
    pub max_value_len: usize,
    /// Suggestions kept for free-text columns.
    pub max_suggestions: usize,
}

impl Default for CategoricalConfig {
    fn default() -> Self {
        Self {
            min_distinct: 2,
            max_distinct: 30,
            max_value_len: 60,
            max_suggestions: 200,
        }
    }
}

/// Mode and value list for one filter column.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterColumnProfile {
    pub column: String,
    pub mode: FilterMode,
    /// Options for `Equals`, suggestions for `Contains`; pt-BR ordered.
    pub values: Vec<String>,
}

/// Classify a column from its observed values.
///
/// Empty values are ignored. A column is small-categorical when its distinct
/// count lies in `[min_distinct, max_distinct]` and no value exceeds
/// `max_value_len` characters.
pub fn profile_filter_column<'a, I>(column: &str, values: I, config: &CategoricalConfig) -> FilterColumnProfile
where
    I: IntoIterator<Item = &'a str>,
{
    let mut distinct: Vec<String> = Vec::new();
    let mut seen = BTreeSet::new();
    for v in values {
        let v = v.trim();
        if !v.is_empty() && seen.insert(v.to_string()) {
            distinct.push(v.to_string());
        }
    }
    let max_len = distinct.iter().map(|v| v.chars().count()).max().unwrap_or(0);
    let categorical = distinct.len() >= config.min_distinct
        && distinct.len() <= config.max_distinct
        && max_len <= config.max_value_len;

    let mode = if categorical {
        FilterMode::Equals
    } else {
        distinct.truncate(config.max_suggestions);
        FilterMode::Contains
    };
    sort_pt(&mut distinct);

    FilterColumnProfile {
        column: column.to_string(),
        mode,
        values: distinct,
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_guess_code_and_description() {
        let h = cols(&["Empresa", "Código", "Descrição", "JUN/25 - Valor"]);
        assert_eq!(guess_code_column(&h).as_deref(), Some("Código"));
        assert_eq!(guess_description_column(&h).as_deref(), Some("Descrição"));
    }

    #[test]
    fn test_guess_abbreviated_names() {
        let h = cols(&["Cod Verba", "Descricao da Verba"]);
        assert_eq!(guess_code_column(&h).as_deref(), Some("Cod Verba"));
        assert_eq!(guess_description_column(&h).as_deref(), Some("Descricao da Verba"));
    }

    #[test]
    fn test_guess_prefers_exact_pattern() {
        let h = cols(&["Cód Empresa", "CODIGO"]);
        assert_eq!(guess_code_column(&h).as_deref(), Some("CODIGO"));
    }

    #[test]
    fn test_guess_none_when_missing() {
        let h = cols(&["Nome", "Valor"]);
        assert_eq!(guess_code_column(&h), None);
        assert_eq!(guess_description_column(&h), None);
    }

    #[test]
    fn test_base_columns_exclude_months_and_core() {
        let h = cols(&["Empresa", "Código", "Descrição", "JUN/25 - Valor", "Nome"]);
        let months = BTreeSet::from(["JUN/25 - Valor".to_string()]);
        let base = base_columns(&h, &months, "Código", "Descrição");
        assert_eq!(base, cols(&["Empresa", "Nome"]));
        assert_eq!(descriptive_columns(&cols(&["Nome", "Empresa"])), cols(&["Empresa", "Nome"]));
    }

    #[test]
    fn test_default_group_by_prefers_fixed_keys() {
        let c = cols(&["CPF", "Nome", "Empresa", "Estabelecimento"]);
        assert_eq!(default_group_by(&c), cols(&["Empresa", "CPF"]));
    }

    #[test]
    fn test_default_group_by_patterns_capped_at_three() {
        let c = cols(&["Matrícula", "C.R.", "Centro de Custo", "Estabelecimento", "Nome"]);
        assert_eq!(
            default_group_by(&c),
            cols(&["Matrícula", "C.R.", "Centro de Custo"])
        );
    }

    #[test]
    fn test_pick_by_patterns_follows_column_order() {
        let c = cols(&["Nome", "Matrícula", "Empresa", "Processo"]);
        assert_eq!(
            pick_by_patterns(&c, &[r"empresa", r"matr", r"nome"], 2),
            cols(&["Nome", "Matrícula"])
        );
        assert!(pick_by_patterns(&c, &[r"cargo"], 3).is_empty());
    }

    #[test]
    fn test_default_visible_patterns_capped_at_six() {
        let c = cols(&[
            "Cargo",
            "Centro de Custo",
            "Classe",
            "Empresa",
            "Estabelecimento",
            "Matrícula",
            "Nome Social",
            "Processo Seletivo",
        ]);
        assert_eq!(
            default_visible(&c),
            cols(&[
                "Centro de Custo",
                "Classe",
                "Empresa",
                "Estabelecimento",
                "Matrícula",
                "Nome Social",
            ])
        );
    }

    #[test]
    fn test_default_visible_fixed_keys() {
        let c = cols(&["Nome", "CR", "Processo", "Outra"]);
        assert_eq!(default_visible(&c), cols(&["CR", "Nome", "Processo"]));
    }

    #[test]
    fn test_default_filter_columns() {
        let c = cols(&["Clas", "Nome"]);
        assert_eq!(default_filter_columns(&c, &cols(&["Nome"])), cols(&["Clas"]));
        let c = cols(&["Nome"]);
        assert_eq!(default_filter_columns(&c, &cols(&["Nome"])), cols(&["Nome"]));
    }

    #[test]
    fn test_retain_existing() {
        let c = cols(&["A", "B"]);
        assert_eq!(retain_existing(&cols(&["B", "Z"]), &c), Some(cols(&["B"])));
        assert_eq!(retain_existing(&cols(&["Z"]), &c), None);
    }

    #[test]
    fn test_profile_small_categorical() {
        let p = profile_filter_column("Clas", ["B", "A", "", "B"], &CategoricalConfig::default());
        assert_eq!(p.mode, FilterMode::Equals);
        assert_eq!(p.values, cols(&["A", "B"]));
    }

    #[test]
    fn test_profile_single_value_is_free_text() {
        let p = profile_filter_column("Clas", ["A", "A"], &CategoricalConfig::default());
        assert_eq!(p.mode, FilterMode::Contains);
    }

    #[test]
    fn test_profile_long_values_are_free_text() {
        let long = "x".repeat(61);
        let p = profile_filter_column("Obs", [long.as_str(), "curto"], &CategoricalConfig::default());
        assert_eq!(p.mode, FilterMode::Contains);
    }

    #[test]
    fn test_profile_caps_suggestions() {
        let values: Vec<String> = (0..250).map(|i| format!("nome {i}")).collect();
        let p = profile_filter_column(
            "Nome",
            values.iter().map(String::as_str),
            &CategoricalConfig::default(),
        );
        assert_eq!(p.mode, FilterMode::Contains);
        assert_eq!(p.values.len(), 200);
    }
}
