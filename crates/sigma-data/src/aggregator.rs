//! Grouping of raw records by verba and the chosen columns.
//!
//! Each group sums the active metric per month. Groups come out in the
//! order their first record appeared.

use std::collections::{BTreeMap, HashMap, HashSet};

use sigma_core::collation::sort_pt;
use sigma_core::columns::{default_group_by, retain_existing};
use sigma_core::models::{Group, MonthColumn, RawTable};
use sigma_core::number::parse_cell;
use tracing::debug;

// ── Aggregation ───────────────────────────────────────────────────────────────

/// Groups plus the grouping selection that produced them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    pub groups: Vec<Group>,
    pub group_by: Vec<String>,
}

impl Aggregation {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Which columns identify a verba and which describe a group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationColumns {
    pub code: String,
    pub description: String,
    /// Descriptive (non-month, non code/description) columns, pt-BR ordered.
    pub descriptive: Vec<String>,
    /// The same columns in sheet order.
    pub base: Vec<String>,
}

/// `code - description`, both trimmed.
pub fn verba_key(code: &str, description: &str) -> String {
    format!("{} - {}", code.trim(), description.trim())
}

/// Case-normalised identity of a verba within its grouping parts.
pub fn group_key(verba_key: &str, parts: &[String]) -> String {
    let mut key = verba_key.to_uppercase();
    for p in parts {
        key.push('|');
        key.push_str(&p.to_uppercase());
    }
    key
}

/// Builds [`Group`]s out of a [`RawTable`].
#[derive(Debug, Clone)]
pub struct GroupAggregator {
    columns: AggregationColumns,
}

impl GroupAggregator {
    pub fn new(columns: AggregationColumns) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &AggregationColumns {
        &self.columns
    }

    /// Resolve the grouping selection: the saved/requested columns still
    /// present in the sheet, else the defaults picked in sheet order.
    pub fn resolve_group_by(&self, requested: &[String]) -> Vec<String> {
        retain_existing(requested, &self.columns.base)
            .unwrap_or_else(|| default_group_by(&self.columns.base))
    }

    /// Sum `months` per (verba, grouping parts).
    pub fn aggregate(&self, table: &RawTable, group_by: &[String], months: &[MonthColumn]) -> Aggregation {
        let col = |name: &str| table.column_index(name);
        let code_idx = col(&self.columns.code);
        let desc_idx = col(&self.columns.description);
        let part_idx: Vec<Option<usize>> = group_by.iter().map(|c| col(c)).collect();
        let extra_cols: Vec<(&String, Option<usize>)> = self
            .columns
            .descriptive
            .iter()
            .filter(|c| !group_by.contains(c))
            .map(|c| (c, col(c)))
            .collect();
        let month_idx: Vec<(&str, usize)> = months
            .iter()
            .filter_map(|m| {
                m.header
                    .as_deref()
                    .and_then(|h| col(h))
                    .map(|i| (m.label.as_str(), i))
            })
            .collect();

        let text = |row: usize, idx: Option<usize>| -> String {
            idx.map(|i| table.cell(row, i).text()).unwrap_or_default()
        };

        let mut groups: Vec<Group> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for row in 0..table.len() {
            let code = text(row, code_idx);
            let description = text(row, desc_idx);
            let vk = verba_key(&code, &description);
            let parts: Vec<String> = part_idx.iter().map(|i| text(row, *i)).collect();
            let key = group_key(&vk, &parts);

            let slot = match index.get(&key) {
                Some(i) => *i,
                None => {
                    let extras: BTreeMap<String, String> = extra_cols
                        .iter()
                        .map(|(c, i)| ((*c).clone(), text(row, *i)))
                        .collect();
                    groups.push(Group {
                        key: key.clone(),
                        verba_key: vk,
                        code,
                        description,
                        group_by: group_by.to_vec(),
                        group_parts: parts,
                        extras,
                        values: BTreeMap::new(),
                    });
                    index.insert(key, groups.len() - 1);
                    groups.len() - 1
                }
            };

            let group = &mut groups[slot];
            for (label, i) in &month_idx {
                if let Some(v) = parse_cell(table.cell(row, *i)) {
                    *group.values.entry((*label).to_string()).or_insert(0.0) += v;
                }
            }
        }

        debug!(
            records = table.len(),
            groups = groups.len(),
            group_by = ?group_by,
            "records aggregated"
        );

        Aggregation {
            groups,
            group_by: group_by.to_vec(),
        }
    }

    /// Distinct non-empty verba keys, pt-BR sorted.
    pub fn verba_options(&self, table: &RawTable) -> Vec<String> {
        let code_idx = table.column_index(&self.columns.code);
        let desc_idx = table.column_index(&self.columns.description);
        let mut seen: HashSet<String> = HashSet::new();
        let mut options: Vec<String> = Vec::new();
        for row in 0..table.len() {
            let code = code_idx.map(|i| table.cell(row, i).text()).unwrap_or_default();
            let desc = desc_idx.map(|i| table.cell(row, i).text()).unwrap_or_default();
            if code.is_empty() && desc.is_empty() {
                continue;
            }
            let vk = verba_key(&code, &desc);
            if seen.insert(vk.clone()) {
                options.push(vk);
            }
        }
        sort_pt(&mut options);
        options
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
