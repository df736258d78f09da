use crate::models::AssignmentRecord;
use std::collections::{HashMap, HashSet};

/// Per point-of-sale invoice totals and the document types seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PosEntry {
    pub total: i64,
    pub types: HashSet<String>,
}

impl PosEntry {
    /// Document types in numeric-ascending order.
    pub fn sorted_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.types.iter().map(String::as_str).collect();
        types.sort_by(|a, b| numeric_cmp(a, b));
        types
    }

    pub fn display_types(&self) -> String {
        self.sorted_types().join(", ")
    }
}

/// Rollup keyed by the string form of `pto_vta`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PosRollup {
    entries: HashMap<String, PosEntry>,
}

impl PosRollup {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, pos: &str) -> Option<&PosEntry> {
        self.entries.get(pos)
    }

    /// Entries in display order: numeric-ascending by POS id.
    pub fn ordered(&self) -> Vec<(&str, &PosEntry)> {
        let mut rows: Vec<(&str, &PosEntry)> = self
            .entries
            .iter()
            .map(|(k, v)| (k.as_str(), v))
            .collect();
        rows.sort_by(|a, b| numeric_cmp(a.0, b.0));
        rows
    }

    pub fn keys(&self) -> Vec<&str> {
        self.ordered().into_iter().map(|(k, _)| k).collect()
    }
}

/// Groups assignment records by point of sale. Only POS ids present in `records` appear.
pub fn rollup_by_pos(records: &[AssignmentRecord]) -> PosRollup {
    let mut entries: HashMap<String, PosEntry> = HashMap::new();
    for record in records {
        let entry = entries.entry(record.pto_vta.to_string()).or_default();
        entry.total += record.invoices_count;
        entry.types.insert(record.cbte_tipo.to_string());
    }
    PosRollup { entries }
}

fn numeric_cmp(a: &str, b: &str) -> std::cmp::Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}
