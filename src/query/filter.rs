use super::RecordView;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Per-field whitelists. A record passes only if all four contain its value.
///
/// An empty whitelist lets nothing through; start from [`Constraints::observed`]
/// and remove values to narrow the view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Constraints {
    pub statuses: BTreeSet<String>,
    pub error_types: BTreeSet<String>,
    pub types: BTreeSet<String>,
    pub groups: BTreeSet<String>,
}

impl Constraints {
    /// Whitelists containing every value present in `records`.
    pub fn observed<R: RecordView>(records: &[R]) -> Self {
        let mut constraints = Self::default();
        for record in records {
            constraints.statuses.insert(record.status().to_string());
            constraints.error_types.insert(record.error_type().to_string());
            constraints.types.insert(record.type_name().to_string());
            constraints.groups.insert(record.group().to_string());
        }
        constraints
    }

    pub fn allows<R: RecordView>(&self, record: &R) -> bool {
        self.statuses.contains(record.status())
            && self.error_types.contains(record.error_type())
            && self.types.contains(record.type_name())
            && self.groups.contains(record.group())
    }
}

pub fn filter<R: RecordView + Clone>(records: &[R], constraints: &Constraints) -> Vec<R> {
    records
        .iter()
        .filter(|r| constraints.allows(*r))
        .cloned()
        .collect()
}
