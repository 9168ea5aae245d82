use crate::model::Status;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// A status change between the first and second run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Transition {
    pub from: Status,
    pub to: Status,
}

impl Transition {
    pub fn new(from: Status, to: Status) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

impl Serialize for Transition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Counts of how tests moved between two runs.
///
/// `added` and `deleted` are relative to the second run: a test only in the
/// first run is "added" (keyed by its status there), a test only in the
/// second run is "deleted".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransitionTally {
    pub transitions: BTreeMap<Transition, usize>,
    pub added: BTreeMap<Status, usize>,
    pub deleted: usize,
    pub unchanged: usize,
    pub unchanged_by_status: BTreeMap<Status, usize>,
    /// Emitted because `errorType` changed while `status` stayed the same.
    pub error_type_only: usize,
}

impl TransitionTally {
    pub(crate) fn record_transition(&mut self, from: &Status, to: &Status) {
        *self
            .transitions
            .entry(Transition::new(from.clone(), to.clone()))
            .or_default() += 1;
    }

    pub(crate) fn record_added(&mut self, status: &Status) {
        *self.added.entry(status.clone()).or_default() += 1;
    }

    pub(crate) fn record_unchanged(&mut self, status: &Status) {
        self.unchanged += 1;
        *self.unchanged_by_status.entry(status.clone()).or_default() += 1;
    }

    pub fn transition(&self, from: &Status, to: &Status) -> usize {
        self.transitions
            .get(&Transition::new(from.clone(), to.clone()))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_transitions(&self) -> usize {
        self.transitions.values().sum()
    }

    pub fn total_added(&self) -> usize {
        self.added.values().sum()
    }
}
