//! Single-run projection.

use crate::model::{ResultRecord, RunMapping};

/// Owned records of `run` in file order. The `info` aggregate is never part
/// of the test map, so it never shows up here.
pub fn project(run: &RunMapping) -> Vec<ResultRecord> {
    run.tests.values().cloned().collect()
}
