//! Run comparison -- merged records and a status-transition tally.
//!
//! Two modes are supported. `StatusGated` (the default) emits a record for
//! a shared test only when `status` or `errorType` changed; payload fields
//! such as logs never trigger emission. `FieldLevel` emits on any differing
//! field except those whose key contains "log", and only carries the
//! differing fields of the second run.
//!
//! Records are built from owned copies of the inputs; the runs themselves
//! are only borrowed. Output order is every test of the first run in its
//! order, followed by tests only in the second run in that run's order.

mod merged;
mod tally;

pub use merged::{Change, MergedRecord};
pub use tally::{Transition, TransitionTally};

use crate::model::record::{IDENTITY_FIELDS, STATUS};
use crate::model::{ResultRecord, RunMapping, Status};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

/// Placeholder for the fields of a test missing from one of the runs.
pub const DEFAULT_SENTINEL: &str = "Test not part of run!";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareMode {
    #[default]
    #[serde(rename = "status")]
    StatusGated,
    #[serde(rename = "field")]
    FieldLevel,
}

impl CompareMode {
    /// Suffix appended to the second run's keys.
    pub fn suffix(self) -> &'static str {
        match self {
            CompareMode::StatusGated => "-run2",
            CompareMode::FieldLevel => "-diff",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CompareMode::StatusGated => "status",
            CompareMode::FieldLevel => "field",
        }
    }
}

impl fmt::Display for CompareMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown compare mode `{0}` (expected `status` or `field`)")]
pub struct ParseModeError(String);

impl FromStr for CompareMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "status" | "status-gated" => Ok(CompareMode::StatusGated),
            "field" | "field-level" => Ok(CompareMode::FieldLevel),
            other => Err(ParseModeError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareOptions {
    pub mode: CompareMode,
    pub sentinel: String,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            mode: CompareMode::StatusGated,
            sentinel: DEFAULT_SENTINEL.to_string(),
        }
    }
}

/// A test entry that could not be compared.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("test `{test}` in run `{run}` has no `{field}` field")]
pub struct MalformedRecordError {
    pub run: String,
    pub test: String,
    pub field: &'static str,
}

/// Result of comparing two runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub mode: CompareMode,
    pub records: IndexMap<String, MergedRecord>,
    pub tally: TransitionTally,
    /// Entries left out of `records` and `tally` because they were malformed.
    pub skipped: Vec<MalformedRecordError>,
}

impl Comparison {
    /// `false` when malformed entries were skipped.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }

    pub fn get(&self, test: &str) -> Option<&MergedRecord> {
        self.records.get(test)
    }

    pub fn to_vec(&self) -> Vec<MergedRecord> {
        self.records.values().cloned().collect()
    }
}

/// Compare two runs with the default, status-gated options.
pub fn compare(a: &RunMapping, b: &RunMapping) -> Comparison {
    compare_with(a, b, &CompareOptions::default())
}

pub fn compare_with(a: &RunMapping, b: &RunMapping, options: &CompareOptions) -> Comparison {
    let mut out = Comparison {
        mode: options.mode,
        records: IndexMap::new(),
        tally: TransitionTally::default(),
        skipped: Vec::new(),
    };

    for (name, first) in &a.tests {
        let Some(first_status) = require_status(a, name, first, &mut out.skipped) else {
            continue;
        };

        match b.tests.get(name) {
            Some(second) => {
                let Some(second_status) = require_status(b, name, second, &mut out.skipped)
                else {
                    continue;
                };
                let merged = match options.mode {
                    CompareMode::StatusGated => status_gated(first, second),
                    CompareMode::FieldLevel => field_level(first, second),
                };
                match merged {
                    Some(record) => {
                        if first_status != second_status {
                            out.tally.record_transition(first_status, second_status);
                        } else if first.error_type != second.error_type {
                            out.tally.error_type_only += 1;
                        }
                        out.records.insert(name.clone(), record);
                    }
                    None => out.tally.record_unchanged(first_status),
                }
            }
            None => {
                out.tally.record_added(first_status);
                let merged = only_in_first(first, first_status, options);
                out.records.insert(name.clone(), merged);
            }
        }
    }

    for (name, second) in &b.tests {
        if a.tests.contains_key(name) {
            continue;
        }
        out.tally.deleted += 1;
        out.records.insert(name.clone(), only_in_second(second, options));
    }

    debug!(
        first = %a.name,
        second = %b.name,
        mode = %options.mode,
        emitted = out.records.len(),
        unchanged = out.tally.unchanged,
        skipped = out.skipped.len(),
        "compared runs"
    );
    out
}

fn require_status<'r>(
    run: &RunMapping,
    test: &str,
    record: &'r ResultRecord,
    skipped: &mut Vec<MalformedRecordError>,
) -> Option<&'r Status> {
    if record.status.is_none() {
        let err = MalformedRecordError {
            run: run.name.clone(),
            test: test.to_string(),
            field: STATUS,
        };
        warn!(error = %err, "skipping malformed record");
        skipped.push(err);
    }
    record.status.as_ref()
}

fn change_between(first: &ResultRecord, second: &ResultRecord, fields: Vec<String>) -> Change {
    // Both statuses are checked by the caller before this point.
    let from = first.status.clone().unwrap_or(Status::NotTested);
    let to = second.status.clone().unwrap_or(Status::NotTested);
    if from != to {
        Change::StatusChanged { from, to }
    } else if first.error_type != second.error_type {
        Change::ErrorTypeChanged {
            status: from,
            from: first.error_type.clone(),
            to: second.error_type.clone(),
        }
    } else {
        Change::FieldsChanged { fields }
    }
}

fn status_gated(first: &ResultRecord, second: &ResultRecord) -> Option<MergedRecord> {
    if first.status == second.status && first.error_type == second.error_type {
        return None;
    }
    let change = change_between(first, second, Vec::new());
    let mut merged = MergedRecord::new(change, CompareMode::StatusGated.suffix());
    for (key, value) in first.fields() {
        merged.set_primary(key, value);
    }
    for (key, value) in second.fields() {
        merged.set_secondary(key, value);
    }
    Some(merged)
}

fn field_level(first: &ResultRecord, second: &ResultRecord) -> Option<MergedRecord> {
    let first_fields = first.fields();
    let second_fields = second.fields();

    let mut differing: Vec<(&str, &str)> = Vec::new();
    for &(key, value) in &second_fields {
        if !is_log_field(key) && first.get(key) != Some(value) {
            differing.push((key, value));
        }
    }
    for &(key, _) in &first_fields {
        if !is_log_field(key) && second.get(key).is_none() {
            differing.push((key, ""));
        }
    }
    if differing.is_empty() {
        return None;
    }

    let names = differing.iter().map(|(k, _)| k.to_string()).collect();
    let change = change_between(first, second, names);
    let mut merged = MergedRecord::new(change, CompareMode::FieldLevel.suffix());
    for (key, value) in first_fields {
        merged.set_primary(key, value);
    }
    for (key, value) in differing {
        merged.set_secondary(key, value);
    }
    Some(merged)
}

fn is_log_field(key: &str) -> bool {
    key.to_ascii_lowercase().contains("log")
}

fn only_in_first(first: &ResultRecord, status: &Status, options: &CompareOptions) -> MergedRecord {
    let change = Change::OnlyInFirst {
        status: status.clone(),
    };
    let mut merged = MergedRecord::new(change, options.mode.suffix());
    let fields = first.fields();
    for &(key, value) in &fields {
        merged.set_primary(key, value);
    }
    for &(key, _) in &fields {
        merged.set_secondary(key, &options.sentinel);
    }
    merged
}

fn only_in_second(second: &ResultRecord, options: &CompareOptions) -> MergedRecord {
    let change = Change::OnlyInSecond {
        status: second.status.clone(),
    };
    let mut merged = MergedRecord::new(change, options.mode.suffix());
    let fields = second.fields();
    for &(key, _) in &fields {
        merged.set_primary(key, &options.sentinel);
    }
    for key in IDENTITY_FIELDS {
        if let Some(value) = second.get(key) {
            merged.set_primary(key, value);
        }
    }
    for &(key, value) in &fields {
        merged.set_secondary(key, value);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ErrorType;

    fn run(name: &str, records: Vec<ResultRecord>) -> RunMapping {
        RunMapping::new(name, records)
    }

    fn rec(name: &str, status: Status, error: ErrorType) -> ResultRecord {
        ResultRecord::new(name, status)
            .with_error_type(error)
            .with_group("bind")
            .with_type_name("QueryEvaluationTest")
    }

    #[test]
    fn test_self_comparison_is_empty() {
        let a = run(
            "a",
            vec![
                rec("t1", Status::Passed, ErrorType::None),
                rec("t2", Status::Failed, ErrorType::QueryException),
                rec("t3", Status::NotTested, ErrorType::None),
            ],
        );
        let cmp = compare(&a, &a);
        assert!(cmp.records.is_empty());
        assert_eq!(cmp.tally.unchanged, 3);
        assert_eq!(cmp.tally.unchanged_by_status[&Status::Passed], 1);
        assert!(cmp.is_complete());
    }

    #[test]
    fn test_status_change_merges_both_sides() {
        let a = run("a", vec![rec("t2", Status::Failed, ErrorType::QueryException)]);
        let b = run("b", vec![rec("t2", Status::Passed, ErrorType::None)]);
        let cmp = compare(&a, &b);

        let merged = cmp.get("t2").unwrap();
        assert_eq!(merged.get("status"), Some("Failed"));
        assert_eq!(merged.get("status-run2"), Some("Passed"));
        assert_eq!(merged.secondary("errorType"), Some(""));
        assert_eq!(
            merged.change,
            Change::StatusChanged {
                from: Status::Failed,
                to: Status::Passed
            }
        );
        assert_eq!(cmp.tally.transition(&Status::Failed, &Status::Passed), 1);
    }

    #[test]
    fn test_error_type_only_change_is_emitted_without_transition() {
        let a = run("a", vec![rec("t", Status::Failed, ErrorType::QueryException)]);
        let b = run("b", vec![rec("t", Status::Failed, ErrorType::ServerError)]);
        let cmp = compare(&a, &b);
        assert_eq!(cmp.records.len(), 1);
        assert_eq!(cmp.tally.total_transitions(), 0);
        assert_eq!(cmp.tally.error_type_only, 1);
        assert!(matches!(
            cmp.get("t").unwrap().change,
            Change::ErrorTypeChanged { .. }
        ));
    }

    #[test]
    fn test_payload_change_is_ignored_in_status_mode() {
        let a = run(
            "a",
            vec![rec("t", Status::Passed, ErrorType::None).with_field("queryLog", "old")],
        );
        let b = run(
            "b",
            vec![rec("t", Status::Passed, ErrorType::None).with_field("queryLog", "new")],
        );
        let cmp = compare(&a, &b);
        assert!(cmp.records.is_empty());
        assert_eq!(cmp.tally.unchanged, 1);
    }

    #[test]
    fn test_only_in_first_is_mirrored_with_sentinel() {
        let a = run(
            "a",
            vec![rec("t", Status::Intended, ErrorType::None).with_field("query", "q.rq")],
        );
        let b = run("b", vec![]);
        let cmp = compare(&a, &b);
        let merged = cmp.get("t").unwrap();
        assert_eq!(merged.primary("query"), Some("q.rq"));
        assert_eq!(merged.secondary("query"), Some(DEFAULT_SENTINEL));
        assert_eq!(merged.secondary("name"), Some(DEFAULT_SENTINEL));
        assert_eq!(cmp.tally.added[&Status::Intended], 1);
    }

    #[test]
    fn test_only_in_second_backfills_identity() {
        let a = run("a", vec![]);
        let b = run(
            "b",
            vec![rec("t3", Status::Failed, ErrorType::ServerError).with_field("serverLog", "x")],
        );
        let cmp = compare(&a, &b);
        let merged = cmp.get("t3").unwrap();
        assert_eq!(merged.primary("name"), Some("t3"));
        assert_eq!(merged.primary("group"), Some("bind"));
        assert_eq!(merged.primary("typeName"), Some("QueryEvaluationTest"));
        assert_eq!(merged.primary("status"), Some(DEFAULT_SENTINEL));
        assert_eq!(merged.primary("serverLog"), Some(DEFAULT_SENTINEL));
        assert_eq!(merged.secondary("status"), Some("Failed"));
        assert_eq!(merged.secondary("serverLog"), Some("x"));
        assert_eq!(cmp.tally.deleted, 1);
    }

    #[test]
    fn test_inputs_are_not_mutated() {
        let a = run("a", vec![rec("t", Status::Failed, ErrorType::QueryException)]);
        let b = run("b", vec![rec("t", Status::Passed, ErrorType::None)]);
        let before = a.clone();
        let first = compare(&a, &b);
        let second = compare(&a, &b);
        assert_eq!(a, before);
        assert_eq!(first, second);
        assert!(a.get("t").unwrap().get("status-run2").is_none());
    }

    #[test]
    fn test_order_is_first_run_then_second_only() {
        let a = run(
            "a",
            vec![
                rec("z", Status::Passed, ErrorType::None),
                rec("a", Status::Passed, ErrorType::None),
            ],
        );
        let b = run(
            "b",
            vec![
                rec("new2", Status::Passed, ErrorType::None),
                rec("a", Status::Failed, ErrorType::None),
                rec("new1", Status::Passed, ErrorType::None),
            ],
        );
        let cmp = compare(&a, &b);
        let names: Vec<&str> = cmp.records.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["z", "a", "new2", "new1"]);
    }

    #[test]
    fn test_missing_status_is_skipped_and_flagged() {
        let mut broken = rec("bad", Status::Passed, ErrorType::None);
        broken.status = None;
        let a = run(
            "a",
            vec![broken, rec("ok", Status::Failed, ErrorType::QueryException)],
        );
        let b = run(
            "b",
            vec![
                rec("bad", Status::Passed, ErrorType::None),
                rec("ok", Status::Passed, ErrorType::None),
            ],
        );
        let cmp = compare(&a, &b);
        assert!(!cmp.is_complete());
        assert_eq!(cmp.skipped[0].test, "bad");
        assert_eq!(cmp.skipped[0].run, "a");
        assert_eq!(cmp.records.len(), 1);
        assert!(cmp.get("ok").is_some());
    }

    #[test]
    fn test_field_level_skips_log_fields() {
        let a = run(
            "a",
            vec![rec("t", Status::Passed, ErrorType::None)
                .with_field("queryLog", "old")
                .with_field("indexLog", "old")],
        );
        let b = run(
            "b",
            vec![rec("t", Status::Passed, ErrorType::None)
                .with_field("queryLog", "new")
                .with_field("indexLog", "new")],
        );
        let options = CompareOptions {
            mode: CompareMode::FieldLevel,
            ..CompareOptions::default()
        };
        let cmp = compare_with(&a, &b, &options);
        assert!(cmp.records.is_empty());
        assert_eq!(cmp.tally.unchanged, 1);
    }

    #[test]
    fn test_field_level_carries_only_differing_fields() {
        let a = run(
            "a",
            vec![rec("t", Status::Passed, ErrorType::None).with_field("gotHtml", "1")],
        );
        let b = run(
            "b",
            vec![rec("t", Status::Passed, ErrorType::None).with_field("gotHtml", "2")],
        );
        let options = CompareOptions {
            mode: CompareMode::FieldLevel,
            ..CompareOptions::default()
        };
        let cmp = compare_with(&a, &b, &options);
        let merged = cmp.get("t").unwrap();
        assert_eq!(merged.get("gotHtml-diff"), Some("2"));
        assert!(merged.get("status-diff").is_none());
        assert_eq!(
            merged.change,
            Change::FieldsChanged {
                fields: vec!["gotHtml".to_string()]
            }
        );
    }

    #[test]
    fn test_field_level_one_sided_records_use_diff_suffix() {
        let a = run(
            "a",
            vec![rec("gone", Status::Failed, ErrorType::QueryException).with_field("query", "q1")],
        );
        let b = run(
            "b",
            vec![rec("new", Status::Passed, ErrorType::None).with_field("query", "q2")],
        );
        let options = CompareOptions {
            mode: CompareMode::FieldLevel,
            sentinel: "-".to_string(),
        };
        let cmp = compare_with(&a, &b, &options);

        let gone = cmp.get("gone").unwrap();
        assert_eq!(gone.suffix(), "-diff");
        assert_eq!(gone.get("query"), Some("q1"));
        assert_eq!(gone.get("query-diff"), Some("-"));
        assert_eq!(gone.get("status-diff"), Some("-"));
        assert!(gone.get("status-run2").is_none());

        let new = cmp.get("new").unwrap();
        assert_eq!(new.get("name"), Some("new"));
        assert_eq!(new.get("status"), Some("-"));
        assert_eq!(new.get("status-diff"), Some("Passed"));
        assert_eq!(new.get("query-diff"), Some("q2"));

        assert_eq!(cmp.tally.added[&Status::Failed], 1);
        assert_eq!(cmp.tally.deleted, 1);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("status".parse::<CompareMode>().unwrap(), CompareMode::StatusGated);
        assert_eq!("Field".parse::<CompareMode>().unwrap(), CompareMode::FieldLevel);
        assert!("fuzzy".parse::<CompareMode>().is_err());
    }
}
