//! Run data model -- test records, status classification, and per-run aggregates.

pub mod record;
pub mod status;

pub use record::ResultRecord;
pub use status::{ErrorType, Status};

use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

/// Reserved key holding the aggregate counts of a run.
pub const INFO_KEY: &str = "info";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("run document must be a JSON object")]
    NotAMapping,

    #[error("entry `{key}` is not a JSON object")]
    NotAnObject { key: String },

    #[error("`info` entry is malformed: {reason}")]
    InvalidInfo { reason: String },
}

/// Aggregate counts written by the test-suite runner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunInfo {
    pub tests: u64,
    pub passed: u64,
    pub passed_failed: u64,
    pub failed: u64,
    pub not_tested: u64,
}

impl RunInfo {
    /// Recompute the aggregate from the records themselves.
    pub fn derive<'a>(records: impl IntoIterator<Item = &'a ResultRecord>) -> Self {
        let mut info = RunInfo::default();
        for record in records {
            info.tests += 1;
            match record.status {
                Some(Status::Passed) => info.passed += 1,
                Some(Status::Failed) => info.failed += 1,
                Some(Status::Intended) => info.passed_failed += 1,
                _ => info.not_tested += 1,
            }
        }
        info
    }
}

/// All records of one run, keyed by test name in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct RunMapping {
    pub name: String,
    pub tests: IndexMap<String, ResultRecord>,
    pub info: RunInfo,
}

impl RunMapping {
    /// Build a mapping from records; `info` is derived.
    pub fn new(name: impl Into<String>, records: impl IntoIterator<Item = ResultRecord>) -> Self {
        let tests: IndexMap<String, ResultRecord> =
            records.into_iter().map(|r| (r.name.clone(), r)).collect();
        let info = RunInfo::derive(tests.values());
        Self {
            name: name.into(),
            tests,
            info,
        }
    }

    pub fn parse(name: &str, bytes: &[u8]) -> Result<Self, ParseError> {
        let value: Value = serde_json::from_slice(bytes)?;
        Self::from_json(name, &value)
    }

    /// Build a mapping from a decoded run document.
    ///
    /// Accepts both the flat layout `{test.., "info": {..}}` and the wrapped
    /// layout `{"<run>": {test.., "info": {..}}}`.
    pub fn from_json(name: &str, value: &Value) -> Result<Self, ParseError> {
        let mut object = value.as_object().ok_or(ParseError::NotAMapping)?;

        if object.len() == 1 {
            if let Some((key, Value::Object(inner))) = object.iter().next() {
                if key == name || inner.contains_key(INFO_KEY) {
                    object = inner;
                }
            }
        }

        let mut tests = IndexMap::with_capacity(object.len());
        let mut info = None;
        for (key, entry) in object {
            if key == INFO_KEY {
                let parsed = serde_json::from_value::<RunInfo>(entry.clone()).map_err(|e| {
                    ParseError::InvalidInfo {
                        reason: e.to_string(),
                    }
                })?;
                info = Some(parsed);
                continue;
            }
            let record = ResultRecord::from_json(key, entry)?;
            tests.insert(key.clone(), record);
        }

        let info = info.unwrap_or_else(|| RunInfo::derive(tests.values()));
        Ok(Self {
            name: name.to_string(),
            tests,
            info,
        })
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    pub fn get(&self, test: &str) -> Option<&ResultRecord> {
        self.tests.get(test)
    }
}

/// Serializes back to the flat run-file layout, `info` last.
impl Serialize for RunMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.tests.len() + 1))?;
        for (key, record) in &self.tests {
            map.serialize_entry(key, record)?;
        }
        map.serialize_entry(INFO_KEY, &self.info)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_layout_excludes_info() {
        let doc = json!({
            "t1": { "name": "t1", "status": "Passed", "errorType": "" },
            "t2": { "name": "t2", "status": "Failed", "errorType": "QUERY EXCEPTION" },
            "info": {
                "name": "info", "tests": 3, "passed": 1,
                "passedFailed": 0, "failed": 1, "notTested": 1
            }
        });
        let run = RunMapping::from_json("r1", &doc).unwrap();
        assert_eq!(run.len(), 2);
        assert!(run.get("info").is_none());
        assert_eq!(run.info.tests, 3);
        assert_eq!(run.info.not_tested, 1);
    }

    #[test]
    fn test_wrapped_layout_is_unwrapped() {
        let doc = json!({
            "nightly": {
                "t1": { "status": "Passed" },
                "info": { "tests": 1, "passed": 1, "passedFailed": 0, "failed": 0, "notTested": 0 }
            }
        });
        let run = RunMapping::from_json("nightly", &doc).unwrap();
        assert_eq!(run.len(), 1);
        assert_eq!(run.tests.get_index(0).unwrap().0, "t1");
    }

    #[test]
    fn test_missing_info_is_derived() {
        let doc = json!({
            "a": { "status": "Passed" },
            "b": { "status": "Failed: Intended" },
            "c": { "status": "NOT TESTED" }
        });
        let run = RunMapping::from_json("r", &doc).unwrap();
        assert_eq!(
            run.info,
            RunInfo {
                tests: 3,
                passed: 1,
                passed_failed: 1,
                failed: 0,
                not_tested: 1
            }
        );
    }

    #[test]
    fn test_insertion_order_is_kept() {
        let bytes =
            br#"{"z": {"status": "Passed"}, "a": {"status": "Passed"}, "m": {"status": "Failed"}}"#;
        let run = RunMapping::parse("r", bytes).unwrap();
        let names: Vec<&str> = run.tests.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_rejects_non_object_document() {
        assert!(matches!(
            RunMapping::parse("r", b"[1, 2]"),
            Err(ParseError::NotAMapping)
        ));
        assert!(matches!(RunMapping::parse("r", b"{"), Err(ParseError::Json(_))));
    }

    #[test]
    fn test_serialized_run_parses_back() {
        let doc = json!({
            "t1": {
                "name": "t1", "status": "Failed",
                "errorType": "SERVER ERROR", "serverLog": "down"
            },
            "info": { "tests": 1, "passed": 0, "passedFailed": 0, "failed": 1, "notTested": 0 }
        });
        let run = RunMapping::from_json("r", &doc).unwrap();
        let bytes = serde_json::to_vec(&run).unwrap();
        assert_eq!(RunMapping::parse("r", &bytes).unwrap(), run);
    }

    #[test]
    fn test_bad_info_is_reported() {
        let doc = json!({ "info": "nope" });
        assert!(matches!(
            RunMapping::from_json("r", &doc),
            Err(ParseError::InvalidInfo { .. })
        ));
    }
}
