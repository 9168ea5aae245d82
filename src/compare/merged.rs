use crate::model::{ErrorType, Status};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};

/// How a merged record differs between the two runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Change {
    StatusChanged {
        from: Status,
        to: Status,
    },
    ErrorTypeChanged {
        status: Status,
        from: ErrorType,
        to: ErrorType,
    },
    /// Field-level comparison only: neither status nor errorType moved.
    FieldsChanged { fields: Vec<String> },
    OnlyInFirst { status: Status },
    OnlyInSecond { status: Option<Status> },
}

/// A test as seen by both runs.
///
/// The first run's fields sit under their original keys, the second run's
/// under `<key><suffix>`. Serializes as the flat field map.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRecord {
    pub change: Change,
    suffix: &'static str,
    fields: IndexMap<String, String>,
}

impl MergedRecord {
    pub(crate) fn new(change: Change, suffix: &'static str) -> Self {
        Self {
            change,
            suffix,
            fields: IndexMap::new(),
        }
    }

    pub(crate) fn set_primary(&mut self, key: &str, value: &str) {
        self.fields.insert(key.to_string(), value.to_string());
    }

    pub(crate) fn set_secondary(&mut self, key: &str, value: &str) {
        self.fields
            .insert(format!("{key}{}", self.suffix), value.to_string());
    }

    /// The first run's value of `key`.
    pub fn primary(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// The second run's value of `key`.
    pub fn secondary(&self, key: &str) -> Option<&str> {
        self.fields
            .get(&format!("{key}{}", self.suffix))
            .map(String::as_str)
    }

    /// Raw lookup by full key, suffixed or not.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn suffix(&self) -> &'static str {
        self.suffix
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Serialize for MergedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}
