//! One test's outcome as stored in a run file.

use super::status::{ErrorType, Status};
use super::ParseError;
use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

pub const NAME: &str = "name";
pub const STATUS: &str = "status";
pub const ERROR_TYPE: &str = "errorType";
pub const GROUP: &str = "group";
pub const TYPE_NAME: &str = "typeName";
pub const FEATURE: &str = "feature";
/// Older run files write `type` instead of `typeName`.
pub const TYPE_ALIAS: &str = "type";

/// Keys that identify a test in the table, regardless of which run it came from.
pub const IDENTITY_FIELDS: [&str; 3] = [NAME, GROUP, TYPE_NAME];

/// A single test result.
///
/// Identity and classification are typed; everything else (query text,
/// logs, expected/actual results, approval metadata) is opaque payload kept
/// in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    pub name: String,
    /// `None` when the run file omitted the field.
    pub status: Option<Status>,
    pub error_type: ErrorType,
    pub group: String,
    pub type_name: String,
    pub feature: String,
    pub payload: IndexMap<String, String>,
    source: SourceForm,
}

/// How the run file spelled the typed fields, where that differs from the
/// canonical form. Only serialization reads it.
#[derive(Debug, Clone, Default, PartialEq)]
struct SourceForm {
    status: Option<String>,
    error_type: Option<String>,
    type_alias: bool,
    /// Typed keys the file did not contain.
    omitted: Vec<&'static str>,
}

impl ResultRecord {
    pub fn new(name: impl Into<String>, status: Status) -> Self {
        Self {
            name: name.into(),
            status: Some(status),
            error_type: ErrorType::None,
            group: String::new(),
            type_name: String::new(),
            feature: String::new(),
            payload: IndexMap::new(),
            source: SourceForm::default(),
        }
    }

    pub fn with_error_type(mut self, error_type: ErrorType) -> Self {
        self.error_type = error_type;
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = type_name.into();
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Build a record from the JSON object stored under `key` in a run file.
    ///
    /// A missing `name` is backfilled from `key`. A missing `status` is kept
    /// as `None` so the comparator can report it.
    pub fn from_json(key: &str, value: &Value) -> Result<Self, ParseError> {
        let object = value.as_object().ok_or_else(|| ParseError::NotAnObject {
            key: key.to_string(),
        })?;

        let mut record = Self {
            name: key.to_string(),
            status: None,
            error_type: ErrorType::None,
            group: String::new(),
            type_name: String::new(),
            feature: String::new(),
            payload: IndexMap::new(),
            source: SourceForm::default(),
        };

        for (field, raw) in object {
            let text = scalar_to_string(raw);
            match field.as_str() {
                NAME => {
                    if !text.is_empty() {
                        record.name = text;
                    }
                }
                STATUS => {
                    if !raw.is_null() {
                        let status = Status::parse(&text);
                        if status.as_str() != text {
                            record.source.status = Some(text);
                        }
                        record.status = Some(status);
                    }
                }
                ERROR_TYPE => {
                    let error_type = ErrorType::parse(&text);
                    if error_type.as_str() != text {
                        record.source.error_type = Some(text);
                    }
                    record.error_type = error_type;
                }
                GROUP => record.group = text,
                TYPE_NAME => record.type_name = text,
                TYPE_ALIAS => {
                    record.type_name = text;
                    record.source.type_alias = true;
                }
                FEATURE => record.feature = text,
                _ => {
                    record.payload.insert(field.clone(), text);
                }
            }
        }

        for key in [ERROR_TYPE, GROUP, TYPE_NAME, FEATURE] {
            let present = object.contains_key(key)
                || (key == TYPE_NAME && object.contains_key(TYPE_ALIAS));
            if !present {
                record.source.omitted.push(key);
            }
        }

        Ok(record)
    }

    /// Value of `key` as it would appear in the run file.
    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            NAME => Some(&self.name),
            STATUS => self.status.as_ref().map(Status::as_str),
            ERROR_TYPE => Some(self.error_type.as_str()),
            GROUP => Some(&self.group),
            TYPE_NAME => Some(&self.type_name),
            FEATURE => Some(&self.feature),
            _ => self.payload.get(key).map(String::as_str),
        }
    }

    /// Every field, identity and classification first, then payload in source order.
    pub fn fields(&self) -> Vec<(&str, &str)> {
        let mut out = Vec::with_capacity(6 + self.payload.len());
        out.push((NAME, self.name.as_str()));
        if let Some(status) = &self.status {
            out.push((STATUS, status.as_str()));
        }
        out.push((ERROR_TYPE, self.error_type.as_str()));
        out.push((GROUP, self.group.as_str()));
        out.push((TYPE_NAME, self.type_name.as_str()));
        out.push((FEATURE, self.feature.as_str()));
        out.extend(self.payload.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        out
    }

    /// Fields as the run file wrote them: original literals and keys, and
    /// no empty typed key the file left out. `name` is always present.
    pub fn source_fields(&self) -> Vec<(&str, &str)> {
        let raw_status = self
            .source
            .status
            .as_deref()
            .filter(|raw| self.status.as_ref() == Some(&Status::parse(raw)));
        let raw_error_type = self
            .source
            .error_type
            .as_deref()
            .filter(|raw| ErrorType::parse(raw) == self.error_type);

        self.fields()
            .into_iter()
            .filter(|(key, value)| {
                !(value.is_empty() && self.source.omitted.iter().any(|k| *k == *key))
            })
            .map(|(key, value)| match key {
                STATUS => (key, raw_status.unwrap_or(value)),
                ERROR_TYPE => (key, raw_error_type.unwrap_or(value)),
                TYPE_NAME if self.source.type_alias => (TYPE_ALIAS, value),
                _ => (key, value),
            })
            .collect()
    }
}

impl Serialize for ResultRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = self.source_fields();
        let mut map = serializer.serialize_map(Some(fields.len()))?;
        for (key, value) in fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Flatten a JSON scalar to the string form used for display and comparison.
pub(crate) fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
