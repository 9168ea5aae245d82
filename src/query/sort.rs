use super::RecordView;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown sort direction `{0}` (expected `asc` or `desc`)")]
pub struct ParseDirectionError(String);

impl FromStr for SortDirection {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Ascending),
            "desc" | "descending" => Ok(SortDirection::Descending),
            other => Err(ParseDirectionError(other.to_string())),
        }
    }
}

/// Sort key and direction chosen by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    pub key: String,
    pub direction: SortDirection,
}

impl SortOrder {
    pub fn ascending(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            direction: SortDirection::Ascending,
        }
    }

    /// Sorting by the same key again flips the direction; a new key starts ascending.
    pub fn toggle(current: Option<&SortOrder>, key: &str) -> Self {
        match current {
            Some(order) if order.key == key => Self {
                key: order.key.clone(),
                direction: order.direction.toggled(),
            },
            _ => Self::ascending(key),
        }
    }
}

/// Stable sort on the string value of `key`; missing values sort as "".
///
/// Records with equal keys keep their input order in both directions.
pub fn sort<R: RecordView + Clone>(records: &[R], key: &str, direction: SortDirection) -> Vec<R> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| {
        let left = a.field(key).unwrap_or_default();
        let right = b.field(key).unwrap_or_default();
        match direction {
            SortDirection::Ascending => left.cmp(right),
            SortDirection::Descending => right.cmp(left),
        }
    });
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ResultRecord, Status};

    fn records() -> Vec<ResultRecord> {
        vec![
            ResultRecord::new("a", Status::Passed),
            ResultRecord::new("b", Status::Failed),
            ResultRecord::new("c", Status::Passed),
            ResultRecord::new("d", Status::Failed),
        ]
    }

    fn names(records: &[ResultRecord]) -> Vec<&str> {
        records.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_toggle_flips_direction_and_is_stable() {
        let records = records();

        let order = SortOrder::toggle(None, "status");
        assert_eq!(order.direction, SortDirection::Ascending);
        let asc = sort(&records, &order.key, order.direction);
        assert_eq!(names(&asc), vec!["b", "d", "a", "c"]);

        let order = SortOrder::toggle(Some(&order), "status");
        assert_eq!(order.direction, SortDirection::Descending);
        let desc = sort(&records, &order.key, order.direction);
        assert_eq!(names(&desc), vec!["a", "c", "b", "d"]);
    }

    #[test]
    fn test_new_key_resets_to_ascending() {
        let order = SortOrder {
            key: "status".to_string(),
            direction: SortDirection::Descending,
        };
        assert_eq!(SortOrder::toggle(Some(&order), "name"), SortOrder::ascending("name"));
    }

    #[test]
    fn test_input_is_untouched() {
        let records = records();
        let _ = sort(&records, "name", SortDirection::Descending);
        assert_eq!(names(&records), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_missing_field_sorts_first() {
        let records = vec![
            ResultRecord::new("x", Status::Passed).with_field("comment", "zzz"),
            ResultRecord::new("y", Status::Passed),
        ];
        let sorted = sort(&records, "comment", SortDirection::Ascending);
        assert_eq!(names(&sorted), vec!["y", "x"]);
    }

    #[test]
    fn test_direction_parsing() {
        assert_eq!("DESC".parse::<SortDirection>().unwrap(), SortDirection::Descending);
        assert!("up".parse::<SortDirection>().is_err());
    }
}
