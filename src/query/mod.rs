//! Filtering, keyword search, and sorting over record lists.
//!
//! Every operation takes a slice and returns a new `Vec`; inputs are never
//! reordered or modified. The presentation layer composes them as
//! filter, then search, then sort.

pub mod filter;
pub mod search;
pub mod sort;

pub use filter::{filter, Constraints};
pub use search::search;
pub use sort::{sort, SortDirection, SortOrder};

use crate::compare::MergedRecord;
use crate::model::record::{ERROR_TYPE, GROUP, NAME, STATUS, TYPE_NAME};
use crate::model::ResultRecord;

/// Read access to the display fields of a record.
///
/// Implemented by single-run records and by merged records, whose
/// unsuffixed keys hold the first run's values.
pub trait RecordView {
    fn field(&self, key: &str) -> Option<&str>;

    fn name(&self) -> &str {
        self.field(NAME).unwrap_or_default()
    }

    fn status(&self) -> &str {
        self.field(STATUS).unwrap_or_default()
    }

    fn error_type(&self) -> &str {
        self.field(ERROR_TYPE).unwrap_or_default()
    }

    fn type_name(&self) -> &str {
        self.field(TYPE_NAME).unwrap_or_default()
    }

    fn group(&self) -> &str {
        self.field(GROUP).unwrap_or_default()
    }
}

impl RecordView for ResultRecord {
    fn field(&self, key: &str) -> Option<&str> {
        self.get(key)
    }
}

impl RecordView for MergedRecord {
    fn field(&self, key: &str) -> Option<&str> {
        self.get(key)
    }
}
