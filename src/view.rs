//! Application view state.
//!
//! Which run is shown, which run it is compared against, the selected test,
//! and the filter/search/sort settings all live in one [`ViewState`] that
//! callers own and pass in. Rendering reads the store and the state and
//! returns a fresh [`View`]; nothing here is global.

use crate::compare::{
    compare_with, CompareOptions, MalformedRecordError, MergedRecord, TransitionTally,
};
use crate::model::ResultRecord;
use crate::project::project;
use crate::query::{filter, search, sort, Constraints, RecordView, SortOrder};
use crate::store::{ResultStore, StoreError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("no run selected")]
    NoRunSelected,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub selected_run: Option<String>,
    pub compared_run: Option<String>,
    pub selected_test: Option<String>,
    /// `None` means every observed value is allowed.
    pub constraints: Option<Constraints>,
    pub search: String,
    pub sort: Option<SortOrder>,
}

impl ViewState {
    /// Initial state: the first loaded run is selected, nothing compared.
    pub fn new(store: &ResultStore) -> Self {
        Self {
            selected_run: store.first_run().map(str::to_string),
            ..Self::default()
        }
    }

    pub fn select_run(&mut self, run: &str) {
        self.selected_run = Some(run.to_string());
        self.selected_test = None;
    }

    /// Compare against `run`; choosing the current comparison run again clears it.
    pub fn toggle_compared_run(&mut self, run: &str) {
        if self.compared_run.as_deref() == Some(run) {
            self.compared_run = None;
        } else {
            self.compared_run = Some(run.to_string());
        }
        self.selected_test = None;
    }

    pub fn select_test(&mut self, test: &str) {
        self.selected_test = Some(test.to_string());
    }

    pub fn toggle_sort(&mut self, key: &str) {
        self.sort = Some(SortOrder::toggle(self.sort.as_ref(), key));
    }

    pub fn render(&self, store: &ResultStore, options: &CompareOptions) -> Result<View, ViewError> {
        let run_name = self.selected_run.as_deref().ok_or(ViewError::NoRunSelected)?;
        let first = store.get(run_name)?;

        match self.compared_run.as_deref() {
            None => {
                let records = project(first);
                let (records, constraints) = self.apply(&records);
                Ok(View {
                    rows: Rows::Single(records),
                    constraints,
                    tally: None,
                    skipped: Vec::new(),
                })
            }
            Some(second_name) => {
                let second = store.get(second_name)?;
                let comparison = compare_with(first, second, options);
                let (records, constraints) = self.apply(&comparison.to_vec());
                Ok(View {
                    rows: Rows::Compared(records),
                    constraints,
                    tally: Some(comparison.tally),
                    skipped: comparison.skipped,
                })
            }
        }
    }

    fn apply<R: RecordView + Clone>(&self, records: &[R]) -> (Vec<R>, Constraints) {
        let constraints = self
            .constraints
            .clone()
            .unwrap_or_else(|| Constraints::observed(records));
        let filtered = filter(records, &constraints);
        let found = search(&filtered, &self.search);
        let rows = match &self.sort {
            Some(order) => sort(&found, &order.key, order.direction),
            None => found,
        };
        (rows, constraints)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "records", rename_all = "snake_case")]
pub enum Rows {
    Single(Vec<ResultRecord>),
    Compared(Vec<MergedRecord>),
}

impl Rows {
    pub fn len(&self) -> usize {
        match self {
            Rows::Single(records) => records.len(),
            Rows::Compared(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn names(&self) -> Vec<&str> {
        match self {
            Rows::Single(records) => records.iter().map(|r| r.name.as_str()).collect(),
            Rows::Compared(records) => records.iter().map(|r| RecordView::name(r)).collect(),
        }
    }
}

/// What the presentation layer draws.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct View {
    pub rows: Rows,
    /// Effective whitelists, for rendering the filter controls.
    pub constraints: Constraints,
    pub tally: Option<TransitionTally>,
    pub skipped: Vec<MalformedRecordError>,
}

impl View {
    /// `false` when the comparison left out malformed records.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}
