//! Result store -- every loaded run, keyed by name, in load order.
//!
//! Loading fans out one fetch per source and joins them all before the
//! store is handed back; a source that fails to fetch or parse is logged,
//! reported in the [`LoadReport`], and skipped. The store is immutable
//! afterwards and is shared through `Arc`.

pub mod discovery;
pub mod source;

pub use source::{DefaultFetcher, FetchError, Location, RunFetcher, RunSource};

use crate::model::{ParseError, RunMapping};
use futures::future::join_all;
use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("run `{name}` not found")]
    NotFound { name: String },
}

/// Why one source could not be loaded.
#[derive(Debug, Error)]
#[error("failed to load run `{run}` from {location}: {kind}")]
pub struct LoadError {
    pub run: String,
    pub location: String,
    pub kind: LoadErrorKind,
}

impl Serialize for LoadError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("run", &self.run)?;
        map.serialize_entry("location", &self.location)?;
        map.serialize_entry("reason", &self.kind.to_string())?;
        map.end()
    }
}

#[derive(Debug, Error)]
pub enum LoadErrorKind {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("parse failed: {0}")]
    Parse(#[from] ParseError),

    #[error("a run with this name is already loaded")]
    Duplicate,
}

/// Outcome of a [`ResultStore::load`] call.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: Vec<String>,
    pub failed: Vec<LoadError>,
}

impl LoadReport {
    /// `false` when at least one requested source was skipped.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Summary line for one loaded run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub name: String,
    pub info: crate::model::RunInfo,
}

#[derive(Debug, Default, Clone)]
pub struct ResultStore {
    runs: IndexMap<String, Arc<RunMapping>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every source with `fetcher`; all fetches run concurrently.
    ///
    /// Runs are inserted in the order of `sources`, not completion order.
    pub async fn load<F>(sources: &[RunSource], fetcher: &F) -> (Self, LoadReport)
    where
        F: RunFetcher + ?Sized,
    {
        let fetches = sources.iter().map(|source| async move {
            let outcome = match fetcher.fetch(&source.location).await {
                Ok(bytes) => RunMapping::parse(&source.name, &bytes).map_err(LoadErrorKind::from),
                Err(e) => Err(LoadErrorKind::from(e)),
            };
            (source, outcome)
        });
        let settled = join_all(fetches).await;

        let mut store = Self::new();
        let mut report = LoadReport::default();
        for (source, outcome) in settled {
            let outcome = outcome.and_then(|run| {
                if store.runs.contains_key(&run.name) {
                    Err(LoadErrorKind::Duplicate)
                } else {
                    Ok(run)
                }
            });
            match outcome {
                Ok(run) => {
                    info!(run = %run.name, tests = run.len(), "loaded run");
                    report.loaded.push(run.name.clone());
                    store.insert(run);
                }
                Err(kind) => {
                    let err = LoadError {
                        run: source.name.clone(),
                        location: source.location.to_string(),
                        kind,
                    };
                    warn!(error = %err, "skipping run source");
                    report.failed.push(err);
                }
            }
        }

        info!(
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            "result store ready"
        );
        (store, report)
    }

    /// Add a run; an existing run with the same name is replaced in place.
    pub fn insert(&mut self, run: RunMapping) {
        self.runs.insert(run.name.clone(), Arc::new(run));
    }

    pub fn get(&self, name: &str) -> Result<&Arc<RunMapping>, StoreError> {
        self.runs.get(name).ok_or_else(|| StoreError::NotFound {
            name: name.to_string(),
        })
    }

    /// Run names in load order.
    pub fn list_run_names(&self) -> Vec<&str> {
        self.runs.keys().map(String::as_str).collect()
    }

    /// Default selection: the first run that was loaded.
    pub fn first_run(&self) -> Option<&str> {
        self.runs.keys().next().map(String::as_str)
    }

    pub fn summaries(&self) -> Vec<RunSummary> {
        self.runs
            .values()
            .map(|run| RunSummary {
                name: run.name.clone(),
                info: run.info.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}
