use crate::compare::CompareOptions;
use crate::store::{LoadError, ResultStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ResultStore>,
    /// Defaults for `/compare`; `mode` can be overridden per request.
    pub compare: CompareOptions,
    /// Run files that were discovered but could not be loaded.
    pub load_failures: Arc<Vec<LoadError>>,
}

impl AppState {
    pub fn new(store: ResultStore, compare: CompareOptions) -> Self {
        Self {
            store: Arc::new(store),
            compare,
            load_failures: Arc::new(Vec::new()),
        }
    }

    pub fn with_load_failures(mut self, failures: Vec<LoadError>) -> Self {
        self.load_failures = Arc::new(failures);
        self
    }

    pub fn is_complete(&self) -> bool {
        self.load_failures.is_empty()
    }
}
