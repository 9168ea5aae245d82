//! API route definitions.

use super::state::AppState;
use super::ApiError;
use crate::compare::{compare_with, Change, CompareMode, CompareOptions, MergedRecord};
use crate::project::project;
use crate::query::{filter, search, sort, Constraints, RecordView, SortDirection};
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{Html, IntoResponse};
use axum::{routing::get, Json, Router};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use tracing::debug;

/// Characters left unescaped in a listed file name.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Separator for multi-value whitelist parameters. Commas occur inside
/// some errorType literals, so they cannot be used.
const LIST_SEPARATOR: char = '|';

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/runs", get(list_runs))
        .route("/runs/{run}", get(show_run))
        .route("/compare/{first}/{second}", get(compare_runs))
}

/// Directory-style listing of the loaded runs, so a running server can be
/// used as the index source of another instance or of the web viewer.
pub fn results_routes() -> Router<AppState> {
    Router::new()
        .route("/results", get(results_index))
        .route("/results/", get(results_index))
        .route("/results/{file}", get(results_file))
}

/// Query parameters shared by table endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TableQuery {
    pub status: Option<String>,
    #[serde(rename = "errorType")]
    pub error_type: Option<String>,
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    pub group: Option<String>,
    pub q: Option<String>,
    pub sort: Option<String>,
    pub dir: Option<String>,
    pub mode: Option<String>,
}

impl TableQuery {
    /// Whitelists from the request, falling back to every observed value.
    fn constraints<R: RecordView>(&self, records: &[R]) -> Constraints {
        let mut constraints = Constraints::observed(records);
        let overrides = [
            (&self.status, &mut constraints.statuses),
            (&self.error_type, &mut constraints.error_types),
            (&self.type_name, &mut constraints.types),
            (&self.group, &mut constraints.groups),
        ];
        for (param, whitelist) in overrides {
            if let Some(raw) = param {
                *whitelist = split_list(raw);
            }
        }
        constraints
    }

    fn apply<R: RecordView + Clone>(&self, records: &[R]) -> Result<Vec<R>, ApiError> {
        let filtered = filter(records, &self.constraints(records));
        let found = search(&filtered, self.q.as_deref().unwrap_or_default());
        match &self.sort {
            Some(key) => {
                let direction = match &self.dir {
                    Some(raw) => raw
                        .parse::<SortDirection>()
                        .map_err(|e| ApiError::BadRequest(e.to_string()))?,
                    None => SortDirection::Ascending,
                };
                Ok(sort(&found, key, direction))
            }
            None => Ok(found),
        }
    }
}

fn split_list(raw: &str) -> BTreeSet<String> {
    raw.split(LIST_SEPARATOR).map(str::to_string).collect()
}

async fn health() -> Json<Value> {
    Json(json!({
        "data": {
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION")
        },
        "meta": {
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION")
        }
    }))
}

async fn list_runs(State(state): State<AppState>) -> Json<Value> {
    let runs = state.store.summaries();
    Json(json!({
        "data": runs,
        "meta": {
            "total": runs.len(),
            "complete": state.is_complete(),
            "failed": state.load_failures.as_slice(),
        }
    }))
}

async fn show_run(
    State(state): State<AppState>,
    Path(run): Path<String>,
    Query(query): Query<TableQuery>,
) -> Result<Json<Value>, ApiError> {
    let mapping = state.store.get(&run)?;
    let records = query.apply(&project(mapping))?;
    debug!(%run, rows = records.len(), "projected run");
    Ok(Json(json!({
        "data": records,
        "meta": { "run": run, "total": records.len(), "info": mapping.info }
    })))
}

#[derive(Debug, Serialize)]
struct ComparedRow<'a> {
    change: &'a Change,
    record: &'a MergedRecord,
}

async fn compare_runs(
    State(state): State<AppState>,
    Path((first, second)): Path<(String, String)>,
    Query(query): Query<TableQuery>,
) -> Result<Json<Value>, ApiError> {
    let a = state.store.get(&first)?;
    let b = state.store.get(&second)?;

    let mode = match &query.mode {
        Some(raw) => raw
            .parse::<CompareMode>()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?,
        None => state.compare.mode,
    };
    let options = CompareOptions {
        mode,
        ..state.compare.clone()
    };

    let comparison = compare_with(a, b, &options);
    let records = query.apply(&comparison.to_vec())?;
    let rows: Vec<ComparedRow<'_>> = records
        .iter()
        .map(|record| ComparedRow {
            change: &record.change,
            record,
        })
        .collect();

    debug!(%first, %second, %mode, rows = rows.len(), "compared runs");
    Ok(Json(json!({
        "data": {
            "records": rows,
            "tally": comparison.tally,
            "skipped": comparison.skipped,
        },
        "meta": {
            "first": first,
            "second": second,
            "mode": mode.as_str(),
            "suffix": mode.suffix(),
            "total": records.len(),
            "complete": comparison.is_complete(),
        }
    })))
}

async fn results_index(State(state): State<AppState>) -> Html<String> {
    let mut body = String::from("<!DOCTYPE html>\n<html><body><ul>\n");
    for name in state.store.list_run_names() {
        let file = format!("{name}.json");
        let href = utf8_percent_encode(&file, PATH_SEGMENT);
        let text = escape_html(&file);
        body.push_str(&format!("<li><a href=\"{href}\">{text}</a></li>\n"));
    }
    body.push_str("</ul></body></html>\n");
    Html(body)
}

async fn results_file(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let name = file
        .strip_suffix(".json")
        .ok_or_else(|| ApiError::NotFound(format!("`{file}` is not a run file")))?;
    let run = state.store.get(name)?;
    let body = serde_json::to_vec(run.as_ref())
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body))
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
