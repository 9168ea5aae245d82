//! runview -- viewer and comparison engine for SPARQL test-suite run reports.
//!
//! This crate loads run result files into an in-memory store, projects and
//! compares runs, filters/searches/sorts the resulting records, and serves
//! everything over an HTTP JSON API for the browser front-end.

pub mod api;
pub mod compare;
pub mod config;
pub mod model;
pub mod project;
pub mod query;
pub mod store;
pub mod view;

use anyhow::{Context, Result};
use config::{ResultsConfig, ViewerConfig};
use store::discovery::{discover_dir, discover_url};
use store::{DefaultFetcher, LoadReport, ResultStore};

/// Discover and load every run file described by `results`.
///
/// Discovery failure is fatal; individual run files that fail to load are
/// skipped and listed in the returned report.
pub async fn load_results(results: &ResultsConfig) -> Result<(ResultStore, LoadReport)> {
    let fetcher =
        DefaultFetcher::new(results.fetch_timeout()).context("failed to build HTTP client")?;

    let sources = match &results.index_url {
        Some(url) => discover_url(fetcher.client(), url)
            .await
            .with_context(|| format!("failed to read results index {url}"))?,
        None => discover_dir(&results.dir)
            .await
            .with_context(|| {
                format!("failed to list results directory {}", results.dir.display())
            })?,
    };

    Ok(ResultStore::load(&sources, &fetcher).await)
}

/// Start the viewer: load results, then serve the API (and static front-end).
pub async fn serve(config: &ViewerConfig) -> Result<()> {
    let (store, report) = load_results(&config.results).await?;
    if !report.is_complete() {
        tracing::warn!(
            failed = report.failed.len(),
            "serving a partial result set; some run files could not be loaded"
        );
    }

    let state = api::state::AppState::new(store, config.compare.options())
        .with_load_failures(report.failed);
    let app = api::router(state, config.server.www_dir.as_deref());

    let addr: std::net::SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", config.server.bind))?;

    tracing::info!(%addr, "runview listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
