//! Discovery of available run files.
//!
//! A results location is either an HTTP directory listing (any page whose
//! anchors point at run files) or a local directory. Run files are
//! `*.json`, or `*.json.bz2` as written by the test-suite runner.

use super::source::{is_run_file, run_name_from_file, FetchError, RunSource};
use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;
use reqwest::{Client, Url};
use std::path::Path;
use tracing::{debug, info};

/// Fetch the listing at `index_url` and return one source per linked run file.
pub async fn discover_url(client: &Client, index_url: &str) -> Result<Vec<RunSource>, FetchError> {
    let base = Url::parse(index_url).map_err(|e| FetchError::InvalidUrl {
        url: index_url.to_string(),
        reason: e.to_string(),
    })?;

    let body = client
        .get(base.clone())
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let mut sources = Vec::new();
    for href in extract_hrefs(&body) {
        let Ok(url) = base.join(&href) else {
            debug!(%href, "skipping unresolvable link");
            continue;
        };
        let Some(segment) = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
        else {
            continue;
        };
        let Ok(file_name) = percent_decode_str(segment).decode_utf8() else {
            debug!(%href, "skipping link with a non-UTF-8 file name");
            continue;
        };
        if !is_run_file(&file_name) {
            continue;
        }
        let name = run_name_from_file(&file_name);
        if sources.iter().any(|s: &RunSource| s.name == name) {
            continue;
        }
        sources.push(RunSource::url(name, url.to_string()));
    }

    info!(index = %index_url, runs = sources.len(), "discovered run files");
    Ok(sources)
}

/// List `*.json` and `*.json.bz2` files in `dir`, sorted by file name.
pub async fn discover_dir(dir: &Path) -> Result<Vec<RunSource>, FetchError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_run = path
            .file_name()
            .map(|n| is_run_file(&n.to_string_lossy()))
            .unwrap_or(false);
        if is_run && entry.file_type().await?.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    info!(dir = %dir.display(), runs = paths.len(), "discovered run files");
    Ok(paths.into_iter().map(RunSource::path).collect())
}

static HREF_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)href\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>"']+))"#).unwrap()
});

/// Pull every `href` attribute value out of an HTML document.
pub fn extract_hrefs(html: &str) -> Vec<String> {
    HREF_REGEX
        .captures_iter(html)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)))
        .map(|m| m.as_str())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}
