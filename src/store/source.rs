//! Where run files come from and how their bytes are fetched.

use async_trait::async_trait;
use bzip2::read::BzDecoder;
use reqwest::Client;
use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("bzip2: {0}")]
    Decompress(std::io::Error),
}

/// Location of one run file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Url(String),
    Path(PathBuf),
}

impl Location {
    pub fn is_compressed(&self) -> bool {
        match self {
            Location::Url(url) => url.ends_with(BZ2_SUFFIX),
            Location::Path(path) => path.to_string_lossy().ends_with(BZ2_SUFFIX),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Url(url) => f.write_str(url),
            Location::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A named run file to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSource {
    pub name: String,
    pub location: Location,
}

impl RunSource {
    pub fn url(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: Location::Url(url.into()),
        }
    }

    /// Source for a local file; the run is named after the file.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| run_name_from_file(&n.to_string_lossy()))
            .unwrap_or_default();
        Self {
            name,
            location: Location::Path(path),
        }
    }
}

const JSON_SUFFIX: &str = ".json";
const BZ2_SUFFIX: &str = ".bz2";

/// `true` for `*.json` and `*.json.bz2`.
pub fn is_run_file(file_name: &str) -> bool {
    file_name
        .strip_suffix(BZ2_SUFFIX)
        .unwrap_or(file_name)
        .ends_with(JSON_SUFFIX)
}

/// Run name for a file name: the `.json` (or `.json.bz2`) suffix is stripped.
pub fn run_name_from_file(file_name: &str) -> String {
    let stem = file_name
        .strip_suffix(BZ2_SUFFIX)
        .filter(|s| s.ends_with(JSON_SUFFIX))
        .unwrap_or(file_name);
    stem.strip_suffix(JSON_SUFFIX).unwrap_or(stem).to_string()
}

/// Fetches the raw bytes of a run file.
#[async_trait]
pub trait RunFetcher: Send + Sync {
    async fn fetch(&self, location: &Location) -> Result<Vec<u8>, FetchError>;
}

/// Fetcher for both HTTP(S) URLs and local paths.
pub struct DefaultFetcher {
    client: Client,
}

impl DefaultFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl RunFetcher for DefaultFetcher {
    async fn fetch(&self, location: &Location) -> Result<Vec<u8>, FetchError> {
        let bytes = match location {
            Location::Url(url) => {
                let response = self.client.get(url).send().await?.error_for_status()?;
                response.bytes().await?.to_vec()
            }
            Location::Path(path) => tokio::fs::read(path).await?,
        };
        if location.is_compressed() {
            decompress(bytes).await
        } else {
            Ok(bytes)
        }
    }
}

async fn decompress(bytes: Vec<u8>) -> Result<Vec<u8>, FetchError> {
    let inflate = move || -> std::io::Result<Vec<u8>> {
        let mut out = Vec::new();
        BzDecoder::new(bytes.as_slice()).read_to_end(&mut out)?;
        Ok(out)
    };
    tokio::task::spawn_blocking(inflate)
        .await
        .map_err(|e| FetchError::Decompress(std::io::Error::other(e)))?
        .map_err(FetchError::Decompress)
}
