//! Document fetching abstraction for testability.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, trace, warn};

/// Errors returned by a [`DocumentClient`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// The request never produced a response (DNS, connect, timeout, ...).
    #[error("Request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    /// A local document could not be read.
    #[error("Failed to read {path}: {reason}")]
    Io { path: PathBuf, reason: String },
}

/// Trait for fetching documents by URL.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock clients in tests.
pub trait DocumentClient: Send + Sync {
    /// Fetches the document at `url` and returns its body.
    fn get(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

/// Default User-Agent string for HTTP requests.
const DEFAULT_USER_AGENT: &str = concat!("cadaview/", env!("CARGO_PKG_VERSION"));

/// HTTP client implementation using reqwest.
#[derive(Clone)]
pub struct HttpDocumentClient {
    client: reqwest::Client,
}

impl HttpDocumentClient {
    /// Creates a client with the default 30 second timeout.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(30)
    }

    /// Creates a client with a custom timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(DEFAULT_USER_AGENT)
            .build()
            .map_err(|e| FetchError::Transport {
                url: String::new(),
                reason: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }
}

impl DocumentClient for HttpDocumentClient {
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        trace!(url = url, "HTTP GET request starting");

        let response = match self.client.get(url).send().await {
            Ok(resp) => {
                debug!(
                    url = url,
                    status = resp.status().as_u16(),
                    "HTTP response received"
                );
                resp
            }
            Err(e) => {
                warn!(
                    url = url,
                    error = %e,
                    is_connect = e.is_connect(),
                    is_timeout = e.is_timeout(),
                    "HTTP request failed"
                );
                return Err(FetchError::Transport {
                    url: url.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                reason: format!("Failed to read response: {}", e),
            })
    }
}

/// Reads documents from a local directory.
///
/// Relative URLs resolve against `root`; `file://` URLs and absolute paths
/// are read as-is. Query strings are ignored, the way a static file server
/// ignores them.
#[derive(Debug, Clone)]
pub struct FileDocumentClient {
    root: PathBuf,
}

impl FileDocumentClient {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path a URL maps to.
    pub fn path_for(&self, url: &str) -> PathBuf {
        let without_query = url.split(['?', '#']).next().unwrap_or(url);
        let local = without_query
            .strip_prefix("file://")
            .unwrap_or(without_query);
        let path = Path::new(local);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl DocumentClient for FileDocumentClient {
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let path = self.path_for(url);
        trace!(path = %path.display(), "Reading local document");
        tokio::fs::read(&path).await.map_err(|e| FetchError::Io {
            path,
            reason: e.to_string(),
        })
    }
}

/// Dispatches `http://` and `https://` URLs to the network and everything
/// else to the local filesystem.
#[derive(Clone)]
pub struct AnyDocumentClient {
    http: HttpDocumentClient,
    files: FileDocumentClient,
}

impl AnyDocumentClient {
    pub fn new(timeout_secs: u64, root: impl Into<PathBuf>) -> Result<Self, FetchError> {
        Ok(Self {
            http: HttpDocumentClient::with_timeout(timeout_secs)?,
            files: FileDocumentClient::new(root),
        })
    }
}

impl DocumentClient for AnyDocumentClient {
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if is_remote(url) {
            self.http.get(url).await
        } else {
            self.files.get(url).await
        }
    }
}

/// Whether a URL is fetched over the network.
pub fn is_remote(url: &str) -> bool {
    let lower = url.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_is_remote() {
        assert!(is_remote("https://example.com/lots.geojson"));
        assert!(is_remote("HTTP://example.com"));
        assert!(!is_remote("data/lots.geojson"));
        assert!(!is_remote("file:///tmp/lots.geojson"));
    }

    #[test]
    fn test_path_for_ignores_query() {
        let client = FileDocumentClient::new("/srv/www");
        assert_eq!(
            client.path_for("data/lots.geojson?v=123"),
            PathBuf::from("/srv/www/data/lots.geojson")
        );
        assert_eq!(
            client.path_for("file:///tmp/lots.geojson"),
            PathBuf::from("/tmp/lots.geojson")
        );
    }

    #[tokio::test]
    async fn test_file_client_reads_relative_path() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("doc.json"), b"{}").unwrap();

        let client = FileDocumentClient::new(temp.path());
        assert_eq!(client.get("doc.json?v=1").await.unwrap(), b"{}".to_vec());
    }

    #[tokio::test]
    async fn test_file_client_missing_file() {
        let temp = TempDir::new().unwrap();
        let client = FileDocumentClient::new(temp.path());

        let result = client.get("missing.geojson").await;
        assert!(matches!(result, Err(FetchError::Io { .. })));
    }
}
