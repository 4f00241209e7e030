// 📥 Text Sources
// Where dataset text comes from: a local directory, memory, or an HTTP origin.
//
// A source only knows how to turn a dataset path ("/data/retiros.csv") into
// text. Parsing and caching live in the adapters and the store.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// Errors that can occur while fetching dataset text
#[derive(Debug, Error)]
pub enum LoadError {
    /// Nothing exists at the path
    #[error("dataset not found: {path}")]
    NotFound { path: String },

    /// File exists but could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Remote answered with a non-success status
    #[error("failed to load {path}: {status} {reason}")]
    Status {
        path: String,
        status: u16,
        reason: String,
    },

    /// Connection, TLS or body decoding failure
    #[error("failed to fetch {path}: {message}")]
    Transport { path: String, message: String },
}

impl LoadError {
    pub fn path(&self) -> &str {
        match self {
            LoadError::NotFound { path }
            | LoadError::Io { path, .. }
            | LoadError::Status { path, .. }
            | LoadError::Transport { path, .. } => path,
        }
    }
}

/// TextSource - fetches the raw text of one dataset
pub trait TextSource: Send + Sync {
    fn fetch(&self, path: &str) -> Result<String, LoadError>;

    /// Where the text comes from, for logs and `check` output
    fn describe(&self) -> String;
}

// ============================================================================
// DIRECTORY
// ============================================================================

/// Reads dataset paths relative to a root directory.
/// "/data/retiros.csv" under root "public" reads "public/data/retiros.csv".
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectorySource { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

impl TextSource for DirectorySource {
    fn fetch(&self, path: &str) -> Result<String, LoadError> {
        let full = self.resolve(path);

        let bytes = fs::read(&full).map_err(|source| match source.kind() {
            ErrorKind::NotFound => LoadError::NotFound {
                path: full.display().to_string(),
            },
            _ => LoadError::Io {
                path: full.display().to_string(),
                source,
            },
        })?;

        // Registry exports are not always clean UTF-8
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn describe(&self) -> String {
        format!("directory {}", self.root.display())
    }
}

// ============================================================================
// MEMORY
// ============================================================================

/// In-memory texts keyed by dataset path, with optional injected failures
#[derive(Debug, Default)]
pub struct MemorySource {
    texts: Mutex<HashMap<String, String>>,
    failures: Mutex<HashMap<String, u16>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(self, path: &str, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }

    pub fn insert(&self, path: &str, text: impl Into<String>) {
        let mut texts = self.texts.lock().unwrap_or_else(|e| e.into_inner());
        texts.insert(path.to_string(), text.into());
    }

    /// Make every fetch of `path` answer with `status`
    pub fn fail_with(&self, path: &str, status: u16) {
        let mut failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());
        failures.insert(path.to_string(), status);
    }

    pub fn clear_failure(&self, path: &str) {
        let mut failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());
        failures.remove(path);
    }
}

impl TextSource for MemorySource {
    fn fetch(&self, path: &str) -> Result<String, LoadError> {
        let failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(&status) = failures.get(path) {
            return Err(LoadError::Status {
                path: path.to_string(),
                status,
                reason: "injected failure".to_string(),
            });
        }
        drop(failures);

        let texts = self.texts.lock().unwrap_or_else(|e| e.into_inner());
        texts.get(path).cloned().ok_or_else(|| LoadError::NotFound {
            path: path.to_string(),
        })
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

// ============================================================================
// HTTP (feature "remote")
// ============================================================================

#[cfg(feature = "remote")]
pub use http::HttpSource;

#[cfg(feature = "remote")]
mod http {
    use super::{LoadError, TextSource};
    use std::time::Duration;
    use tracing::debug;

    const HTTP_TIMEOUT_SECS: u64 = 30;

    /// Fetches dataset paths from a static file origin
    #[derive(Debug, Clone)]
    pub struct HttpSource {
        base_url: String,
    }

    impl HttpSource {
        pub fn new(base_url: impl Into<String>) -> Self {
            let base_url = base_url.into().trim_end_matches('/').to_string();
            HttpSource { base_url }
        }

        pub fn url_for(&self, path: &str) -> String {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    impl TextSource for HttpSource {
        fn fetch(&self, path: &str) -> Result<String, LoadError> {
            let url = self.url_for(path);
            let transport = |e: reqwest::Error| LoadError::Transport {
                path: url.clone(),
                message: e.to_string(),
            };

            // Built per fetch so it never outlives a blocking task
            let client = reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
                .user_agent(concat!("colcx-dashboard/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(transport)?;

            let response = client.get(&url).send().map_err(transport)?;
            let status = response.status();
            debug!(url = %url, status = status.as_u16(), "fetched dataset");

            if !status.is_success() {
                return Err(LoadError::Status {
                    path: url.clone(),
                    status: status.as_u16(),
                    reason: status.canonical_reason().unwrap_or("").to_string(),
                });
            }

            let bytes = response.bytes().map_err(transport)?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }

        fn describe(&self) -> String {
            format!("remote {}", self.base_url)
        }
    }

}
