// ⚙️ Dashboard Configuration
// JSON file, every field defaulted. Only the binaries read it.

use crate::aggregation::DEFAULT_CHART_LIMIT;
use crate::datasets::DatasetKind;
use crate::source::{DirectorySource, TextSource};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const MAX_INITIATIVE_NAME_LENGTH: usize = 50;
pub const MAX_PARTY_NAME_LENGTH: usize = 40;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetPaths {
    pub withdrawals: String,
    pub certificates: String,
    pub initiatives: String,
}

impl Default for DatasetPaths {
    fn default() -> Self {
        DatasetPaths {
            withdrawals: DatasetKind::Withdrawals.schema().default_path.to_string(),
            certificates: DatasetKind::Certificates.schema().default_path.to_string(),
            initiatives: DatasetKind::Initiatives.schema().default_path.to_string(),
        }
    }
}

impl DatasetPaths {
    pub fn get(&self, kind: DatasetKind) -> &str {
        match kind {
            DatasetKind::Withdrawals => &self.withdrawals,
            DatasetKind::Certificates => &self.certificates,
            DatasetKind::Initiatives => &self.initiatives,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Root that dataset paths are resolved under
    pub data_dir: PathBuf,

    /// Fetch datasets over HTTP from this origin instead of `data_dir`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    pub datasets: DatasetPaths,

    /// Label cut for initiative / project names in charts
    pub max_initiative_name_length: usize,

    /// Label cut for holder / developer names in charts
    pub max_party_name_length: usize,

    pub default_chart_limit: usize,

    pub bind_addr: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            data_dir: PathBuf::from("."),
            base_url: None,
            datasets: DatasetPaths::default(),
            max_initiative_name_length: MAX_INITIATIVE_NAME_LENGTH,
            max_party_name_length: MAX_PARTY_NAME_LENGTH,
            default_chart_limit: DEFAULT_CHART_LIMIT,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

impl DashboardConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&text)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// `path` when given, defaults otherwise
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn with_data_dir(mut self, data_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = data_dir {
            self.data_dir = dir;
        }
        self
    }

    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        if base_url.is_some() {
            self.base_url = base_url;
        }
        self
    }

    /// Text source selected by this config
    pub fn source(&self) -> Result<Arc<dyn TextSource>> {
        match &self.base_url {
            Some(url) => remote_source(url),
            None => Ok(Arc::new(DirectorySource::new(&self.data_dir))),
        }
    }
}

#[cfg(feature = "remote")]
fn remote_source(url: &str) -> Result<Arc<dyn TextSource>> {
    Ok(Arc::new(crate::source::HttpSource::new(url)))
}

#[cfg(not(feature = "remote"))]
fn remote_source(url: &str) -> Result<Arc<dyn TextSource>> {
    anyhow::bail!("base_url {} requires the \"remote\" feature", url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = DashboardConfig::default();

        assert_eq!(config.data_dir, PathBuf::from("."));
        assert_eq!(config.datasets.get(DatasetKind::Withdrawals), "/data/retiros.csv");
        assert_eq!(
            config.datasets.get(DatasetKind::Certificates),
            "/data/platform_emission_certificates.csv"
        );
        assert_eq!(config.datasets.get(DatasetKind::Initiatives), "/data/iniciativas_colcx.csv");
        assert_eq!(config.max_initiative_name_length, 50);
        assert_eq!(config.max_party_name_length, 40);
        assert_eq!(config.default_chart_limit, 5);
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dashboard.json");
        fs::write(
            &path,
            r#"{"data_dir": "public", "default_chart_limit": 10, "datasets": {"initiatives": "/x.csv"}}"#,
        )
        .unwrap();

        let config = DashboardConfig::from_file(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("public"));
        assert_eq!(config.default_chart_limit, 10);
        assert_eq!(config.datasets.initiatives, "/x.csv");
        assert_eq!(config.datasets.withdrawals, "/data/retiros.csv");
        assert_eq!(config.max_party_name_length, 40);
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{not json").unwrap();

        let err = DashboardConfig::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn test_overrides() {
        let config = DashboardConfig::default()
            .with_data_dir(Some(PathBuf::from("/srv/colcx")))
            .with_base_url(None);

        assert_eq!(config.data_dir, PathBuf::from("/srv/colcx"));
        assert_eq!(config.base_url, None);

        let config = config.with_data_dir(None);
        assert_eq!(config.data_dir, PathBuf::from("/srv/colcx"));
    }

    #[cfg(not(feature = "remote"))]
    #[test]
    fn test_base_url_without_remote_feature_fails() {
        let config = DashboardConfig::default().with_base_url(Some("https://x".to_string()));
        assert!(config.source().is_err());
    }
}
