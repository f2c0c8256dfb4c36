use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::sync::LazyLock;
use std::time::Duration;

use camino::Utf8PathBuf;
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::LoaderError;

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:http|ftp)s?://(?:(?:[A-Z0-9](?:[A-Z0-9-]{0,61}[A-Z0-9])?\.)+(?:[A-Z]{2,6}\.?|[A-Z0-9-]{2,}\.?)|localhost|\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})(?::\d+)?(?:/?|[/?]\S+)$",
    )
    .unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub datasets: Vec<DatasetEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetEntry {
    pub name: String,
    pub url: String,
    pub folder_name: String,
    pub folder_description: String,
    #[serde(rename = "type")]
    pub file_type: String,
    #[serde(default)]
    pub dbkey: Option<String>,
}

/// Where a manifest is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSource {
    Path(Utf8PathBuf),
    Url(String),
}

impl ManifestSource {
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if is_url(trimmed) {
            ManifestSource::Url(trimmed.to_string())
        } else {
            ManifestSource::Path(Utf8PathBuf::from(trimmed))
        }
    }
}

impl fmt::Display for ManifestSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestSource::Path(path) => write!(f, "{path}"),
            ManifestSource::Url(url) => write!(f, "{url}"),
        }
    }
}

pub fn is_url(value: &str) -> bool {
    URL_RE.is_match(value)
}

pub struct ManifestLoader;

impl ManifestLoader {
    pub fn load(source: &ManifestSource, timeout: Duration) -> Result<Manifest, LoaderError> {
        let content = match source {
            ManifestSource::Path(path) => {
                fs::read_to_string(path.as_std_path()).map_err(|err| LoaderError::ManifestRead {
                    path: path.clone().into_std_path_buf(),
                    message: err.to_string(),
                })?
            }
            ManifestSource::Url(url) => Self::fetch(url, timeout)?,
        };
        let manifest = Self::parse_str(&content)?;
        info!(
            source = %source,
            datasets = manifest.datasets.len(),
            "loaded manifest"
        );
        Ok(manifest)
    }

    pub fn parse_str(content: &str) -> Result<Manifest, LoaderError> {
        let manifest: Manifest = serde_yaml::from_str(content)
            .map_err(|err| LoaderError::ManifestParse(err.to_string()))?;
        Self::validate(&manifest)?;
        Ok(manifest)
    }

    fn validate(manifest: &Manifest) -> Result<(), LoaderError> {
        let mut seen = HashSet::new();
        for (index, entry) in manifest.datasets.iter().enumerate() {
            let required = [
                ("name", &entry.name),
                ("url", &entry.url),
                ("folder_name", &entry.folder_name),
                ("type", &entry.file_type),
            ];
            for (field, value) in required {
                if value.trim().is_empty() {
                    return Err(LoaderError::InvalidManifest(format!(
                        "dataset #{} has an empty `{field}`",
                        index + 1
                    )));
                }
            }
            if !seen.insert((entry.folder_name.as_str(), entry.name.as_str())) {
                warn!(
                    folder = %entry.folder_name,
                    dataset = %entry.name,
                    "dataset listed more than once in manifest; later entries will be skipped"
                );
            }
        }
        Ok(())
    }

    fn fetch(url: &str, timeout: Duration) -> Result<String, LoaderError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("galaxy-library-sync/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| LoaderError::ManifestHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| LoaderError::ManifestHttp(err.to_string()))?;

        info!(url, "fetching manifest");
        let response = client
            .get(url)
            .send()
            .map_err(|err| LoaderError::ManifestHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "manifest request failed".to_string());
            return Err(LoaderError::ManifestStatus { status, message });
        }
        response
            .text()
            .map_err(|err| LoaderError::ManifestHttp(err.to_string()))
    }
}
