use std::time::Duration;

use crate::domain::{ApiKey, GalaxyUrl};
use crate::error::LoaderError;
use crate::manifest::ManifestSource;

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_WAIT_SECS: u64 = 600;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Raw values as handed over by the command line.
#[derive(Debug, Clone, Default)]
pub struct RawSettings {
    pub galaxy_url: String,
    pub api_key: String,
    pub library_name: String,
    pub library_description: String,
    pub manifest: String,
    pub dry_run: bool,
    pub wait: bool,
    pub max_wait_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub galaxy_url: GalaxyUrl,
    pub api_key: ApiKey,
    pub library_name: String,
    pub library_description: String,
    pub manifest: ManifestSource,
    pub dry_run: bool,
    pub wait: Option<Duration>,
    pub http_timeout: Duration,
}

impl Settings {
    pub fn resolve(raw: RawSettings) -> Result<Settings, LoaderError> {
        let galaxy_url: GalaxyUrl = raw.galaxy_url.parse()?;
        let api_key: ApiKey = raw.api_key.parse()?;

        let library_name = raw.library_name;
        if library_name.trim().is_empty() {
            return Err(LoaderError::InvalidSetting(
                "library name must not be empty".to_string(),
            ));
        }
        if library_name.trim() != library_name {
            return Err(LoaderError::InvalidSetting(format!(
                "library name {library_name:?} has leading or trailing whitespace"
            )));
        }
        if raw.manifest.trim().is_empty() {
            return Err(LoaderError::InvalidSetting(
                "manifest path or URL must not be empty".to_string(),
            ));
        }

        let timeout_secs = raw.timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(LoaderError::InvalidSetting(
                "timeout must be at least one second".to_string(),
            ));
        }

        let wait = raw
            .wait
            .then(|| Duration::from_secs(raw.max_wait_secs.unwrap_or(DEFAULT_MAX_WAIT_SECS)));

        Ok(Settings {
            galaxy_url,
            api_key,
            library_name,
            library_description: raw.library_description,
            manifest: ManifestSource::parse(&raw.manifest),
            dry_run: raw.dry_run,
            wait,
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }
}
