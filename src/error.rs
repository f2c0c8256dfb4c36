use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum LoaderError {
    #[error("failed to read manifest at {path}: {message}")]
    ManifestRead { path: PathBuf, message: String },

    #[error("manifest request failed: {0}")]
    ManifestHttp(String),

    #[error("manifest URL returned status {status}: {message}")]
    ManifestStatus { status: u16, message: String },

    #[error("failed to parse manifest: {0}")]
    #[diagnostic(help(
        "the manifest must be a mapping with a `datasets` list; each entry needs name, url, folder_name, folder_description and type"
    ))]
    ManifestParse(String),

    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("invalid Galaxy URL: {0}")]
    InvalidGalaxyUrl(String),

    #[error("invalid API key: {0}")]
    InvalidApiKey(String),

    #[error("invalid setting: {0}")]
    InvalidSetting(String),

    #[error("Galaxy request failed: {0}")]
    GalaxyHttp(String),

    #[error("Galaxy returned status {status}: {message}")]
    GalaxyStatus { status: u16, message: String },

    #[error("unexpected Galaxy response: {0}")]
    GalaxyResponse(String),

    #[error("upload of dataset {dataset} ended in state {state}")]
    UploadFailed { dataset: String, state: String },

    #[error("upload of dataset {dataset} did not finish within {seconds}s")]
    UploadTimeout { dataset: String, seconds: u64 },
}

impl LoaderError {
    pub fn is_manifest(&self) -> bool {
        matches!(
            self,
            LoaderError::ManifestRead { .. }
                | LoaderError::ManifestHttp(_)
                | LoaderError::ManifestStatus { .. }
                | LoaderError::ManifestParse(_)
                | LoaderError::InvalidManifest(_)
        )
    }

    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            LoaderError::GalaxyHttp(_)
                | LoaderError::GalaxyStatus { .. }
                | LoaderError::GalaxyResponse(_)
                | LoaderError::UploadFailed { .. }
                | LoaderError::UploadTimeout { .. }
        )
    }
}
