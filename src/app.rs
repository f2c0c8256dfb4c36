use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use crate::config::{DEFAULT_POLL_INTERVAL, Settings};
use crate::domain::{Dataset, DatasetState, Folder, Library};
use crate::error::LoaderError;
use crate::galaxy::{GalaxyClient, UploadRequest};
use crate::manifest::{DatasetEntry, Manifest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub max_wait: Duration,
    pub poll_interval: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    pub dry_run: bool,
    /// Poll new uploads until they finish. `None` submits and moves on.
    pub wait: Option<WaitPolicy>,
}

impl ReconcileOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            dry_run: settings.dry_run,
            wait: settings.wait.map(|max_wait| WaitPolicy {
                max_wait,
                poll_interval: DEFAULT_POLL_INTERVAL,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    Found,
    Created,
    Skipped,
    Uploaded,
    Planned,
}

#[derive(Debug, Clone, Serialize)]
pub struct LibraryOutcome {
    pub name: String,
    pub id: Option<String>,
    pub action: Action,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemResult {
    pub name: String,
    pub url: String,
    pub folder: String,
    pub folder_id: Option<String>,
    pub folder_action: Action,
    pub dataset_id: Option<String>,
    pub action: Action,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileResult {
    pub library: LibraryOutcome,
    pub items: Vec<ItemResult>,
}

impl ReconcileResult {
    pub fn count(&self, action: Action) -> usize {
        self.items.iter().filter(|item| item.action == action).count()
    }
}

pub struct App<G: GalaxyClient> {
    galaxy: G,
}

impl<G: GalaxyClient> App<G> {
    pub fn new(galaxy: G) -> Self {
        Self { galaxy }
    }

    pub fn galaxy(&self) -> &G {
        &self.galaxy
    }

    /// Bring the library named `library_name` in line with `manifest`.
    ///
    /// Entries are processed in order and the first remote error aborts the
    /// run; whatever was created before it stays in place.
    pub fn reconcile(
        &self,
        library_name: &str,
        library_description: &str,
        manifest: &Manifest,
        options: &ReconcileOptions,
    ) -> Result<ReconcileResult, LoaderError> {
        let (library, library_action) =
            self.resolve_library(library_name, library_description, options.dry_run)?;

        let mut items = Vec::with_capacity(manifest.datasets.len());
        for entry in &manifest.datasets {
            items.push(self.reconcile_entry(library.as_ref(), entry, options)?);
        }

        info!(library = library_name, "done uploading data to library");
        Ok(ReconcileResult {
            library: LibraryOutcome {
                name: library_name.to_string(),
                id: library.map(|library| library.id),
                action: library_action,
            },
            items,
        })
    }

    fn resolve_library(
        &self,
        name: &str,
        description: &str,
        dry_run: bool,
    ) -> Result<(Option<Library>, Action), LoaderError> {
        let mut matches = self.galaxy.list_libraries(name)?;
        if matches.len() > 1 {
            warn!(
                library = name,
                count = matches.len(),
                "several libraries share this name; using the first"
            );
        }
        if !matches.is_empty() {
            let library = matches.swap_remove(0);
            info!(library = %library.name, id = %library.id, "found existing library");
            return Ok((Some(library), Action::Found));
        }
        if dry_run {
            info!(library = name, "would create library");
            return Ok((None, Action::Planned));
        }
        info!(library = name, "creating library");
        let library = self.galaxy.create_library(name, description)?;
        info!(library = %library.name, id = %library.id, "library created");
        Ok((Some(library), Action::Created))
    }

    fn resolve_folder(
        &self,
        library: &Library,
        entry: &DatasetEntry,
        dry_run: bool,
    ) -> Result<(Option<Folder>, Action), LoaderError> {
        let mut matches = self.galaxy.list_folders(library, &entry.folder_name)?;
        if matches.len() > 1 {
            warn!(
                folder = %entry.folder_name,
                count = matches.len(),
                "several folders share this name; using the first"
            );
        }
        if !matches.is_empty() {
            let folder = matches.swap_remove(0);
            info!(folder = folder.base_name(), id = %folder.id, "found existing folder");
            return Ok((Some(folder), Action::Found));
        }
        if dry_run {
            info!(folder = %entry.folder_name, "would create folder");
            return Ok((None, Action::Planned));
        }
        info!(folder = %entry.folder_name, "creating folder");
        let folder =
            self.galaxy
                .create_folder(library, &entry.folder_name, &entry.folder_description)?;
        info!(folder = %folder.name, id = %folder.id, "folder created");
        Ok((Some(folder), Action::Created))
    }

    fn reconcile_entry(
        &self,
        library: Option<&Library>,
        entry: &DatasetEntry,
        options: &ReconcileOptions,
    ) -> Result<ItemResult, LoaderError> {
        let mut item = ItemResult {
            name: entry.name.clone(),
            url: entry.url.clone(),
            folder: entry.folder_name.clone(),
            folder_id: None,
            folder_action: Action::Planned,
            dataset_id: None,
            action: Action::Planned,
        };

        let Some(library) = library else {
            info!(dataset = %entry.name, "would upload dataset");
            return Ok(item);
        };

        let (folder, folder_action) = self.resolve_folder(library, entry, options.dry_run)?;
        item.folder_action = folder_action;
        let Some(folder) = folder else {
            info!(dataset = %entry.name, "would upload dataset");
            return Ok(item);
        };
        item.folder_id = Some(folder.id.clone());

        let existing = self.galaxy.list_datasets(library, &folder, &entry.name)?;
        if let Some(dataset) = existing.first() {
            info!(
                dataset = %entry.name,
                folder = %folder.path(),
                "dataset already exists"
            );
            item.dataset_id = Some(dataset.id.clone());
            item.action = Action::Skipped;
            return Ok(item);
        }

        if options.dry_run {
            info!(dataset = %entry.name, "would upload dataset");
            return Ok(item);
        }

        let dataset = self.upload(library, &folder, entry, options.wait)?;
        item.dataset_id = Some(dataset.id);
        item.action = Action::Uploaded;
        Ok(item)
    }

    fn upload(
        &self,
        library: &Library,
        folder: &Folder,
        entry: &DatasetEntry,
        wait: Option<WaitPolicy>,
    ) -> Result<Dataset, LoaderError> {
        info!(url = %entry.url, dataset = %entry.name, "uploading file from url");
        let request = UploadRequest {
            name: entry.name.clone(),
            url: entry.url.clone(),
            file_type: entry.file_type.clone(),
            dbkey: entry.dbkey.clone(),
        };
        let mut dataset = self.galaxy.upload_from_url(library, folder, &request)?;

        if let Some(policy) = wait {
            dataset = self.wait_for_dataset(library, &dataset.id, policy)?;
        }

        // URL uploads are named after the full URL; the manifest name is what
        // later runs look up.
        info!(id = %dataset.id, name = %entry.name, "setting dataset name");
        dataset = self.galaxy.rename_dataset(&dataset.id, &entry.name)?;
        info!(dataset = %entry.name, id = %dataset.id, "dataset uploaded");
        Ok(dataset)
    }

    fn wait_for_dataset(
        &self,
        library: &Library,
        dataset_id: &str,
        policy: WaitPolicy,
    ) -> Result<Dataset, LoaderError> {
        let started = Instant::now();
        loop {
            let dataset = self.galaxy.show_dataset(library, dataset_id)?;
            match dataset.state {
                Some(DatasetState::Ok) => return Ok(dataset),
                Some(state) if state.is_terminal() => {
                    return Err(LoaderError::UploadFailed {
                        dataset: dataset_id.to_string(),
                        state: state.to_string(),
                    });
                }
                _ => {}
            }
            if started.elapsed() >= policy.max_wait {
                return Err(LoaderError::UploadTimeout {
                    dataset: dataset_id.to_string(),
                    seconds: policy.max_wait.as_secs(),
                });
            }
            thread::sleep(policy.poll_interval);
        }
    }
}
