#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use galaxy_library_sync::domain::{Dataset, DatasetState, Folder, Library};
use galaxy_library_sync::error::LoaderError;
use galaxy_library_sync::galaxy::{GalaxyClient, UploadRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub id: String,
    pub library_id: String,
    /// Containing folder path; empty for folders, which all sit at the root.
    pub parent: String,
    pub name: String,
    pub is_folder: bool,
    pub file_type: Option<String>,
    pub dbkey: Option<String>,
    pub description: Option<String>,
}

impl Entry {
    pub fn path(&self) -> String {
        format!("{}/{}", self.parent, self.name)
    }
}

#[derive(Debug, Default)]
pub struct State {
    pub libraries: Vec<Library>,
    pub entries: Vec<Entry>,
    pub calls: Vec<&'static str>,
    pub uploads: usize,
    pub fail_upload_at: Option<usize>,
    pub states: VecDeque<DatasetState>,
    next_id: usize,
}

/// In-memory Galaxy that reports names the way the real server does.
#[derive(Default)]
pub struct MockGalaxy {
    pub state: Mutex<State>,
}

impl MockGalaxy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_library(self, name: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let id = next_id(&mut state, "L");
            state.libraries.push(Library {
                id: id.clone(),
                name: name.to_string(),
                description: None,
                root_folder_id: Some(format!("F{id}")),
                deleted: false,
            });
        }
        self
    }

    pub fn with_folder(self, library: &str, folder: &str) -> Self {
        self.push_entry(library, "", folder, true);
        self
    }

    pub fn with_dataset(self, library: &str, folder: &str, name: &str) -> Self {
        self.push_entry(library, &format!("/{folder}"), name, false);
        self
    }

    pub fn failing_upload_at(self, upload: usize) -> Self {
        self.state.lock().unwrap().fail_upload_at = Some(upload);
        self
    }

    pub fn with_states(self, states: &[DatasetState]) -> Self {
        self.state.lock().unwrap().states = states.iter().copied().collect();
        self
    }

    pub fn clear_failure(&self) {
        self.state.lock().unwrap().fail_upload_at = None;
    }

    pub fn libraries(&self) -> Vec<Library> {
        self.state.lock().unwrap().libraries.clone()
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.state.lock().unwrap().entries.clone()
    }

    pub fn folders(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.is_folder)
            .map(|entry| entry.path())
            .collect()
    }

    pub fn files(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|entry| !entry.is_folder)
            .map(|entry| entry.path())
            .collect()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn upload_count(&self) -> usize {
        self.state.lock().unwrap().uploads
    }

    fn push_entry(&self, library: &str, parent: &str, name: &str, is_folder: bool) {
        let mut state = self.state.lock().unwrap();
        let library_id = state
            .libraries
            .iter()
            .find(|candidate| candidate.name == library)
            .map(|candidate| candidate.id.clone())
            .expect("library must be seeded first");
        let id = next_id(&mut state, if is_folder { "F" } else { "d" });
        state.entries.push(Entry {
            id,
            library_id,
            parent: parent.to_string(),
            name: name.to_string(),
            is_folder,
            file_type: None,
            dbkey: None,
            description: None,
        });
    }
}

fn next_id(state: &mut State, prefix: &str) -> String {
    state.next_id += 1;
    format!("{prefix}{}", state.next_id)
}

impl GalaxyClient for MockGalaxy {
    fn list_libraries(&self, name: &str) -> Result<Vec<Library>, LoaderError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("list_libraries");
        Ok(state
            .libraries
            .iter()
            .filter(|library| library.name == name)
            .cloned()
            .collect())
    }

    fn create_library(&self, name: &str, description: &str) -> Result<Library, LoaderError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("create_library");
        let id = next_id(&mut state, "L");
        let library = Library {
            id: id.clone(),
            name: name.to_string(),
            description: Some(description.to_string()),
            root_folder_id: Some(format!("F{id}")),
            deleted: false,
        };
        state.libraries.push(library.clone());
        Ok(library)
    }

    fn list_folders(&self, library: &Library, name: &str) -> Result<Vec<Folder>, LoaderError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("list_folders");
        Ok(state
            .entries
            .iter()
            .filter(|entry| entry.library_id == library.id && entry.is_folder)
            .map(|entry| Folder {
                id: entry.id.clone(),
                name: entry.path(),
            })
            .filter(|folder| folder.base_name() == name)
            .collect())
    }

    fn create_folder(
        &self,
        library: &Library,
        name: &str,
        description: &str,
    ) -> Result<Folder, LoaderError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("create_folder");
        let id = next_id(&mut state, "F");
        state.entries.push(Entry {
            id: id.clone(),
            library_id: library.id.clone(),
            parent: String::new(),
            name: name.to_string(),
            is_folder: true,
            file_type: None,
            dbkey: None,
            description: Some(description.to_string()),
        });
        Ok(Folder {
            id,
            name: name.to_string(),
        })
    }

    fn list_datasets(
        &self,
        library: &Library,
        folder: &Folder,
        name: &str,
    ) -> Result<Vec<Dataset>, LoaderError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("list_datasets");
        let path = folder.child_path(name);
        Ok(state
            .entries
            .iter()
            .filter(|entry| {
                entry.library_id == library.id && !entry.is_folder && entry.path() == path
            })
            .map(|entry| Dataset {
                id: entry.id.clone(),
                name: entry.path(),
                state: None,
            })
            .collect())
    }

    fn upload_from_url(
        &self,
        library: &Library,
        folder: &Folder,
        request: &UploadRequest,
    ) -> Result<Dataset, LoaderError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("upload_from_url");
        state.uploads += 1;
        if state.fail_upload_at == Some(state.uploads) {
            return Err(LoaderError::GalaxyStatus {
                status: 502,
                message: "bad gateway".to_string(),
            });
        }
        let id = next_id(&mut state, "d");
        // Galaxy names pasted-URL uploads after the whole URL.
        let path = folder.child_path(&request.url);
        state.entries.push(Entry {
            id: id.clone(),
            library_id: library.id.clone(),
            parent: folder.path(),
            name: request.url.clone(),
            is_folder: false,
            file_type: Some(request.file_type.clone()),
            dbkey: request.dbkey.clone(),
            description: None,
        });
        Ok(Dataset {
            id,
            name: path,
            state: Some(DatasetState::Queued),
        })
    }

    fn show_dataset(&self, _library: &Library, dataset_id: &str) -> Result<Dataset, LoaderError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("show_dataset");
        let next_state = state.states.pop_front().unwrap_or(DatasetState::Running);
        let entry = state
            .entries
            .iter()
            .find(|entry| entry.id == dataset_id)
            .ok_or_else(|| LoaderError::GalaxyStatus {
                status: 404,
                message: "no such dataset".to_string(),
            })?;
        Ok(Dataset {
            id: entry.id.clone(),
            name: entry.path(),
            state: Some(next_state),
        })
    }

    fn rename_dataset(&self, dataset_id: &str, name: &str) -> Result<Dataset, LoaderError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("rename_dataset");
        let entry = state
            .entries
            .iter_mut()
            .find(|entry| entry.id == dataset_id)
            .ok_or_else(|| LoaderError::GalaxyStatus {
                status: 404,
                message: "no such dataset".to_string(),
            })?;
        entry.name = name.to_string();
        Ok(Dataset {
            id: entry.id.clone(),
            name: entry.path(),
            state: None,
        })
    }
}

pub const README_MANIFEST: &str = r#"
datasets:
  - name: RefSeq_reference_DSv2.gtf
    url: 'https://ea1-usegvl-org-gvl-data.s3.amazonaws.com/GTFs/RefSeq_reference_DSv2.gtf'
    folder_name: GTFs
    folder_description: A collection of GTF files
    type: gtf
    dbkey: mm10
  - name: 1.fasta
    url: 'https://ea1-usegvl-org-gvl-data.s3.amazonaws.com/FASTA/chr1.fa'
    folder_name: FASTA
    folder_description: Reference sequences
    type: fasta
"#;
