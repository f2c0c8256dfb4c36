use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use crate::domain::{ApiKey, Dataset, Folder, GalaxyUrl, Library};
use crate::error::LoaderError;

/// What to ingest into a folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub name: String,
    pub url: String,
    pub file_type: String,
    pub dbkey: Option<String>,
}

/// The library/folder/dataset operations the reconciler needs from Galaxy.
///
/// Implementations must not cache: every call reflects current remote state.
pub trait GalaxyClient {
    fn list_libraries(&self, name: &str) -> Result<Vec<Library>, LoaderError>;
    fn create_library(&self, name: &str, description: &str) -> Result<Library, LoaderError>;
    fn list_folders(&self, library: &Library, name: &str) -> Result<Vec<Folder>, LoaderError>;
    fn create_folder(
        &self,
        library: &Library,
        name: &str,
        description: &str,
    ) -> Result<Folder, LoaderError>;
    fn list_datasets(
        &self,
        library: &Library,
        folder: &Folder,
        name: &str,
    ) -> Result<Vec<Dataset>, LoaderError>;
    /// Submits an ingestion job. Returns once Galaxy acknowledges it, not when
    /// the transfer completes.
    fn upload_from_url(
        &self,
        library: &Library,
        folder: &Folder,
        request: &UploadRequest,
    ) -> Result<Dataset, LoaderError>;
    fn show_dataset(&self, library: &Library, dataset_id: &str) -> Result<Dataset, LoaderError>;
    fn rename_dataset(&self, dataset_id: &str, name: &str) -> Result<Dataset, LoaderError>;
}

#[derive(Debug, Deserialize)]
struct LibraryContent {
    id: String,
    name: String,
    #[serde(rename = "type")]
    kind: ContentKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ContentKind {
    Folder,
    File,
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct CreatedContent {
    id: String,
    name: String,
}

#[derive(Clone)]
pub struct GalaxyHttpClient {
    client: Client,
    base_url: GalaxyUrl,
}

impl GalaxyHttpClient {
    pub fn new(base_url: GalaxyUrl, api_key: &ApiKey, timeout: Duration) -> Result<Self, LoaderError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("galaxy-library-sync/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| LoaderError::GalaxyHttp(err.to_string()))?,
        );
        let mut key = HeaderValue::from_str(api_key.as_str())
            .map_err(|err| LoaderError::InvalidApiKey(err.to_string()))?;
        key.set_sensitive(true);
        headers.insert("x-api-key", key);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| LoaderError::GalaxyHttp(err.to_string()))?;

        Ok(Self { client, base_url })
    }

    fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, LoaderError> {
        let response = request
            .send()
            .map_err(|err| LoaderError::GalaxyHttp(err.to_string()))?;
        let response = Self::handle_status(response)?;
        response
            .json()
            .map_err(|err| LoaderError::GalaxyResponse(err.to_string()))
    }

    fn handle_status(response: Response) -> Result<Response, LoaderError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "Galaxy request failed".to_string());
        Err(LoaderError::GalaxyStatus { status, message })
    }

    fn library_contents(&self, library: &Library) -> Result<Vec<LibraryContent>, LoaderError> {
        let url = self.base_url.api(&format!("libraries/{}/contents", library.id));
        debug!(%url, "GET library contents");
        self.send(self.client.get(&url))
    }

    fn post_contents(&self, library: &Library, body: &Value) -> Result<CreatedContent, LoaderError> {
        let url = self.base_url.api(&format!("libraries/{}/contents", library.id));
        debug!(%url, "POST library contents");
        let created: Vec<CreatedContent> = self.send(self.client.post(&url).json(body))?;
        created.into_iter().next().ok_or_else(|| {
            LoaderError::GalaxyResponse("library contents POST returned an empty list".to_string())
        })
    }

    fn root_folder_id(&self, library: &Library) -> Result<String, LoaderError> {
        if let Some(id) = &library.root_folder_id {
            return Ok(id.clone());
        }
        let url = self.base_url.api(&format!("libraries/{}", library.id));
        debug!(%url, "GET library");
        let full: Library = self.send(self.client.get(&url))?;
        full.root_folder_id.ok_or_else(|| {
            LoaderError::GalaxyResponse(format!("library {} has no root folder", library.id))
        })
    }
}

impl GalaxyClient for GalaxyHttpClient {
    fn list_libraries(&self, name: &str) -> Result<Vec<Library>, LoaderError> {
        let url = self.base_url.api("libraries");
        debug!(%url, "GET libraries");
        let libraries: Vec<Library> = self.send(self.client.get(&url))?;
        Ok(libraries
            .into_iter()
            .filter(|library| !library.deleted && library.name == name)
            .collect())
    }

    fn create_library(&self, name: &str, description: &str) -> Result<Library, LoaderError> {
        let url = self.base_url.api("libraries");
        debug!(%url, "POST libraries");
        let body = json!({ "name": name, "description": description });
        self.send(self.client.post(&url).json(&body))
    }

    fn list_folders(&self, library: &Library, name: &str) -> Result<Vec<Folder>, LoaderError> {
        Ok(self
            .library_contents(library)?
            .into_iter()
            .filter(|content| content.kind == ContentKind::Folder)
            .map(|content| Folder {
                id: content.id,
                name: content.name,
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
        let body = json!({
            "create_type": "folder",
            "folder_id": self.root_folder_id(library)?,
            "name": name,
            "description": description,
        });
        let created = self.post_contents(library, &body)?;
        Ok(Folder {
            id: created.id,
            name: created.name,
        })
    }

    fn list_datasets(
        &self,
        library: &Library,
        folder: &Folder,
        name: &str,
    ) -> Result<Vec<Dataset>, LoaderError> {
        let path = folder.child_path(name);
        Ok(self
            .library_contents(library)?
            .into_iter()
            .filter(|content| content.kind == ContentKind::File && content.name == path)
            .map(|content| Dataset {
                id: content.id,
                name: content.name,
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
        debug!(dataset = %request.name, url = %request.url, "submitting URL upload");
        let mut body = json!({
            "create_type": "file",
            "folder_id": folder.id,
            "file_type": request.file_type,
            "upload_option": "upload_file",
            "files_0|url_paste": request.url,
            "tag_using_filenames": false,
            "preserve_dirs": false,
        });
        if let Some(dbkey) = &request.dbkey {
            body["dbkey"] = json!(dbkey);
        }
        let created = self.post_contents(library, &body)?;
        Ok(Dataset {
            id: created.id,
            name: created.name,
            state: None,
        })
    }

    fn show_dataset(&self, library: &Library, dataset_id: &str) -> Result<Dataset, LoaderError> {
        let url = self
            .base_url
            .api(&format!("libraries/{}/contents/{}", library.id, dataset_id));
        debug!(%url, "GET library dataset");
        self.send(self.client.get(&url))
    }

    fn rename_dataset(&self, dataset_id: &str, name: &str) -> Result<Dataset, LoaderError> {
        let url = self.base_url.api(&format!("libraries/datasets/{dataset_id}"));
        debug!(%url, "PATCH library dataset");
        let body = json!({ "name": name });
        self.send(self.client.patch(&url).json(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_library_contents() {
        let raw = r#"[
            {"id": "F1", "name": "/", "type": "folder", "url": "/api/folders/F1"},
            {"id": "F2", "name": "/GTFs", "type": "folder", "url": "/api/folders/F2"},
            {"id": "d1", "name": "/GTFs/1.fasta", "type": "file", "url": "/api/libraries/x/contents/d1"},
            {"id": "z", "name": "/odd", "type": "collection"}
        ]"#;
        let contents: Vec<LibraryContent> = serde_json::from_str(raw).unwrap();
        assert_eq!(contents.len(), 4);
        assert_eq!(contents[1].kind, ContentKind::Folder);
        assert_eq!(contents[2].kind, ContentKind::File);
        assert_eq!(contents[3].kind, ContentKind::Other);
    }

    #[test]
    fn decode_library_with_extra_fields() {
        let raw = r#"{"id": "abc", "name": "Genomes", "synopsis": null,
            "description": "refs", "root_folder_id": "Fabc", "deleted": false,
            "can_user_add": true}"#;
        let library: Library = serde_json::from_str(raw).unwrap();
        assert_eq!(library.root_folder_id.as_deref(), Some("Fabc"));
    }
}
