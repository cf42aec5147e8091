//! In-memory metadata store, mirroring the PostgreSQL backend's contract.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use pixvault_core::models::{
    CapturedMetadata, FileAdd, FileUpdate, Folder, FolderStats, Library, LibraryAdd, MediaFile,
};
use pixvault_core::{AppError, ThumbnailSize};
use pixvault_db::MetadataStore;

#[derive(Default)]
struct State {
    libraries: HashMap<Uuid, Library>,
    folders: HashMap<Uuid, Folder>,
    files: HashMap<Uuid, MediaFile>,
}

/// Metadata store over in-process hash maps. One mutex per store plays the
/// role of the database's per-entity atomicity.
///
/// Failure injection: each `fail_next_*` flag makes the corresponding
/// operation fail exactly once, for exercising compensation and redelivery
/// paths.
#[derive(Default)]
pub struct InMemoryMetadataStore {
    state: Mutex<State>,
    fail_next_add_library: AtomicBool,
    fail_next_add_file: AtomicBool,
    fail_next_thumbnail_update: AtomicBool,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_add_library(&self) {
        self.fail_next_add_library.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_add_file(&self) {
        self.fail_next_add_file.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_thumbnail_update(&self) {
        self.fail_next_thumbnail_update.store(true, Ordering::SeqCst);
    }

    fn injected(flag: &AtomicBool) -> bool {
        flag.swap(false, Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn add_library(
        &self,
        library_id: Uuid,
        root_folder_id: Uuid,
        add: LibraryAdd,
    ) -> Result<Library, AppError> {
        if Self::injected(&self.fail_next_add_library) {
            return Err(AppError::Internal("injected store failure".to_string()));
        }

        let now = Utc::now();
        let library = Library {
            id: library_id,
            name: add.name,
            description: add.description,
            time_zone: add.time_zone,
            created_at: now,
            updated_at: now,
        };

        let root = Folder {
            id: root_folder_id,
            library_id,
            parent_id: None,
            name: "All Pictures".to_string(),
            path: String::new(),
            stats: FolderStats::default(),
            created_at: now,
            updated_at: now,
        };

        let mut state = self.state.lock().unwrap();
        state.libraries.insert(library_id, library.clone());
        state.folders.insert(root_folder_id, root);
        Ok(library)
    }

    async fn get_library(&self, library_id: Uuid) -> Result<Option<Library>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state.libraries.get(&library_id).cloned())
    }

    async fn list_libraries(&self) -> Result<Vec<Library>, AppError> {
        let state = self.state.lock().unwrap();
        let mut libraries: Vec<Library> = state.libraries.values().cloned().collect();
        libraries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(libraries)
    }

    async fn delete_library(&self, library_id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state.lock().unwrap();
        let existed = state.libraries.remove(&library_id).is_some();
        state.folders.retain(|_, f| f.library_id != library_id);
        state.files.retain(|_, f| f.library_id != library_id);
        Ok(existed)
    }

    async fn add_folder(
        &self,
        library_id: Uuid,
        folder_id: Uuid,
        parent_id: Uuid,
        name: &str,
        path: &str,
    ) -> Result<Folder, AppError> {
        let mut state = self.state.lock().unwrap();

        let parent_ok = state
            .folders
            .get(&parent_id)
            .map(|f| f.library_id == library_id)
            .unwrap_or(false);
        if !parent_ok {
            return Err(AppError::NotFound(format!("folder {}", parent_id)));
        }

        let duplicate = state.folders.values().any(|f| {
            f.library_id == library_id
                && f.parent_id == Some(parent_id)
                && f.name.eq_ignore_ascii_case(name)
        });
        if duplicate {
            return Err(AppError::Validation(format!(
                "A folder named '{}' already exists here",
                name
            )));
        }

        let now = Utc::now();
        let folder = Folder {
            id: folder_id,
            library_id,
            parent_id: Some(parent_id),
            name: name.to_string(),
            path: path.to_string(),
            stats: FolderStats::default(),
            created_at: now,
            updated_at: now,
        };
        state.folders.insert(folder_id, folder.clone());
        Ok(folder)
    }

    async fn get_folder(
        &self,
        library_id: Uuid,
        folder_id: Uuid,
    ) -> Result<Option<Folder>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .folders
            .get(&folder_id)
            .filter(|f| f.library_id == library_id)
            .cloned())
    }

    async fn get_root_folder(&self, library_id: Uuid) -> Result<Option<Folder>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .folders
            .values()
            .find(|f| f.library_id == library_id && f.parent_id.is_none())
            .cloned())
    }

    async fn list_child_folders(
        &self,
        library_id: Uuid,
        parent_id: Uuid,
    ) -> Result<Vec<Folder>, AppError> {
        let state = self.state.lock().unwrap();
        let mut folders: Vec<Folder> = state
            .folders
            .values()
            .filter(|f| f.library_id == library_id && f.parent_id == Some(parent_id))
            .cloned()
            .collect();
        folders.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(folders)
    }

    async fn update_folder_stats(
        &self,
        library_id: Uuid,
        folder_id: Uuid,
        stats: FolderStats,
    ) -> Result<Folder, AppError> {
        let mut state = self.state.lock().unwrap();
        let folder = state
            .folders
            .get_mut(&folder_id)
            .filter(|f| f.library_id == library_id)
            .ok_or_else(|| AppError::NotFound(format!("folder {}", folder_id)))?;
        folder.stats = stats;
        folder.updated_at = Utc::now();
        Ok(folder.clone())
    }

    async fn delete_folder(&self, library_id: Uuid, folder_id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state.lock().unwrap();

        let folder = match state
            .folders
            .get(&folder_id)
            .filter(|f| f.library_id == library_id)
        {
            Some(folder) => folder,
            None => return Ok(false),
        };

        if folder.parent_id.is_none() {
            return Err(AppError::Validation(
                "The root folder cannot be deleted".to_string(),
            ));
        }

        if state.files.values().any(|f| f.folder_id == folder_id) {
            return Err(AppError::Validation(
                "Cannot delete folder: it contains files".to_string(),
            ));
        }

        if state
            .folders
            .values()
            .any(|f| f.parent_id == Some(folder_id))
        {
            return Err(AppError::Validation(
                "Cannot delete folder: it contains subfolders".to_string(),
            ));
        }

        Ok(state.folders.remove(&folder_id).is_some())
    }

    async fn add_file(
        &self,
        library_id: Uuid,
        file_id: Uuid,
        add: FileAdd,
    ) -> Result<MediaFile, AppError> {
        if Self::injected(&self.fail_next_add_file) {
            return Err(AppError::Internal("injected store failure".to_string()));
        }

        let mut state = self.state.lock().unwrap();

        let duplicate = state
            .files
            .values()
            .any(|f| f.folder_id == add.folder_id && f.name.eq_ignore_ascii_case(&add.name));
        if duplicate {
            return Err(AppError::Validation(format!(
                "A file named '{}' already exists in this folder",
                add.name
            )));
        }

        let now = Utc::now();
        let file = MediaFile {
            id: file_id,
            library_id,
            folder_id: add.folder_id,
            name: add.name,
            mime_type: add.mime_type,
            is_video: add.is_video,
            width: add.width,
            height: add.height,
            original_bytes: add.original_bytes,
            converted_bytes: 0,
            thumb_sm_bytes: 0,
            thumb_md_bytes: 0,
            thumb_lg_bytes: 0,
            is_processing: true,
            path: add.path,
            title: None,
            comments: None,
            tags: Vec::new(),
            camera_make: None,
            camera_model: None,
            gps_latitude: None,
            gps_longitude: None,
            gps_altitude: None,
            captured_at: None,
            created_at: now,
            updated_at: now,
        };
        state.files.insert(file_id, file.clone());
        Ok(file)
    }

    async fn get_file(
        &self,
        library_id: Uuid,
        file_id: Uuid,
    ) -> Result<Option<MediaFile>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .files
            .get(&file_id)
            .filter(|f| f.library_id == library_id)
            .cloned())
    }

    async fn list_files(
        &self,
        library_id: Uuid,
        folder_id: Uuid,
    ) -> Result<Vec<MediaFile>, AppError> {
        let state = self.state.lock().unwrap();
        let mut files: Vec<MediaFile> = state
            .files
            .values()
            .filter(|f| f.library_id == library_id && f.folder_id == folder_id)
            .cloned()
            .collect();
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    async fn update_file(
        &self,
        library_id: Uuid,
        file_id: Uuid,
        update: FileUpdate,
    ) -> Result<MediaFile, AppError> {
        let mut state = self.state.lock().unwrap();
        let file = state
            .files
            .get_mut(&file_id)
            .filter(|f| f.library_id == library_id)
            .ok_or_else(|| AppError::NotFound(format!("file {}", file_id)))?;

        if let Some(name) = update.name {
            file.name = name;
        }
        if let Some(title) = update.title {
            file.title = Some(title);
        }
        if let Some(comments) = update.comments {
            file.comments = Some(comments);
        }
        if let Some(tags) = update.tags {
            file.tags = tags;
        }
        file.updated_at = Utc::now();
        Ok(file.clone())
    }

    async fn apply_captured_metadata(
        &self,
        library_id: Uuid,
        file_id: Uuid,
        meta: &CapturedMetadata,
    ) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        let file = state
            .files
            .get_mut(&file_id)
            .filter(|f| f.library_id == library_id)
            .ok_or_else(|| AppError::NotFound(format!("file {}", file_id)))?;

        if meta.title.is_some() {
            file.title = meta.title.clone();
        }
        if meta.comments.is_some() {
            file.comments = meta.comments.clone();
        }
        if !meta.tags.is_empty() {
            file.tags = meta.tags.clone();
        }
        if meta.camera_make.is_some() {
            file.camera_make = meta.camera_make.clone();
        }
        if meta.camera_model.is_some() {
            file.camera_model = meta.camera_model.clone();
        }
        if meta.gps_latitude.is_some() {
            file.gps_latitude = meta.gps_latitude;
        }
        if meta.gps_longitude.is_some() {
            file.gps_longitude = meta.gps_longitude;
        }
        if meta.gps_altitude.is_some() {
            file.gps_altitude = meta.gps_altitude;
        }
        if meta.captured_at.is_some() {
            file.captured_at = meta.captured_at;
        }
        file.updated_at = Utc::now();
        Ok(())
    }

    async fn update_file_thumbnail(
        &self,
        library_id: Uuid,
        file_id: Uuid,
        size: ThumbnailSize,
        bytes: i64,
    ) -> Result<(), AppError> {
        if Self::injected(&self.fail_next_thumbnail_update) {
            return Err(AppError::Internal("injected store failure".to_string()));
        }

        let mut state = self.state.lock().unwrap();
        let file = state
            .files
            .get_mut(&file_id)
            .filter(|f| f.library_id == library_id)
            .ok_or_else(|| AppError::NotFound(format!("file {}", file_id)))?;

        match size {
            ThumbnailSize::Sm => file.thumb_sm_bytes = bytes,
            ThumbnailSize::Md => file.thumb_md_bytes = bytes,
            ThumbnailSize::Lg => file.thumb_lg_bytes = bytes,
        }
        file.updated_at = Utc::now();
        Ok(())
    }

    async fn update_file_converted(
        &self,
        library_id: Uuid,
        file_id: Uuid,
        bytes: i64,
    ) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        let file = state
            .files
            .get_mut(&file_id)
            .filter(|f| f.library_id == library_id)
            .ok_or_else(|| AppError::NotFound(format!("file {}", file_id)))?;
        file.converted_bytes = bytes;
        file.updated_at = Utc::now();
        Ok(())
    }

    async fn set_file_processing(
        &self,
        library_id: Uuid,
        file_id: Uuid,
        processing: bool,
    ) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        let file = state
            .files
            .get_mut(&file_id)
            .filter(|f| f.library_id == library_id)
            .ok_or_else(|| AppError::NotFound(format!("file {}", file_id)))?;
        file.is_processing = processing;
        file.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_file(&self, library_id: Uuid, file_id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state.lock().unwrap();
        let existed = state
            .files
            .get(&file_id)
            .map(|f| f.library_id == library_id)
            .unwrap_or(false);
        if existed {
            state.files.remove(&file_id);
        }
        Ok(existed)
    }
}
