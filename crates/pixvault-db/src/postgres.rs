//! PostgreSQL metadata store.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use pixvault_core::models::{
    CapturedMetadata, FileAdd, FileUpdate, Folder, FolderStats, Library, LibraryAdd, MediaFile,
};
use pixvault_core::{AppError, ThumbnailSize};

use crate::store::MetadataStore;

const FOLDER_COLUMNS: &str = "id, library_id, parent_id, name, path, file_count, total_bytes, \
     thumb_sm_bytes, thumb_md_bytes, thumb_lg_bytes, converted_bytes, created_at, updated_at";

const FILE_COLUMNS: &str = "id, library_id, folder_id, name, mime_type, is_video, width, height, \
     original_bytes, converted_bytes, thumb_sm_bytes, thumb_md_bytes, thumb_lg_bytes, \
     is_processing, path, title, comments, tags, camera_make, camera_model, gps_latitude, \
     gps_longitude, gps_altitude, captured_at, created_at, updated_at";

/// Metadata store backed by PostgreSQL.
#[derive(Clone)]
pub struct PgMetadataStore {
    pool: PgPool,
}

impl PgMetadataStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to the database and build a store.
    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub async fn run_migrations(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Migration failed: {}", e)))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for PgMetadataStore {
    #[tracing::instrument(skip(self, add), fields(db.table = "libraries", db.operation = "insert"))]
    async fn add_library(
        &self,
        library_id: Uuid,
        root_folder_id: Uuid,
        add: LibraryAdd,
    ) -> Result<Library, AppError> {
        let mut tx = self.pool.begin().await?;

        let library = sqlx::query_as::<Postgres, Library>(
            r#"
            INSERT INTO libraries (id, name, description, time_zone)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, description, time_zone, created_at, updated_at
            "#,
        )
        .bind(library_id)
        .bind(&add.name)
        .bind(&add.description)
        .bind(add.time_zone.name())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO folders (id, library_id, parent_id, name, path)
            VALUES ($1, $2, NULL, 'All Pictures', '')
            "#,
        )
        .bind(root_folder_id)
        .bind(library_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(library)
    }

    #[tracing::instrument(skip(self), fields(db.table = "libraries", db.operation = "select"))]
    async fn get_library(&self, library_id: Uuid) -> Result<Option<Library>, AppError> {
        let library = sqlx::query_as::<Postgres, Library>(
            "SELECT id, name, description, time_zone, created_at, updated_at \
             FROM libraries WHERE id = $1",
        )
        .bind(library_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(library)
    }

    #[tracing::instrument(skip(self), fields(db.table = "libraries", db.operation = "select"))]
    async fn list_libraries(&self) -> Result<Vec<Library>, AppError> {
        let libraries = sqlx::query_as::<Postgres, Library>(
            "SELECT id, name, description, time_zone, created_at, updated_at \
             FROM libraries ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(libraries)
    }

    #[tracing::instrument(skip(self), fields(db.table = "libraries", db.operation = "delete"))]
    async fn delete_library(&self, library_id: Uuid) -> Result<bool, AppError> {
        let rows_affected = sqlx::query("DELETE FROM libraries WHERE id = $1")
            .bind(library_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows_affected > 0)
    }

    #[tracing::instrument(
        skip(self),
        fields(db.table = "folders", db.operation = "insert", db.record_id = %folder_id)
    )]
    async fn add_folder(
        &self,
        library_id: Uuid,
        folder_id: Uuid,
        parent_id: Uuid,
        name: &str,
        path: &str,
    ) -> Result<Folder, AppError> {
        let parent_exists = sqlx::query_scalar::<Postgres, bool>(
            "SELECT EXISTS(SELECT 1 FROM folders WHERE id = $1 AND library_id = $2)",
        )
        .bind(parent_id)
        .bind(library_id)
        .fetch_one(&self.pool)
        .await?;

        if !parent_exists {
            return Err(AppError::NotFound(format!("folder {}", parent_id)));
        }

        let duplicate = sqlx::query_scalar::<Postgres, bool>(
            "SELECT EXISTS(SELECT 1 FROM folders \
             WHERE library_id = $1 AND parent_id = $2 AND LOWER(name) = LOWER($3))",
        )
        .bind(library_id)
        .bind(parent_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        if duplicate {
            return Err(AppError::Validation(format!(
                "A folder named '{}' already exists here",
                name
            )));
        }

        let folder = sqlx::query_as::<Postgres, Folder>(&format!(
            "INSERT INTO folders (id, library_id, parent_id, name, path) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            FOLDER_COLUMNS
        ))
        .bind(folder_id)
        .bind(library_id)
        .bind(parent_id)
        .bind(name)
        .bind(path)
        .fetch_one(&self.pool)
        .await?;

        Ok(folder)
    }

    #[tracing::instrument(
        skip(self),
        fields(db.table = "folders", db.operation = "select", db.record_id = %folder_id)
    )]
    async fn get_folder(
        &self,
        library_id: Uuid,
        folder_id: Uuid,
    ) -> Result<Option<Folder>, AppError> {
        let folder = sqlx::query_as::<Postgres, Folder>(&format!(
            "SELECT {} FROM folders WHERE library_id = $1 AND id = $2",
            FOLDER_COLUMNS
        ))
        .bind(library_id)
        .bind(folder_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(folder)
    }

    #[tracing::instrument(skip(self), fields(db.table = "folders", db.operation = "select"))]
    async fn get_root_folder(&self, library_id: Uuid) -> Result<Option<Folder>, AppError> {
        let folder = sqlx::query_as::<Postgres, Folder>(&format!(
            "SELECT {} FROM folders WHERE library_id = $1 AND parent_id IS NULL",
            FOLDER_COLUMNS
        ))
        .bind(library_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(folder)
    }

    #[tracing::instrument(skip(self), fields(db.table = "folders", db.operation = "select"))]
    async fn list_child_folders(
        &self,
        library_id: Uuid,
        parent_id: Uuid,
    ) -> Result<Vec<Folder>, AppError> {
        let folders = sqlx::query_as::<Postgres, Folder>(&format!(
            "SELECT {} FROM folders WHERE library_id = $1 AND parent_id = $2 ORDER BY name ASC",
            FOLDER_COLUMNS
        ))
        .bind(library_id)
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(folders)
    }

    #[tracing::instrument(
        skip(self, stats),
        fields(db.table = "folders", db.operation = "update", db.record_id = %folder_id)
    )]
    async fn update_folder_stats(
        &self,
        library_id: Uuid,
        folder_id: Uuid,
        stats: FolderStats,
    ) -> Result<Folder, AppError> {
        let folder = sqlx::query_as::<Postgres, Folder>(&format!(
            "UPDATE folders SET file_count = $3, total_bytes = $4, thumb_sm_bytes = $5, \
             thumb_md_bytes = $6, thumb_lg_bytes = $7, converted_bytes = $8, updated_at = NOW() \
             WHERE library_id = $1 AND id = $2 RETURNING {}",
            FOLDER_COLUMNS
        ))
        .bind(library_id)
        .bind(folder_id)
        .bind(stats.file_count)
        .bind(stats.total_bytes)
        .bind(stats.thumb_sm_bytes)
        .bind(stats.thumb_md_bytes)
        .bind(stats.thumb_lg_bytes)
        .bind(stats.converted_bytes)
        .fetch_optional(&self.pool)
        .await?;

        folder.ok_or_else(|| AppError::NotFound(format!("folder {}", folder_id)))
    }

    #[tracing::instrument(
        skip(self),
        fields(db.table = "folders", db.operation = "delete", db.record_id = %folder_id)
    )]
    async fn delete_folder(&self, library_id: Uuid, folder_id: Uuid) -> Result<bool, AppError> {
        let folder = match self.get_folder(library_id, folder_id).await? {
            Some(folder) => folder,
            None => return Ok(false),
        };

        if folder.is_root() {
            return Err(AppError::Validation(
                "The root folder cannot be deleted".to_string(),
            ));
        }

        let file_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM files WHERE library_id = $1 AND folder_id = $2",
        )
        .bind(library_id)
        .bind(folder_id)
        .fetch_one(&self.pool)
        .await?;

        if file_count > 0 {
            return Err(AppError::Validation(
                "Cannot delete folder: it contains files".to_string(),
            ));
        }

        let subfolder_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM folders WHERE library_id = $1 AND parent_id = $2",
        )
        .bind(library_id)
        .bind(folder_id)
        .fetch_one(&self.pool)
        .await?;

        if subfolder_count > 0 {
            return Err(AppError::Validation(
                "Cannot delete folder: it contains subfolders".to_string(),
            ));
        }

        let rows_affected =
            sqlx::query("DELETE FROM folders WHERE library_id = $1 AND id = $2")
                .bind(library_id)
                .bind(folder_id)
                .execute(&self.pool)
                .await?
                .rows_affected();

        Ok(rows_affected > 0)
    }

    #[tracing::instrument(
        skip(self, add),
        fields(db.table = "files", db.operation = "insert", db.record_id = %file_id)
    )]
    async fn add_file(
        &self,
        library_id: Uuid,
        file_id: Uuid,
        add: FileAdd,
    ) -> Result<MediaFile, AppError> {
        let file = sqlx::query_as::<Postgres, MediaFile>(&format!(
            "INSERT INTO files (id, library_id, folder_id, name, mime_type, is_video, width, \
             height, original_bytes, is_processing, path) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, TRUE, $10) RETURNING {}",
            FILE_COLUMNS
        ))
        .bind(file_id)
        .bind(library_id)
        .bind(add.folder_id)
        .bind(&add.name)
        .bind(&add.mime_type)
        .bind(add.is_video)
        .bind(add.width)
        .bind(add.height)
        .bind(add.original_bytes)
        .bind(&add.path)
        .fetch_one(&self.pool)
        .await?;

        Ok(file)
    }

    #[tracing::instrument(
        skip(self),
        fields(db.table = "files", db.operation = "select", db.record_id = %file_id)
    )]
    async fn get_file(
        &self,
        library_id: Uuid,
        file_id: Uuid,
    ) -> Result<Option<MediaFile>, AppError> {
        let file = sqlx::query_as::<Postgres, MediaFile>(&format!(
            "SELECT {} FROM files WHERE library_id = $1 AND id = $2",
            FILE_COLUMNS
        ))
        .bind(library_id)
        .bind(file_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(file)
    }

    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "select"))]
    async fn list_files(
        &self,
        library_id: Uuid,
        folder_id: Uuid,
    ) -> Result<Vec<MediaFile>, AppError> {
        let files = sqlx::query_as::<Postgres, MediaFile>(&format!(
            "SELECT {} FROM files WHERE library_id = $1 AND folder_id = $2 ORDER BY name ASC",
            FILE_COLUMNS
        ))
        .bind(library_id)
        .bind(folder_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(files)
    }

    #[tracing::instrument(
        skip(self, update),
        fields(db.table = "files", db.operation = "update", db.record_id = %file_id)
    )]
    async fn update_file(
        &self,
        library_id: Uuid,
        file_id: Uuid,
        update: FileUpdate,
    ) -> Result<MediaFile, AppError> {
        let file = sqlx::query_as::<Postgres, MediaFile>(&format!(
            "UPDATE files SET updated_at = NOW(), \
             name = COALESCE($3, name), \
             title = COALESCE($4, title), \
             comments = COALESCE($5, comments), \
             tags = COALESCE($6, tags) \
             WHERE library_id = $1 AND id = $2 RETURNING {}",
            FILE_COLUMNS
        ))
        .bind(library_id)
        .bind(file_id)
        .bind(update.name)
        .bind(update.title)
        .bind(update.comments)
        .bind(update.tags)
        .fetch_optional(&self.pool)
        .await?;

        file.ok_or_else(|| AppError::NotFound(format!("file {}", file_id)))
    }

    #[tracing::instrument(
        skip(self, meta),
        fields(db.table = "files", db.operation = "update", db.record_id = %file_id)
    )]
    async fn apply_captured_metadata(
        &self,
        library_id: Uuid,
        file_id: Uuid,
        meta: &CapturedMetadata,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE files SET updated_at = NOW(), \
             title = COALESCE($3, title), \
             comments = COALESCE($4, comments), \
             tags = CASE WHEN cardinality($5::text[]) > 0 THEN $5 ELSE tags END, \
             camera_make = COALESCE($6, camera_make), \
             camera_model = COALESCE($7, camera_model), \
             gps_latitude = COALESCE($8, gps_latitude), \
             gps_longitude = COALESCE($9, gps_longitude), \
             gps_altitude = COALESCE($10, gps_altitude), \
             captured_at = COALESCE($11, captured_at) \
             WHERE library_id = $1 AND id = $2",
        )
        .bind(library_id)
        .bind(file_id)
        .bind(&meta.title)
        .bind(&meta.comments)
        .bind(&meta.tags)
        .bind(&meta.camera_make)
        .bind(&meta.camera_model)
        .bind(meta.gps_latitude)
        .bind(meta.gps_longitude)
        .bind(meta.gps_altitude)
        .bind(meta.captured_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(
        skip(self),
        fields(db.table = "files", db.operation = "update", db.record_id = %file_id)
    )]
    async fn update_file_thumbnail(
        &self,
        library_id: Uuid,
        file_id: Uuid,
        size: ThumbnailSize,
        bytes: i64,
    ) -> Result<(), AppError> {
        let column = match size {
            ThumbnailSize::Sm => "thumb_sm_bytes",
            ThumbnailSize::Md => "thumb_md_bytes",
            ThumbnailSize::Lg => "thumb_lg_bytes",
        };

        sqlx::query(&format!(
            "UPDATE files SET {} = $3, updated_at = NOW() WHERE library_id = $1 AND id = $2",
            column
        ))
        .bind(library_id)
        .bind(file_id)
        .bind(bytes)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(
        skip(self),
        fields(db.table = "files", db.operation = "update", db.record_id = %file_id)
    )]
    async fn update_file_converted(
        &self,
        library_id: Uuid,
        file_id: Uuid,
        bytes: i64,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE files SET converted_bytes = $3, updated_at = NOW() \
             WHERE library_id = $1 AND id = $2",
        )
        .bind(library_id)
        .bind(file_id)
        .bind(bytes)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(
        skip(self),
        fields(db.table = "files", db.operation = "update", db.record_id = %file_id)
    )]
    async fn set_file_processing(
        &self,
        library_id: Uuid,
        file_id: Uuid,
        processing: bool,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE files SET is_processing = $3, updated_at = NOW() \
             WHERE library_id = $1 AND id = $2",
        )
        .bind(library_id)
        .bind(file_id)
        .bind(processing)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(
        skip(self),
        fields(db.table = "files", db.operation = "delete", db.record_id = %file_id)
    )]
    async fn delete_file(&self, library_id: Uuid, file_id: Uuid) -> Result<bool, AppError> {
        let rows_affected =
            sqlx::query("DELETE FROM files WHERE library_id = $1 AND id = $2")
                .bind(library_id)
                .bind(file_id)
                .execute(&self.pool)
                .await?
                .rows_affected();

        Ok(rows_affected > 0)
    }
}
