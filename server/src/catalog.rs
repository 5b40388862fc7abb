//! Works catalog persisted as a single JSON list plus the uploaded files it points at.
//!
//! Mutations run under one write lock for the whole read-modify-write of the list.
//! Reads take no lock; the list is always replaced by rename, so a reader sees a
//! complete snapshot.

use chrono::Utc;
use log::{error, info, warn};
use std::{
    io,
    path::{Path, PathBuf},
};
use tokio::sync::Mutex;

use crate::{
    config::ServerConfig,
    error::CatalogError,
    records::{NewWork, UploadedFile, WorkRecord},
    storage::{self, init_storage_dirs},
};

pub struct WorkCatalog {
    works_file: PathBuf,
    uploads_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl WorkCatalog {
    /// Prepare the storage directories and open the catalog.
    pub fn open(config: &ServerConfig) -> Result<Self, CatalogError> {
        init_storage_dirs(config).map_err(|e| {
            CatalogError::StorageUnavailable(format!(
                "failed to prepare {}: {}",
                config.data_dir.display(),
                e
            ))
        })?;

        Ok(Self {
            works_file: config.works_file(),
            uploads_dir: config.uploads_dir.clone(),
            write_lock: Mutex::new(()),
        })
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    /// All works, most recent first, optionally only those in `category`.
    pub async fn list_works(&self, category: Option<&str>) -> Result<Vec<WorkRecord>, CatalogError> {
        let works = self.load().await?;
        Ok(match category {
            Some(category) => works
                .into_iter()
                .filter(|work| work.category == category)
                .collect(),
            None => works,
        })
    }

    /// Store the uploaded file and add a record for it at the head of the list.
    pub async fn create_work(
        &self,
        fields: NewWork,
        upload: UploadedFile,
    ) -> Result<WorkRecord, CatalogError> {
        if upload.content.is_empty() {
            return Err(CatalogError::InvalidUpload("No file uploaded.".to_string()));
        }

        let bucket = storage::category_bucket(&fields.category)?;
        let bucket_dir = self.uploads_dir.join(&bucket);
        tokio::fs::create_dir_all(&bucket_dir).await.map_err(|e| {
            CatalogError::StorageWriteFailed(format!("create {}: {}", bucket_dir.display(), e))
        })?;

        let now = Utc::now();
        let file_name = storage::stored_file_name(
            &upload.original_name,
            &storage::unique_suffix(now.timestamp_millis()),
        );
        let file_path = bucket_dir.join(&file_name);
        write_new_file(&file_path, &upload.content).await.map_err(|e| {
            CatalogError::StorageWriteFailed(format!("write {}: {}", file_path.display(), e))
        })?;
        info!("File stored: {} ({} bytes)", file_path.display(), upload.content.len());

        let result = self
            .insert_work(|works| WorkRecord {
                id: next_id(works, now.timestamp_millis()),
                title: fields.title,
                category: fields.category,
                description: fields.description,
                file_path: storage::upload_url(&bucket, &file_name),
                file_type: upload.mime_type,
                original_name: upload.original_name,
                created_at: now,
            })
            .await;

        match &result {
            Ok(work) => info!("Work created: id={}, file={}", work.id, work.file_path),
            Err(err) => error!(
                "Work not recorded, {} is now an orphan: {}",
                file_path.display(),
                err
            ),
        }
        result
    }

    /// Remove the record with `id` and, best effort, its file.
    pub async fn delete_work(&self, id: &str) -> Result<WorkRecord, CatalogError> {
        let _guard = self.write_lock.lock().await;

        let mut works = self.load().await?;
        let index = works
            .iter()
            .position(|work| work.id == id)
            .ok_or(CatalogError::NotFound)?;

        // The list goes first: a failed write must not leave a record without its file.
        let work = works.remove(index);
        self.store(&works).await?;
        self.remove_file(&work).await;
        info!("Work deleted: id={}", work.id);
        Ok(work)
    }

    async fn insert_work(
        &self,
        build: impl FnOnce(&[WorkRecord]) -> WorkRecord,
    ) -> Result<WorkRecord, CatalogError> {
        let _guard = self.write_lock.lock().await;

        let mut works = self.load().await?;
        let work = build(&works);
        works.insert(0, work.clone());
        self.store(&works).await?;
        Ok(work)
    }

    async fn remove_file(&self, work: &WorkRecord) {
        let Some(path) = storage::resolve_upload_path(&self.uploads_dir, &work.file_path) else {
            warn!("Work {} has unexpected file path {:?}, skipping file removal", work.id, work.file_path);
            return;
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => info!("File removed: {}", path.display()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!("File already missing: {}", path.display())
            }
            Err(err) => warn!("Failed to remove {}: {}", path.display(), err),
        }
    }

    async fn load(&self) -> Result<Vec<WorkRecord>, CatalogError> {
        let bytes = match tokio::fs::read(&self.works_file).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(CatalogError::StorageUnavailable(format!(
                    "read {}: {}",
                    self.works_file.display(),
                    err
                )))
            }
        };

        serde_json::from_slice(&bytes).map_err(|e| {
            CatalogError::StorageUnavailable(format!("parse {}: {}", self.works_file.display(), e))
        })
    }

    async fn store(&self, works: &[WorkRecord]) -> Result<(), CatalogError> {
        let json = serde_json::to_vec_pretty(works)
            .map_err(|e| CatalogError::StorageWriteFailed(format!("serialize works: {}", e)))?;
        storage::write_atomic(&self.works_file, &json)
            .await
            .map_err(|e| {
                CatalogError::StorageWriteFailed(format!("write {}: {}", self.works_file.display(), e))
            })
    }
}

/// Millisecond timestamp id, bumped past every existing numeric id.
///
/// Once the numeric range is used up the id falls back to `<millis>-<random>`.
fn next_id(works: &[WorkRecord], now_millis: i64) -> String {
    let taken = |id: &str| works.iter().any(|work| work.id == id);
    let latest = works
        .iter()
        .filter_map(|work| work.id.parse::<i64>().ok())
        .max();

    let mut candidate = match latest {
        Some(latest) => latest.checked_add(1).map(|next| next.max(now_millis)),
        None => Some(now_millis),
    };
    while let Some(id) = candidate {
        let id = id.to_string();
        if !taken(&id) {
            return id;
        }
        candidate = candidate.and_then(|id| id.checked_add(1));
    }

    loop {
        let id = storage::unique_suffix(now_millis);
        if !taken(&id) {
            return id;
        }
    }
}

async fn write_new_file(path: &Path, content: &[u8]) -> io::Result<()> {
    use tokio::io::AsyncWriteExt;

    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    let result = async {
        file.write_all(content).await?;
        file.flush().await
    }
    .await;

    if result.is_err() {
        drop(file);
        let _ = tokio::fs::remove_file(path).await;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{collections::HashSet, sync::Arc};
    use tempfile::TempDir;

    fn open_catalog() -> (TempDir, WorkCatalog) {
        let temp = TempDir::new().unwrap();
        let config = ServerConfig::with_root(temp.path());
        let catalog = WorkCatalog::open(&config).unwrap();
        (temp, catalog)
    }

    fn fields(title: &str, category: &str) -> NewWork {
        NewWork {
            title: title.to_string(),
            category: category.to_string(),
            description: String::new(),
        }
    }

    fn upload(name: &str) -> UploadedFile {
        UploadedFile {
            content: b"content".to_vec(),
            original_name: name.to_string(),
            mime_type: "image/png".to_string(),
        }
    }

    #[tokio::test]
    async fn empty_catalog_lists_nothing() {
        let (_temp, catalog) = open_catalog();
        assert!(catalog.list_works(None).await.unwrap().is_empty());
        assert!(catalog.list_works(Some("art")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_list_file_reads_as_empty() {
        let (_temp, catalog) = open_catalog();
        std::fs::remove_file(&catalog.works_file).unwrap();
        assert!(catalog.list_works(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_list_is_unavailable() {
        let (_temp, catalog) = open_catalog();
        std::fs::write(&catalog.works_file, "{not json").unwrap();
        assert!(matches!(
            catalog.list_works(None).await,
            Err(CatalogError::StorageUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn upload_scenario() {
        let (_temp, catalog) = open_catalog();

        let work = catalog
            .create_work(fields("Sunset", "art"), upload("my photo.png"))
            .await
            .unwrap();

        assert_eq!(work.category, "art");
        assert_eq!(work.title, "Sunset");
        assert_eq!(work.original_name, "my photo.png");
        assert_eq!(work.file_type, "image/png");

        let name = work.file_path.strip_prefix("/uploads/art/my-photo-").unwrap();
        let suffix = name.strip_suffix(".png").unwrap();
        let parts: Vec<&str> = suffix.split('-').collect();
        assert_eq!(parts.len(), 2);
        assert!(parts.iter().all(|p| p.chars().all(|c| c.is_ascii_digit())));

        let on_disk = storage::resolve_upload_path(catalog.uploads_dir(), &work.file_path).unwrap();
        assert_eq!(std::fs::read(on_disk).unwrap(), b"content");

        let works = catalog.list_works(None).await.unwrap();
        assert_eq!(works[0], work);
    }

    #[tokio::test]
    async fn empty_category_uses_misc_bucket() {
        let (_temp, catalog) = open_catalog();
        let work = catalog
            .create_work(fields("", ""), upload("notes.txt"))
            .await
            .unwrap();
        assert!(work.file_path.starts_with("/uploads/misc/notes-"));
        assert_eq!(work.category, "");
    }

    #[tokio::test]
    async fn rejects_empty_upload() {
        let (_temp, catalog) = open_catalog();
        let mut file = upload("a.png");
        file.content.clear();

        let result = catalog.create_work(fields("a", "art"), file).await;
        assert!(matches!(result, Err(CatalogError::InvalidUpload(_))));
        assert!(catalog.list_works(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_traversal_category() {
        let (_temp, catalog) = open_catalog();
        let result = catalog.create_work(fields("a", "../data"), upload("a.png")).await;
        assert!(matches!(result, Err(CatalogError::InvalidUpload(_))));
        assert_eq!(std::fs::read_dir(catalog.uploads_dir()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn newest_first_with_distinct_ids() {
        let (_temp, catalog) = open_catalog();
        let mut ids = HashSet::new();
        let mut created = Vec::new();
        for i in 0..5 {
            let work = catalog
                .create_work(fields(&format!("w{}", i), "art"), upload("same.png"))
                .await
                .unwrap();
            assert!(ids.insert(work.id.clone()));
            created.push(work);
            let head = catalog.list_works(None).await.unwrap();
            assert_eq!(head[0].id, created.last().unwrap().id);
        }

        let listed: Vec<String> = catalog
            .list_works(None)
            .await
            .unwrap()
            .into_iter()
            .map(|w| w.id)
            .collect();
        let expected: Vec<String> = created.iter().rev().map(|w| w.id.clone()).collect();
        assert_eq!(listed, expected);

        let paths: HashSet<_> = created.iter().map(|w| w.file_path.clone()).collect();
        assert_eq!(paths.len(), 5);
    }

    #[tokio::test]
    async fn filter_keeps_catalog_order() {
        let (_temp, catalog) = open_catalog();
        let a1 = catalog.create_work(fields("a1", "art"), upload("a.png")).await.unwrap();
        catalog.create_work(fields("m1", "media"), upload("m.mp4")).await.unwrap();
        let a2 = catalog.create_work(fields("a2", "art"), upload("a.png")).await.unwrap();

        let art = catalog.list_works(Some("art")).await.unwrap();
        assert_eq!(art.iter().map(|w| &w.id).collect::<Vec<_>>(), vec![&a2.id, &a1.id]);
        assert!(catalog.list_works(Some("none")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_removes_record_and_file() {
        let (_temp, catalog) = open_catalog();
        let work = catalog.create_work(fields("x", "art"), upload("x.png")).await.unwrap();
        let path = storage::resolve_upload_path(catalog.uploads_dir(), &work.file_path).unwrap();
        assert!(path.exists());

        catalog.delete_work(&work.id).await.unwrap();

        assert!(!path.exists());
        assert!(catalog.list_works(None).await.unwrap().is_empty());
        assert!(matches!(
            catalog.delete_work(&work.id).await,
            Err(CatalogError::NotFound)
        ));
    }

    #[tokio::test]
    async fn delete_unknown_id_leaves_catalog_unchanged() {
        let (_temp, catalog) = open_catalog();
        let work = catalog.create_work(fields("x", "art"), upload("x.png")).await.unwrap();

        assert!(matches!(catalog.delete_work("999").await, Err(CatalogError::NotFound)));
        assert_eq!(catalog.list_works(None).await.unwrap(), vec![work]);
    }

    #[tokio::test]
    async fn delete_survives_missing_file() {
        let (_temp, catalog) = open_catalog();
        let work = catalog.create_work(fields("x", "art"), upload("x.png")).await.unwrap();
        let path = storage::resolve_upload_path(catalog.uploads_dir(), &work.file_path).unwrap();
        std::fs::remove_file(path).unwrap();

        catalog.delete_work(&work.id).await.unwrap();
        assert!(catalog.list_works(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_ignores_foreign_file_path() {
        let (temp, catalog) = open_catalog();
        let outside = temp.path().join("keep.txt");
        std::fs::write(&outside, "keep").unwrap();
        let work = WorkRecord {
            id: "1".to_string(),
            title: String::new(),
            category: String::new(),
            description: String::new(),
            file_path: "/uploads/../keep.txt".to_string(),
            file_type: String::new(),
            original_name: String::new(),
            created_at: Utc::now(),
        };
        catalog.store(&[work]).await.unwrap();

        catalog.delete_work("1").await.unwrap();
        assert!(outside.exists());
        assert!(catalog.list_works(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reload_is_lossless() {
        let temp = TempDir::new().unwrap();
        let config = ServerConfig::with_root(temp.path());
        let catalog = WorkCatalog::open(&config).unwrap();
        let mut file = upload("clip.mp4");
        file.mime_type = "video/mp4".to_string();
        catalog
            .create_work(
                NewWork {
                    title: "Tïtle \"quoted\"".to_string(),
                    category: "media".to_string(),
                    description: "line one\nline two".to_string(),
                },
                file,
            )
            .await
            .unwrap();
        catalog.create_work(fields("", ""), upload("b.png")).await.unwrap();
        let before = catalog.list_works(None).await.unwrap();

        let reopened = WorkCatalog::open(&config).unwrap();
        assert_eq!(reopened.list_works(None).await.unwrap(), before);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_keep_every_record() {
        let (_temp, catalog) = open_catalog();
        let catalog = Arc::new(catalog);

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let catalog = Arc::clone(&catalog);
                tokio::spawn(async move {
                    catalog
                        .create_work(fields(&format!("w{}", i), "art"), upload("same.png"))
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            ids.insert(handle.await.unwrap().id);
        }
        assert_eq!(ids.len(), 16);

        let listed: HashSet<String> = catalog
            .list_works(None)
            .await
            .unwrap()
            .into_iter()
            .map(|w| w.id)
            .collect();
        assert_eq!(listed, ids);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_create_and_delete() {
        let (_temp, catalog) = open_catalog();
        let catalog = Arc::new(catalog);
        let victim = catalog.create_work(fields("v", "art"), upload("v.png")).await.unwrap();

        let deleter = {
            let catalog = Arc::clone(&catalog);
            let id = victim.id.clone();
            tokio::spawn(async move { catalog.delete_work(&id).await.unwrap() })
        };
        let creator = {
            let catalog = Arc::clone(&catalog);
            tokio::spawn(async move {
                catalog.create_work(fields("n", "art"), upload("n.png")).await.unwrap()
            })
        };

        deleter.await.unwrap();
        let created = creator.await.unwrap();
        let listed = catalog.list_works(None).await.unwrap();
        assert_eq!(listed, vec![created]);
    }

    /// Catalog whose list can be read but not rewritten: the list name is so
    /// long that the temp file next to it exceeds the file name limit.
    fn catalog_with_unwritable_list(catalog: WorkCatalog) -> WorkCatalog {
        let works_file = catalog
            .works_file
            .with_file_name(format!("{}.json", "w".repeat(245)));
        std::fs::copy(&catalog.works_file, &works_file).unwrap();
        WorkCatalog {
            works_file,
            ..catalog
        }
    }

    fn work_file_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn failed_list_write_leaves_orphan_file_only() {
        let (_temp, catalog) = open_catalog();
        let catalog = catalog_with_unwritable_list(catalog);

        let result = catalog.create_work(fields("x", "art"), upload("x.png")).await;

        assert!(matches!(result, Err(CatalogError::StorageWriteFailed(_))));
        assert!(catalog.list_works(None).await.unwrap().is_empty());
        assert_eq!(work_file_count(&catalog.uploads_dir().join("art")), 1);
    }

    #[tokio::test]
    async fn failed_delete_keeps_record_and_file() {
        let (_temp, catalog) = open_catalog();
        let work = catalog.create_work(fields("x", "art"), upload("x.png")).await.unwrap();
        let path = storage::resolve_upload_path(catalog.uploads_dir(), &work.file_path).unwrap();
        let catalog = catalog_with_unwritable_list(catalog);

        let result = catalog.delete_work(&work.id).await;

        assert!(matches!(result, Err(CatalogError::StorageWriteFailed(_))));
        assert_eq!(catalog.list_works(None).await.unwrap(), vec![work]);
        assert!(path.exists());
    }

    #[test]
    fn next_id_moves_past_existing() {
        let mut works = Vec::new();
        assert_eq!(next_id(&works, 100), "100");

        works.push(WorkRecord {
            id: "100".to_string(),
            title: String::new(),
            category: String::new(),
            description: String::new(),
            file_path: String::new(),
            file_type: String::new(),
            original_name: String::new(),
            created_at: Utc::now(),
        });
        assert_eq!(next_id(&works, 100), "101");
        assert_eq!(next_id(&works, 50), "101");
        assert_eq!(next_id(&works, 500), "500");
    }

    #[test]
    fn next_id_survives_largest_numeric_id() {
        let works = vec![WorkRecord {
            id: i64::MAX.to_string(),
            title: String::new(),
            category: String::new(),
            description: String::new(),
            file_path: String::new(),
            file_type: String::new(),
            original_name: String::new(),
            created_at: Utc::now(),
        }];

        let id = next_id(&works, 100);
        assert_ne!(id, works[0].id);
        assert!(id.starts_with("100-"));
    }
}
