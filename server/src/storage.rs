use log::{info, warn};
use rand::Rng;
use std::{
    fs, io,
    path::{Component, Path, PathBuf},
};
use tokio::io::AsyncWriteExt;

use crate::{config::ServerConfig, error::CatalogError};

pub const UPLOADS_URL_PREFIX: &str = "/uploads";
pub const DEFAULT_BUCKET: &str = "misc";
pub const MAX_UPLOAD_SIZE: usize = 100 * 1024 * 1024;

const TEMP_SUFFIX: &str = ".tmp";

/// Create the data and uploads directories, seed an empty works list, and clear
/// temp files left behind by an interrupted list write.
pub fn init_storage_dirs(config: &ServerConfig) -> io::Result<()> {
    fs::create_dir_all(&config.data_dir)?;
    fs::create_dir_all(&config.uploads_dir)?;

    for entry in fs::read_dir(&config.data_dir)? {
        let path = entry?.path();
        let stale = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with('.') && name.ends_with(TEMP_SUFFIX));
        if stale && path.is_file() {
            info!("Removing stale temp file {}", path.display());
            fs::remove_file(path)?;
        }
    }

    let works_file = config.works_file();
    if !works_file.exists() {
        fs::write(&works_file, "[]")?;
        info!("Created empty works list at {}", works_file.display());
    }
    info!(
        "Storage ready (data: {}, uploads: {})",
        config.data_dir.display(),
        config.uploads_dir.display()
    );
    Ok(())
}

/// Map a user-supplied category to the uploads sub-directory it is stored under.
pub fn category_bucket(category: &str) -> Result<String, CatalogError> {
    let trimmed = category.trim();
    if trimmed.is_empty() {
        return Ok(DEFAULT_BUCKET.to_string());
    }
    if trimmed == "." || trimmed == ".." || trimmed.contains(['/', '\\', '\0']) {
        return Err(CatalogError::InvalidUpload(format!("Invalid category: {}", category)));
    }

    Ok(trimmed
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '-' })
        .collect())
}

/// `<base>-<suffix>.<ext>`, where `base` keeps only ASCII alphanumerics.
pub fn stored_file_name(original_name: &str, suffix: &str) -> String {
    // Browsers on Windows may send the full client path.
    let name = original_name.rsplit(['/', '\\']).next().unwrap_or_default();
    let path = Path::new(name);

    let base: String = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let base = if base.is_empty() { "file".to_string() } else { base };

    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) => {
            format!("{}-{}.{}", base, suffix, ext)
        }
        _ => format!("{}-{}", base, suffix),
    }
}

/// Creation-time millis plus a random component.
pub fn unique_suffix(now_millis: i64) -> String {
    let random: u32 = rand::rng().random_range(0..1_000_000_000);
    format!("{}-{}", now_millis, random)
}

/// Externally reachable URL path for a stored upload.
pub fn upload_url(bucket: &str, file_name: &str) -> String {
    format!("{}/{}/{}", UPLOADS_URL_PREFIX, bucket, file_name)
}

/// Resolve a `/uploads/...` URL path to a file under `uploads_dir`.
///
/// Returns `None` for paths outside the prefix or with anything other than
/// plain name segments.
pub fn resolve_upload_path(uploads_dir: &Path, url_path: &str) -> Option<PathBuf> {
    let rest = url_path.strip_prefix(UPLOADS_URL_PREFIX)?.strip_prefix('/')?;
    let relative = Path::new(rest);
    if rest.is_empty() || !relative.components().all(|c| matches!(c, Component::Normal(_))) {
        return None;
    }
    Some(uploads_dir.join(relative))
}

/// Replace `path` with `bytes` so that readers see either the old or the new content.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("works.json");
    let random: u32 = rand::rng().random();
    let temp_path = dir.join(format!(".{}.{:08x}{}", name, random, TEMP_SUFFIX));

    let result = async {
        let mut file = tokio::fs::File::create(&temp_path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&temp_path, path).await
    }
    .await;

    if result.is_err() {
        if let Err(err) = tokio::fs::remove_file(&temp_path).await {
            if err.kind() != io::ErrorKind::NotFound {
                warn!("Failed to remove temp file {}: {}", temp_path.display(), err);
            }
        }
    }
    result
}
