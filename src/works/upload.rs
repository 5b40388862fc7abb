use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use reqwest::blocking::multipart::{Form, Part};
use std::{fs, path::Path, time::Duration};

use crate::client::{ServerClient, UploadResponse, Work, check_response};
use crate::works::WorkFields;

pub const MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

pub fn upload_work(client: &ServerClient, path: &Path, fields: &WorkFields) -> Result<Work> {
    let metadata =
        fs::metadata(path).with_context(|| format!("File not found: {}", path.display()))?;
    if !metadata.is_file() {
        return Err(anyhow::anyhow!("Not a file: {}", path.display()));
    }
    if metadata.len() == 0 {
        return Err(anyhow::anyhow!("File is empty: {}", path.display()));
    }
    if metadata.len() > MAX_FILE_SIZE {
        return Err(anyhow::anyhow!(
            "File exceeds {}MB limit (current: {:.2}MB)",
            MAX_FILE_SIZE / 1024 / 1024,
            metadata.len() as f64 / 1024.0 / 1024.0
        ));
    }

    let form = build_form(path, fields)?;

    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::with_template("{msg} {spinner:.green} {elapsed}")
            .context("Invalid progress template")?,
    );
    progress.set_message(format!("Uploading {}", path.display()));
    progress.enable_steady_tick(Duration::from_millis(120));

    let result = client
        .http()
        .post(client.url("/api/upload"))
        .multipart(form)
        .send()
        .context("Failed to send upload request");
    progress.finish_and_clear();

    let response = check_response(result?, "Upload")?;
    let upload: UploadResponse = response
        .json()
        .context("Failed to parse upload response")?;

    info!(
        "Upload success: id={}, path={}",
        upload.work.id, upload.work.file_path
    );
    Ok(upload.work)
}

/// Multipart form with the text fields first and the file part last.
pub fn build_form(path: &Path, fields: &WorkFields) -> Result<Form> {
    let mime = guess_mime(path);
    let file = Part::file(path)
        .with_context(|| format!("Failed to open {}", path.display()))?
        .mime_str(&mime)
        .context("Invalid MIME type")?;

    Ok(Form::new()
        .text("title", fields.title.clone())
        .text("category", fields.category.clone())
        .text("description", fields.description.clone())
        .part("file", file))
}

pub fn guess_mime(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
