use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One uploaded portfolio item as stored in the works list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkRecord {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub file_path: String,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub original_name: String,
    // Older works lists store the timestamp as `date`.
    #[serde(alias = "date")]
    pub created_at: DateTime<Utc>,
}

/// User-supplied text fields of an upload form.
#[derive(Clone, Debug, Default)]
pub struct NewWork {
    pub title: String,
    pub category: String,
    pub description: String,
}

/// File part of an upload form, fully received.
#[derive(Clone, Debug)]
pub struct UploadedFile {
    pub content: Vec<u8>,
    pub original_name: String,
    pub mime_type: String,
}
