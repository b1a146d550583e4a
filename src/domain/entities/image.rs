use actix_multipart::form::{bytes::Bytes as MultipartBytes, text::Text, MultipartForm};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::validation::content::DecodedImage;

/// ISO-8601 timestamp for record creation and mutation. Kept as a string
/// everywhere: `created_at` doubles as the metadata store's sort key and must
/// round-trip byte-for-byte through key-based updates and deletes.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// The single persisted entity. Created whole by the upload path; after that
/// only `is_deleted`, `pending_purge` and `updated_at` ever change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: Uuid,
    pub created_at: String,
    pub owner_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub file_name: String,
    pub file_size: i64,
    pub content_type: String,
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub storage_key: String,
    pub is_deleted: bool,
    /// Set by the confirmed permanent-delete request; an out-of-core reaper
    /// owns the actual removal.
    pub pending_purge: bool,
    pub updated_at: Option<String>,
}

impl ImageRecord {
    /// Assembles a brand-new record from validated input. The id and
    /// creation timestamp are assigned here, together, exactly once.
    pub fn create_new(
        request: ImageUploadRequest,
        file_name: String,
        file_size: i64,
        decoded: &DecodedImage,
    ) -> Self {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let storage_key = format!("images/{}/{}.{}", now.format("%Y/%m"), id, decoded.format);

        ImageRecord {
            id,
            created_at: now.to_rfc3339_opts(SecondsFormat::Micros, true),
            owner_id: request.owner_id,
            title: request.title,
            description: request.description,
            tags: request.tags.unwrap_or_default(),
            file_name,
            file_size,
            content_type: format!("image/{}", decoded.format),
            width: decoded.width,
            height: decoded.height,
            format: decoded.format.clone(),
            storage_key,
            is_deleted: false,
            pending_purge: false,
            updated_at: None,
        }
    }
}

/// Client-supplied descriptive metadata accompanying an upload. Everything in
/// here is untrusted until the metadata validator has passed over it.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageUploadRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub owner_id: String,
}

/// Multipart body for `POST /images`. The file limit sits above the 10MB
/// policy ceiling so oversized uploads reach the validator and get the
/// specific size error instead of a bare 413.
#[derive(Debug, MultipartForm)]
pub struct ImageUploadForm {
    #[multipart(limit = "12MB")]
    pub file: MultipartBytes,
    pub title: Option<Text<String>>,
    pub description: Option<Text<String>>,
    pub tags: Option<Text<String>>,
    pub owner_id: Text<String>,
}

/// Outward view of a record. The internal storage key is deliberately absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageResponse {
    pub id: Uuid,
    pub created_at: String,
    pub owner_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub file_name: String,
    pub file_size: i64,
    pub content_type: String,
    pub width: u32,
    pub height: u32,
    pub format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

impl From<ImageRecord> for ImageResponse {
    fn from(record: ImageRecord) -> Self {
        ImageResponse {
            id: record.id,
            created_at: record.created_at,
            owner_id: record.owner_id,
            title: record.title,
            description: record.description,
            tags: record.tags,
            file_name: record.file_name,
            file_size: record.file_size,
            content_type: record.content_type,
            width: record.width,
            height: record.height,
            format: record.format,
            download_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageListResponse {
    pub images: Vec<ImageResponse>,
    pub total_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadReceipt {
    pub id: Uuid,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteReceipt {
    pub id: Uuid,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadLinkResponse {
    pub id: Uuid,
    pub download_url: String,
    pub expires_in: u64,
    pub content_type: String,
    pub file_size: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ListImagesQuery {
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: Option<u32>,
    pub page_token: Option<String>,
    pub owner_id: Option<String>,
    pub tag: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ScopedListQuery {
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: Option<u32>,
    pub page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GetImageQuery {
    pub include_url: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DownloadQuery {
    #[validate(range(min = 60, max = 86400, message = "expires_in must be between 60 and 86400"))]
    pub expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct PermanentDeleteQuery {
    pub confirm: Option<String>,
}

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const DEFAULT_DOWNLOAD_TTL_SECS: u64 = 3600;
