use async_trait::async_trait;

use crate::{entities::image::ImageRecord, errors::AppError, pagination::StoreCursor};

/// Attribute filters for the scan path: exact match on owner, substring
/// containment on the comma-joined tags attribute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListFilter {
    pub owner_id: Option<String>,
    pub tag: Option<String>,
}

/// Partial update applied at an exact (id, created_at) composite key. Only
/// the lifecycle fields are mutable; everything else is write-once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageRecordPatch {
    pub is_deleted: Option<bool>,
    pub pending_purge: Option<bool>,
    pub updated_at: Option<String>,
}

/// One page of results plus the store-native resume position, already
/// converted to the codec-facing cursor shape.
#[derive(Debug, Clone, Default)]
pub struct StorePage {
    pub items: Vec<ImageRecord>,
    pub next_cursor: Option<StoreCursor>,
}

/// Narrow seam over the structured store. Two native access patterns exist:
/// direct key lookup and attribute-filtered scan/query; everything above is
/// built from those.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn check_connection(&self) -> Result<(), AppError>;

    /// Unconditional upsert keyed by (id, created_at).
    async fn put(&self, record: &ImageRecord) -> Result<(), AppError>;

    /// The partition key is the id; the sort key is unknown to callers, so
    /// this resolves to "the one record sharing this id".
    async fn get_by_id(&self, id: &str) -> Result<Option<ImageRecord>, AppError>;

    /// Owner-indexed access path, most recent first.
    async fn query_by_owner(
        &self,
        owner_id: &str,
        limit: u32,
        cursor: Option<StoreCursor>,
    ) -> Result<StorePage, AppError>;

    /// Full scan with server-side filtering. No ordering guarantee.
    async fn scan_filtered(
        &self,
        limit: u32,
        cursor: Option<StoreCursor>,
        filter: ListFilter,
    ) -> Result<StorePage, AppError>;

    async fn update(
        &self,
        id: &str,
        created_at: &str,
        patch: &ImageRecordPatch,
    ) -> Result<(), AppError>;

    /// Physical removal. Rollback-only; the soft-delete path never calls it.
    async fn delete(&self, id: &str, created_at: &str) -> Result<(), AppError>;
}
