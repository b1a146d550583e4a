use async_trait::async_trait;

use crate::errors::AppError;

/// Narrow seam over the object store. Implementations log backend detail and
/// surface only the generic storage taxonomy; callers never see SDK errors.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), AppError>;

    /// Returns `None` for a key that does not exist; any other backend
    /// failure is an error.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppError>;

    async fn delete(&self, key: &str) -> Result<(), AppError>;

    /// Pure URL signing. No round trip to the store, so a URL for a
    /// nonexistent key is possible; existence is the caller's concern.
    async fn presign_download(&self, key: &str, ttl_seconds: u64) -> Result<String, AppError>;
}
