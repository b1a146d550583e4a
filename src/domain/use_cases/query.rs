use tracing::{error, warn};

use crate::{
    entities::image::{DownloadLinkResponse, ImageListResponse, ImageRecord, ImageResponse},
    errors::AppError,
    pagination,
    repositories::{
        blob::BlobStore,
        metadata::{ListFilter, MetadataStore},
    },
};

/// Read path: single-record fetch with derived access URLs, and the
/// paginated list/filter path layered over the store's two native access
/// patterns.
pub struct QueryHandler<B, M>
where
    B: BlobStore,
    M: MetadataStore,
{
    pub blob_store: B,
    pub metadata_store: M,
    default_presign_ttl_secs: u64,
}

impl<B, M> QueryHandler<B, M>
where
    B: BlobStore,
    M: MetadataStore,
{
    pub fn new(blob_store: B, metadata_store: M, default_presign_ttl_secs: u64) -> Self {
        QueryHandler {
            blob_store,
            metadata_store,
            default_presign_ttl_secs,
        }
    }

    /// Absent and soft-deleted records are indistinguishable to callers.
    async fn fetch_live(&self, id: &str) -> Result<ImageRecord, AppError> {
        match self.metadata_store.get_by_id(id).await? {
            Some(record) if !record.is_deleted => Ok(record),
            _ => Err(AppError::NotFound("Image not found".to_string())),
        }
    }

    pub async fn get_image(
        &self,
        id: &str,
        include_download_url: bool,
    ) -> Result<ImageResponse, AppError> {
        let record = self.fetch_live(id).await?;
        let storage_key = record.storage_key.clone();
        let mut response = ImageResponse::from(record);

        if include_download_url {
            response.download_url = self.presign_or_skip(&storage_key).await;
        }

        Ok(response)
    }

    pub async fn list_images(
        &self,
        limit: u32,
        page_token: Option<&str>,
        owner_id: Option<&str>,
        tag: Option<&str>,
    ) -> Result<ImageListResponse, AppError> {
        // An invalid token is a hard failure, distinct from no token at all.
        let cursor = page_token.map(pagination::decode_page_token).transpose()?;

        let page = match owner_id {
            Some(owner) => {
                self.metadata_store
                    .query_by_owner(owner, limit, cursor)
                    .await?
            }
            None => {
                let filter = ListFilter {
                    owner_id: None,
                    tag: tag.map(str::to_string),
                };
                self.metadata_store.scan_filtered(limit, cursor, filter).await?
            }
        };

        // Deletion visibility is applied after the storage fetch, so a page
        // may come back shorter than `limit`. That is the contract; no
        // re-fetch happens to top it up.
        let mut images = Vec::with_capacity(page.items.len());
        for record in page.items.into_iter().filter(|r| !r.is_deleted) {
            let storage_key = record.storage_key.clone();
            let mut response = ImageResponse::from(record);
            response.download_url = self.presign_or_skip(&storage_key).await;
            images.push(response);
        }

        let has_more = page.next_cursor.is_some();
        let next_page_token = page
            .next_cursor
            .as_ref()
            .map(pagination::encode_page_token)
            .transpose()?;

        Ok(ImageListResponse {
            total_count: images.len(),
            images,
            next_page_token,
            has_more,
        })
    }

    /// For the dedicated download endpoint a presign failure is fatal, unlike
    /// the embedded URLs on read responses.
    pub async fn download_link(
        &self,
        id: &str,
        expires_in: u64,
    ) -> Result<DownloadLinkResponse, AppError> {
        let record = self.fetch_live(id).await?;

        let download_url = self
            .blob_store
            .presign_download(&record.storage_key, expires_in)
            .await
            .map_err(|e| {
                error!(storage_key = %record.storage_key, error = %e, "presign failed");
                AppError::Internal("Failed to generate download URL".to_string())
            })?;

        Ok(DownloadLinkResponse {
            id: record.id,
            download_url,
            expires_in,
            content_type: record.content_type,
            file_size: record.file_size,
        })
    }

    async fn presign_or_skip(&self, storage_key: &str) -> Option<String> {
        match self
            .blob_store
            .presign_download(storage_key, self.default_presign_ttl_secs)
            .await
        {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(storage_key = %storage_key, error = %e, "presign failed, omitting url");
                None
            }
        }
    }
}
