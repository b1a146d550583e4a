use tracing::{error, info, warn};

use crate::{
    entities::image::{ImageRecord, ImageUploadRequest, UploadReceipt},
    errors::AppError,
    repositories::{blob::BlobStore, metadata::MetadataStore},
    validation::{content, metadata},
};

/// Upload pipeline: validate the untrusted bytes, derive canonical metadata
/// from them, then write blob-first with a compensating delete if the
/// metadata write fails. The two writes are deliberately not transactional;
/// the write order bounds the failure window to an orphaned blob, never a
/// record pointing at a missing blob.
pub struct UploadHandler<B, M>
where
    B: BlobStore,
    M: MetadataStore,
{
    pub blob_store: B,
    pub metadata_store: M,
}

impl<B, M> UploadHandler<B, M>
where
    B: BlobStore,
    M: MetadataStore,
{
    pub fn new(blob_store: B, metadata_store: M) -> Self {
        UploadHandler {
            blob_store,
            metadata_store,
        }
    }

    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        request: ImageUploadRequest,
    ) -> Result<UploadReceipt, AppError> {
        content::validate_extension(filename)?;
        content::validate_size(bytes.len())?;
        let decoded = content::validate_content(&bytes)?;

        metadata::validate_title(request.title.as_deref())?;
        metadata::validate_description(request.description.as_deref())?;
        metadata::validate_tags(request.tags.as_deref())?;
        metadata::validate_owner_id(&request.owner_id)?;

        let file_size = bytes.len() as i64;
        let record = ImageRecord::create_new(request, filename.to_string(), file_size, &decoded);

        self.blob_store
            .put(&record.storage_key, bytes, &record.content_type)
            .await
            .map_err(|e| {
                error!(storage_key = %record.storage_key, error = %e, "blob write failed");
                AppError::Storage("Failed to upload image to storage".to_string())
            })?;

        if let Err(e) = self.metadata_store.put(&record).await {
            error!(image_id = %record.id, error = %e, "metadata write failed, rolling back blob");
            // Best effort; the caller only learns about the metadata failure.
            if let Err(rollback_err) = self.blob_store.delete(&record.storage_key).await {
                warn!(
                    storage_key = %record.storage_key,
                    error = %rollback_err,
                    "compensating blob delete failed, blob orphaned"
                );
            }
            return Err(AppError::Storage("Failed to store image metadata".to_string()));
        }

        info!(image_id = %record.id, owner_id = %record.owner_id, "image uploaded");

        Ok(UploadReceipt {
            id: record.id,
            message: "Image uploaded successfully".to_string(),
        })
    }
}
