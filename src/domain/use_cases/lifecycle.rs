use tracing::{error, info};

use crate::{
    entities::image::{now_timestamp, DeleteReceipt, ImageRecord},
    errors::AppError,
    repositories::metadata::{ImageRecordPatch, MetadataStore},
};

/// Literal token a caller must supply to schedule irreversible removal.
pub const PERMANENT_DELETE_CONFIRMATION: &str = "permanently-delete";

/// Owns the only mutations a record ever sees after creation: the monotonic
/// `is_deleted` transition and the purge marker.
pub struct LifecycleHandler<M>
where
    M: MetadataStore,
{
    pub metadata_store: M,
}

impl<M> LifecycleHandler<M>
where
    M: MetadataStore,
{
    pub fn new(metadata_store: M) -> Self {
        LifecycleHandler { metadata_store }
    }

    async fn fetch_owned(
        &self,
        id: &str,
        requester_owner_id: &str,
    ) -> Result<ImageRecord, AppError> {
        let record = self
            .metadata_store
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Image not found".to_string()))?;

        // Ownership is checked before deletion state so an unauthorized
        // caller cannot tell a deleted record from a live one.
        if record.owner_id != requester_owner_id {
            return Err(AppError::Unauthorized(
                "Unauthorized to delete this image".to_string(),
            ));
        }

        Ok(record)
    }

    pub async fn soft_delete(
        &self,
        id: &str,
        requester_owner_id: &str,
    ) -> Result<DeleteReceipt, AppError> {
        let record = self.fetch_owned(id, requester_owner_id).await?;

        if record.is_deleted {
            return Err(AppError::Gone("Image already deleted".to_string()));
        }

        let patch = ImageRecordPatch {
            is_deleted: Some(true),
            updated_at: Some(now_timestamp()),
            ..Default::default()
        };

        self.metadata_store
            .update(&record.id.to_string(), &record.created_at, &patch)
            .await
            .map_err(|e| {
                error!(image_id = %record.id, error = %e, "soft delete update failed");
                AppError::Storage("Failed to delete image".to_string())
            })?;

        info!(image_id = %record.id, owner_id = %record.owner_id, "image soft-deleted");

        Ok(DeleteReceipt {
            id: record.id,
            message: "Image deleted successfully".to_string(),
        })
    }

    /// Confirmed request that marks a record for deferred, irreversible
    /// removal. The actual purge runs outside this service; nothing here
    /// touches the blob store or physically removes metadata.
    pub async fn permanent_delete(
        &self,
        id: &str,
        requester_owner_id: &str,
        confirmation: Option<&str>,
    ) -> Result<DeleteReceipt, AppError> {
        match confirmation {
            Some(token) if token == PERMANENT_DELETE_CONFIRMATION => {}
            Some(_) => {
                return Err(AppError::Validation(format!(
                    "Permanent deletion requires confirm={PERMANENT_DELETE_CONFIRMATION}"
                )));
            }
            None => {
                return Err(AppError::Validation(
                    "Missing confirmation for permanent deletion".to_string(),
                ));
            }
        }

        // A record that is already soft-deleted may still be marked for
        // purge, so no Gone check here.
        let record = self.fetch_owned(id, requester_owner_id).await?;

        let patch = ImageRecordPatch {
            is_deleted: Some(true),
            pending_purge: Some(true),
            updated_at: Some(now_timestamp()),
        };

        self.metadata_store
            .update(&record.id.to_string(), &record.created_at, &patch)
            .await
            .map_err(|e| {
                error!(image_id = %record.id, error = %e, "purge mark update failed");
                AppError::Storage("Failed to delete image".to_string())
            })?;

        info!(image_id = %record.id, owner_id = %record.owner_id, "image marked for purge");

        Ok(DeleteReceipt {
            id: record.id,
            message: "Image scheduled for permanent removal".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::image::ImageUploadRequest;
    use crate::repositories::metadata::MockMetadataStore;
    use crate::validation::content::DecodedImage;

    fn record_for(owner_id: &str) -> ImageRecord {
        ImageRecord::create_new(
            ImageUploadRequest {
                title: None,
                description: None,
                tags: None,
                owner_id: owner_id.to_string(),
            },
            "pic.png".to_string(),
            2048,
            &DecodedImage {
                width: 100,
                height: 100,
                format: "png".to_string(),
            },
        )
    }

    #[actix_rt::test]
    async fn soft_delete_marks_record_at_exact_composite_key() {
        let record = record_for("u1");
        let id = record.id.to_string();
        let created_at = record.created_at.clone();

        let mut metadata_store = MockMetadataStore::new();
        let stored = record.clone();
        metadata_store
            .expect_get_by_id()
            .returning(move |_| Ok(Some(stored.clone())));
        metadata_store
            .expect_update()
            .withf(move |update_id, update_created_at, patch| {
                update_id == id
                    && update_created_at == created_at
                    && patch.is_deleted == Some(true)
                    && patch.pending_purge.is_none()
                    && patch.updated_at.is_some()
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let handler = LifecycleHandler::new(metadata_store);
        let receipt = handler
            .soft_delete(&record.id.to_string(), "u1")
            .await
            .unwrap();

        assert_eq!(receipt.id, record.id);
    }

    #[actix_rt::test]
    async fn soft_delete_of_missing_record_is_not_found() {
        let mut metadata_store = MockMetadataStore::new();
        metadata_store.expect_get_by_id().returning(|_| Ok(None));

        let handler = LifecycleHandler::new(metadata_store);
        let err = handler.soft_delete("nonexistent", "u1").await.unwrap_err();

        assert_eq!(err, AppError::NotFound("Image not found".to_string()));
    }

    #[actix_rt::test]
    async fn soft_delete_by_non_owner_is_unauthorized_and_leaves_record_untouched() {
        let record = record_for("u1");
        let id = record.id.to_string();

        let mut metadata_store = MockMetadataStore::new();
        metadata_store
            .expect_get_by_id()
            .returning(move |_| Ok(Some(record.clone())));
        // No update expectation: a write would panic the test.

        let handler = LifecycleHandler::new(metadata_store);
        let err = handler.soft_delete(&id, "u2").await.unwrap_err();

        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[actix_rt::test]
    async fn ownership_is_checked_before_deletion_state() {
        let mut record = record_for("u1");
        record.is_deleted = true;
        let id = record.id.to_string();

        let mut metadata_store = MockMetadataStore::new();
        metadata_store
            .expect_get_by_id()
            .returning(move |_| Ok(Some(record.clone())));

        let handler = LifecycleHandler::new(metadata_store);
        let err = handler.soft_delete(&id, "u2").await.unwrap_err();

        // A non-owner sees unauthorized, not gone.
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[actix_rt::test]
    async fn repeat_soft_delete_reports_gone() {
        let mut record = record_for("u1");
        record.is_deleted = true;
        let id = record.id.to_string();

        let mut metadata_store = MockMetadataStore::new();
        metadata_store
            .expect_get_by_id()
            .returning(move |_| Ok(Some(record.clone())));

        let handler = LifecycleHandler::new(metadata_store);
        let err = handler.soft_delete(&id, "u1").await.unwrap_err();

        assert_eq!(err, AppError::Gone("Image already deleted".to_string()));
    }

    #[actix_rt::test]
    async fn failed_update_surfaces_storage_error() {
        let record = record_for("u1");
        let id = record.id.to_string();

        let mut metadata_store = MockMetadataStore::new();
        metadata_store
            .expect_get_by_id()
            .returning(move |_| Ok(Some(record.clone())));
        metadata_store
            .expect_update()
            .returning(|_, _, _| Err(AppError::Storage("conditional check failed".to_string())));

        let handler = LifecycleHandler::new(metadata_store);
        let err = handler.soft_delete(&id, "u1").await.unwrap_err();

        assert_eq!(err, AppError::Storage("Failed to delete image".to_string()));
    }

    #[actix_rt::test]
    async fn permanent_delete_requires_the_literal_confirmation() {
        let handler = LifecycleHandler::new(MockMetadataStore::new());

        let err = handler.permanent_delete("any", "u1", None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = handler
            .permanent_delete("any", "u1", Some("yes please"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[actix_rt::test]
    async fn permanent_delete_sets_purge_marker() {
        let record = record_for("u1");
        let id = record.id.to_string();

        let mut metadata_store = MockMetadataStore::new();
        metadata_store
            .expect_get_by_id()
            .returning(move |_| Ok(Some(record.clone())));
        metadata_store
            .expect_update()
            .withf(|_, _, patch| {
                patch.is_deleted == Some(true) && patch.pending_purge == Some(true)
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let handler = LifecycleHandler::new(metadata_store);
        let receipt = handler
            .permanent_delete(&id, "u1", Some(PERMANENT_DELETE_CONFIRMATION))
            .await
            .unwrap();

        assert_eq!(receipt.message, "Image scheduled for permanent removal");
    }

    #[actix_rt::test]
    async fn permanent_delete_accepts_an_already_soft_deleted_record() {
        let mut record = record_for("u1");
        record.is_deleted = true;
        let id = record.id.to_string();

        let mut metadata_store = MockMetadataStore::new();
        metadata_store
            .expect_get_by_id()
            .returning(move |_| Ok(Some(record.clone())));
        metadata_store
            .expect_update()
            .times(1)
            .returning(|_, _, _| Ok(()));

        let handler = LifecycleHandler::new(metadata_store);
        assert!(handler
            .permanent_delete(&id, "u1", Some(PERMANENT_DELETE_CONFIRMATION))
            .await
            .is_ok());
    }
}
