use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_dynamodb::{
    types::{
        AttributeDefinition, AttributeValue, BillingMode, GlobalSecondaryIndex, KeySchemaElement,
        KeyType, Projection, ProjectionType, ScalarAttributeType, TableStatus,
    },
    Client,
};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::{
    entities::image::ImageRecord,
    errors::AppError,
    pagination::StoreCursor,
    repositories::metadata::{ImageRecordPatch, ListFilter, MetadataStore, StorePage},
    settings::AppConfig,
};

/// GSI over (owner_id, created_at) backing the per-owner listing.
pub const OWNER_INDEX: &str = "owner_index";

/// DynamoDB-backed metadata store. Table key is (image_id HASH,
/// created_at RANGE); tags are persisted as one comma-joined string
/// attribute so the scan filter can use `contains`.
#[derive(Clone)]
pub struct DynamoMetadataStore {
    client: Client,
    table_name: String,
}

impl DynamoMetadataStore {
    pub async fn new(config: &AppConfig) -> Result<Self, AppError> {
        let sdk_config = super::sdk_config(config).await;
        let store = DynamoMetadataStore {
            client: Client::new(&sdk_config),
            table_name: config.dynamodb_table.clone(),
        };

        store.ensure_table_exists().await?;
        Ok(store)
    }

    /// Idempotent table bootstrap: describe, create on ResourceNotFound,
    /// then wait for ACTIVE. Concurrent creators are tolerated.
    async fn ensure_table_exists(&self) -> Result<(), AppError> {
        match self
            .client
            .describe_table()
            .table_name(&self.table_name)
            .send()
            .await
        {
            Ok(_) => {
                debug!(table = %self.table_name, "DynamoDB table already exists");
                return Ok(());
            }
            Err(e) => {
                let service_error = e.into_service_error();
                if !service_error.is_resource_not_found_exception() {
                    error!(table = %self.table_name, error = ?service_error, "describe_table failed");
                    return Err(AppError::Storage(
                        "Metadata store is unreachable".to_string(),
                    ));
                }
            }
        }

        info!(table = %self.table_name, "creating DynamoDB table");

        let build_error = |e: aws_sdk_dynamodb::error::BuildError| {
            AppError::Internal(format!("failed to build table schema: {e}"))
        };

        let owner_index = GlobalSecondaryIndex::builder()
            .index_name(OWNER_INDEX)
            .key_schema(
                KeySchemaElement::builder()
                    .attribute_name("owner_id")
                    .key_type(KeyType::Hash)
                    .build()
                    .map_err(build_error)?,
            )
            .key_schema(
                KeySchemaElement::builder()
                    .attribute_name("created_at")
                    .key_type(KeyType::Range)
                    .build()
                    .map_err(build_error)?,
            )
            .projection(
                Projection::builder()
                    .projection_type(ProjectionType::All)
                    .build(),
            )
            .build()
            .map_err(build_error)?;

        let attr_def = |name: &str| {
            AttributeDefinition::builder()
                .attribute_name(name)
                .attribute_type(ScalarAttributeType::S)
                .build()
                .map_err(build_error)
        };

        let created = self
            .client
            .create_table()
            .table_name(&self.table_name)
            .billing_mode(BillingMode::PayPerRequest)
            .key_schema(
                KeySchemaElement::builder()
                    .attribute_name("image_id")
                    .key_type(KeyType::Hash)
                    .build()
                    .map_err(build_error)?,
            )
            .key_schema(
                KeySchemaElement::builder()
                    .attribute_name("created_at")
                    .key_type(KeyType::Range)
                    .build()
                    .map_err(build_error)?,
            )
            .attribute_definitions(attr_def("image_id")?)
            .attribute_definitions(attr_def("created_at")?)
            .attribute_definitions(attr_def("owner_id")?)
            .global_secondary_indexes(owner_index)
            .send()
            .await;

        if let Err(e) = created {
            let service_error = e.into_service_error();
            if !service_error.is_resource_in_use_exception() {
                error!(table = %self.table_name, error = ?service_error, "create_table failed");
                return Err(AppError::Storage(
                    "Metadata store table creation failed".to_string(),
                ));
            }
            debug!(table = %self.table_name, "table created concurrently");
        }

        self.wait_for_table_active().await
    }

    async fn wait_for_table_active(&self) -> Result<(), AppError> {
        let max_attempts = 30;

        for _ in 0..max_attempts {
            let described = self
                .client
                .describe_table()
                .table_name(&self.table_name)
                .send()
                .await
                .map_err(|e| {
                    error!(table = %self.table_name, error = ?e, "describe_table failed");
                    AppError::Storage("Metadata store is unreachable".to_string())
                })?;

            match described.table().and_then(|t| t.table_status()) {
                Some(TableStatus::Active) => {
                    debug!(table = %self.table_name, "DynamoDB table active");
                    return Ok(());
                }
                Some(TableStatus::Creating) | Some(TableStatus::Updating) => {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
                other => {
                    error!(table = %self.table_name, status = ?other, "unexpected table status");
                    return Err(AppError::Storage(
                        "Metadata store table is not usable".to_string(),
                    ));
                }
            }
        }

        error!(table = %self.table_name, "timed out waiting for table to become active");
        Err(AppError::Storage(
            "Metadata store table never became active".to_string(),
        ))
    }

}

fn page_from_output(
    items: &[HashMap<String, AttributeValue>],
    last_evaluated_key: Option<HashMap<String, AttributeValue>>,
) -> Result<StorePage, AppError> {
    let items = items
        .iter()
        .map(item_to_record)
        .collect::<Result<Vec<_>, _>>()?;

    let next_cursor = last_evaluated_key
        .filter(|key| !key.is_empty())
        .map(|key| key_to_cursor(&key));

    Ok(StorePage { items, next_cursor })
}

fn storage_failure(operation: &str) -> AppError {
    AppError::Storage(format!("Metadata store {operation} failed"))
}

/// Flattens a record into the item shape the table expects. Optional fields
/// are simply absent; tags become one comma-joined scalar.
fn record_to_item(record: &ImageRecord) -> HashMap<String, AttributeValue> {
    let mut item = HashMap::new();
    item.insert(
        "image_id".to_string(),
        AttributeValue::S(record.id.to_string()),
    );
    item.insert(
        "created_at".to_string(),
        AttributeValue::S(record.created_at.clone()),
    );
    item.insert(
        "owner_id".to_string(),
        AttributeValue::S(record.owner_id.clone()),
    );
    if let Some(title) = &record.title {
        item.insert("title".to_string(), AttributeValue::S(title.clone()));
    }
    if let Some(description) = &record.description {
        item.insert(
            "description".to_string(),
            AttributeValue::S(description.clone()),
        );
    }
    item.insert(
        "tags".to_string(),
        AttributeValue::S(record.tags.join(",")),
    );
    item.insert(
        "file_name".to_string(),
        AttributeValue::S(record.file_name.clone()),
    );
    item.insert(
        "file_size".to_string(),
        AttributeValue::N(record.file_size.to_string()),
    );
    item.insert(
        "content_type".to_string(),
        AttributeValue::S(record.content_type.clone()),
    );
    item.insert(
        "width".to_string(),
        AttributeValue::N(record.width.to_string()),
    );
    item.insert(
        "height".to_string(),
        AttributeValue::N(record.height.to_string()),
    );
    item.insert("format".to_string(), AttributeValue::S(record.format.clone()));
    item.insert(
        "storage_key".to_string(),
        AttributeValue::S(record.storage_key.clone()),
    );
    item.insert(
        "is_deleted".to_string(),
        AttributeValue::Bool(record.is_deleted),
    );
    item.insert(
        "pending_purge".to_string(),
        AttributeValue::Bool(record.pending_purge),
    );
    if let Some(updated_at) = &record.updated_at {
        item.insert(
            "updated_at".to_string(),
            AttributeValue::S(updated_at.clone()),
        );
    }
    item
}

fn string_attr(item: &HashMap<String, AttributeValue>, name: &str) -> Result<String, AppError> {
    item.get(name)
        .and_then(|value| value.as_s().ok())
        .cloned()
        .ok_or_else(|| AppError::Internal(format!("metadata item missing attribute '{name}'")))
}

fn optional_string_attr(item: &HashMap<String, AttributeValue>, name: &str) -> Option<String> {
    item.get(name).and_then(|value| value.as_s().ok()).cloned()
}

fn number_attr<T: std::str::FromStr>(
    item: &HashMap<String, AttributeValue>,
    name: &str,
) -> Result<T, AppError> {
    item.get(name)
        .and_then(|value| value.as_n().ok())
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| AppError::Internal(format!("metadata item has invalid attribute '{name}'")))
}

fn bool_attr(item: &HashMap<String, AttributeValue>, name: &str) -> bool {
    item.get(name)
        .and_then(|value| value.as_bool().ok())
        .copied()
        .unwrap_or(false)
}

fn item_to_record(item: &HashMap<String, AttributeValue>) -> Result<ImageRecord, AppError> {
    let id = Uuid::parse_str(&string_attr(item, "image_id")?)
        .map_err(|e| AppError::Internal(format!("metadata item has malformed image_id: {e}")))?;

    let tags = string_attr(item, "tags")?
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect();

    Ok(ImageRecord {
        id,
        created_at: string_attr(item, "created_at")?,
        owner_id: string_attr(item, "owner_id")?,
        title: optional_string_attr(item, "title"),
        description: optional_string_attr(item, "description"),
        tags,
        file_name: string_attr(item, "file_name")?,
        file_size: number_attr(item, "file_size")?,
        content_type: string_attr(item, "content_type")?,
        width: number_attr(item, "width")?,
        height: number_attr(item, "height")?,
        format: string_attr(item, "format")?,
        storage_key: string_attr(item, "storage_key")?,
        is_deleted: bool_attr(item, "is_deleted"),
        pending_purge: bool_attr(item, "pending_purge"),
        updated_at: optional_string_attr(item, "updated_at"),
    })
}

/// Resume keys travel as plain string maps. Every key attribute in this
/// table (base and GSI) is a string, so the conversion is lossless.
fn cursor_to_key(cursor: &StoreCursor) -> HashMap<String, AttributeValue> {
    cursor
        .iter()
        .map(|(name, value)| (name.clone(), AttributeValue::S(value.clone())))
        .collect()
}

fn key_to_cursor(key: &HashMap<String, AttributeValue>) -> StoreCursor {
    key.iter()
        .filter_map(|(name, value)| value.as_s().ok().map(|s| (name.clone(), s.clone())))
        .collect()
}

#[async_trait]
impl MetadataStore for DynamoMetadataStore {
    async fn check_connection(&self) -> Result<(), AppError> {
        self.client
            .describe_table()
            .table_name(&self.table_name)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| {
                error!(table = %self.table_name, error = ?e, "describe_table failed");
                storage_failure("liveness check")
            })
    }

    async fn put(&self, record: &ImageRecord) -> Result<(), AppError> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(record_to_item(record)))
            .send()
            .await
            .map_err(|e| {
                error!(image_id = %record.id, error = ?e, "put_item failed");
                storage_failure("write")
            })?;

        debug!(image_id = %record.id, "stored metadata record");
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<ImageRecord>, AppError> {
        let output = self
            .client
            .query()
            .table_name(&self.table_name)
            .key_condition_expression("image_id = :id")
            .expression_attribute_values(":id", AttributeValue::S(id.to_string()))
            .limit(1)
            .send()
            .await
            .map_err(|e| {
                error!(image_id = %id, error = ?e, "query by id failed");
                storage_failure("lookup")
            })?;

        match output.items().first() {
            Some(item) => item_to_record(item).map(Some),
            None => Ok(None),
        }
    }

    async fn query_by_owner(
        &self,
        owner_id: &str,
        limit: u32,
        cursor: Option<StoreCursor>,
    ) -> Result<StorePage, AppError> {
        let output = self
            .client
            .query()
            .table_name(&self.table_name)
            .index_name(OWNER_INDEX)
            .key_condition_expression("owner_id = :owner")
            .expression_attribute_values(":owner", AttributeValue::S(owner_id.to_string()))
            .scan_index_forward(false)
            .limit(limit as i32)
            .set_exclusive_start_key(cursor.as_ref().map(cursor_to_key))
            .send()
            .await
            .map_err(|e| {
                error!(owner_id = %owner_id, error = ?e, "query by owner failed");
                storage_failure("query")
            })?;

        let last_evaluated_key = output.last_evaluated_key().cloned();
        page_from_output(output.items(), last_evaluated_key)
    }

    async fn scan_filtered(
        &self,
        limit: u32,
        cursor: Option<StoreCursor>,
        filter: ListFilter,
    ) -> Result<StorePage, AppError> {
        let mut scan = self
            .client
            .scan()
            .table_name(&self.table_name)
            .limit(limit as i32)
            .set_exclusive_start_key(cursor.as_ref().map(cursor_to_key));

        let mut conditions = Vec::new();
        if let Some(owner_id) = &filter.owner_id {
            conditions.push("owner_id = :owner");
            scan = scan.expression_attribute_values(":owner", AttributeValue::S(owner_id.clone()));
        }
        if let Some(tag) = &filter.tag {
            conditions.push("contains(tags, :tag)");
            scan = scan.expression_attribute_values(":tag", AttributeValue::S(tag.clone()));
        }
        if !conditions.is_empty() {
            scan = scan.filter_expression(conditions.join(" AND "));
        }

        let output = scan.send().await.map_err(|e| {
            error!(error = ?e, "filtered scan failed");
            storage_failure("scan")
        })?;

        let last_evaluated_key = output.last_evaluated_key().cloned();
        page_from_output(output.items(), last_evaluated_key)
    }

    async fn update(
        &self,
        id: &str,
        created_at: &str,
        patch: &ImageRecordPatch,
    ) -> Result<(), AppError> {
        let mut assignments = Vec::new();
        let mut update = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("image_id", AttributeValue::S(id.to_string()))
            .key("created_at", AttributeValue::S(created_at.to_string()))
            // Never resurrect a record the rollback path already removed.
            .condition_expression("attribute_exists(image_id)");

        if let Some(is_deleted) = patch.is_deleted {
            assignments.push("is_deleted = :is_deleted");
            update =
                update.expression_attribute_values(":is_deleted", AttributeValue::Bool(is_deleted));
        }
        if let Some(pending_purge) = patch.pending_purge {
            assignments.push("pending_purge = :pending_purge");
            update = update
                .expression_attribute_values(":pending_purge", AttributeValue::Bool(pending_purge));
        }
        if let Some(updated_at) = &patch.updated_at {
            assignments.push("updated_at = :updated_at");
            update = update
                .expression_attribute_values(":updated_at", AttributeValue::S(updated_at.clone()));
        }

        if assignments.is_empty() {
            return Ok(());
        }

        update
            .update_expression(format!("SET {}", assignments.join(", ")))
            .send()
            .await
            .map_err(|e| {
                error!(image_id = %id, error = ?e, "update_item failed");
                storage_failure("update")
            })?;

        debug!(image_id = %id, "updated metadata record");
        Ok(())
    }

    async fn delete(&self, id: &str, created_at: &str) -> Result<(), AppError> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key("image_id", AttributeValue::S(id.to_string()))
            .key("created_at", AttributeValue::S(created_at.to_string()))
            .send()
            .await
            .map_err(|e| {
                error!(image_id = %id, error = ?e, "delete_item failed");
                storage_failure("delete")
            })?;

        debug!(image_id = %id, "deleted metadata record");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::image::ImageUploadRequest;
    use crate::validation::content::DecodedImage;

    fn sample_record() -> ImageRecord {
        ImageRecord::create_new(
            ImageUploadRequest {
                title: Some("Pier".to_string()),
                description: None,
                tags: Some(vec!["sea".to_string(), "dawn".to_string()]),
                owner_id: "u1".to_string(),
            },
            "pier.jpg".to_string(),
            8192,
            &DecodedImage {
                width: 1024,
                height: 768,
                format: "jpeg".to_string(),
            },
        )
    }

    #[test]
    fn item_round_trips_a_full_record() {
        let record = sample_record();
        let item = record_to_item(&record);
        assert_eq!(item_to_record(&item).unwrap(), record);
    }

    #[test]
    fn tags_are_stored_as_one_comma_joined_attribute() {
        let record = sample_record();
        let item = record_to_item(&record);
        assert_eq!(
            item.get("tags").and_then(|v| v.as_s().ok()).map(String::as_str),
            Some("sea,dawn")
        );
    }

    #[test]
    fn empty_tags_round_trip_to_empty_vec() {
        let mut record = sample_record();
        record.tags = Vec::new();

        let item = record_to_item(&record);
        assert_eq!(item_to_record(&item).unwrap().tags, Vec::<String>::new());
    }

    #[test]
    fn absent_optionals_stay_absent() {
        let mut record = sample_record();
        record.title = None;
        record.updated_at = None;

        let item = record_to_item(&record);
        assert!(!item.contains_key("title"));
        assert!(!item.contains_key("updated_at"));

        let restored = item_to_record(&item).unwrap();
        assert!(restored.title.is_none());
        assert!(restored.updated_at.is_none());
    }

    #[test]
    fn item_missing_required_attribute_is_rejected() {
        let record = sample_record();
        let mut item = record_to_item(&record);
        item.remove("storage_key");

        assert!(item_to_record(&item).is_err());
    }

    #[test]
    fn legacy_item_without_flags_defaults_to_live() {
        let record = sample_record();
        let mut item = record_to_item(&record);
        item.remove("is_deleted");
        item.remove("pending_purge");

        let restored = item_to_record(&item).unwrap();
        assert!(!restored.is_deleted);
        assert!(!restored.pending_purge);
    }

    #[test]
    fn cursor_conversion_round_trips() {
        let cursor = StoreCursor::from([
            ("image_id".to_string(), "abc".to_string()),
            ("created_at".to_string(), "2026-08-08T00:00:00Z".to_string()),
            ("owner_id".to_string(), "u1".to_string()),
        ]);

        assert_eq!(key_to_cursor(&cursor_to_key(&cursor)), cursor);
    }
}
