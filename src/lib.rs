mod domain;
mod infrastructure;
mod interfaces;
pub mod constants;
pub mod errors;
pub mod graceful_shutdown;
pub mod settings;

pub use domain::{entities, pagination, use_cases, validation};
pub use infrastructure::aws;
pub use interfaces::{handlers, repositories, routes};

use aws::{dynamodb::DynamoMetadataStore, s3::S3BlobStore};
use settings::AppConfig;
use use_cases::{lifecycle::LifecycleHandler, query::QueryHandler, upload::UploadHandler};

pub type AppUploadHandler = UploadHandler<S3BlobStore, DynamoMetadataStore>;
pub type AppQueryHandler = QueryHandler<S3BlobStore, DynamoMetadataStore>;
pub type AppLifecycleHandler = LifecycleHandler<DynamoMetadataStore>;

/// Process-wide dependency container. The two storage gateways are built
/// once at startup and handed to the orchestrators here; nothing holds a
/// hidden global client.
pub struct AppState {
    pub upload_handler: AppUploadHandler,
    pub query_handler: AppQueryHandler,
    pub lifecycle_handler: AppLifecycleHandler,
    pub metadata_store: DynamoMetadataStore,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        blob_store: S3BlobStore,
        metadata_store: DynamoMetadataStore,
    ) -> Self {
        AppState {
            upload_handler: UploadHandler::new(blob_store.clone(), metadata_store.clone()),
            query_handler: QueryHandler::new(
                blob_store,
                metadata_store.clone(),
                config.presign_ttl_secs,
            ),
            lifecycle_handler: LifecycleHandler::new(metadata_store.clone()),
            metadata_store,
        }
    }
}
