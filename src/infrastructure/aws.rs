use aws_config::{BehaviorVersion, Region, SdkConfig};

use crate::settings::AppConfig;

pub mod dynamodb;
pub mod s3;

/// Shared SDK configuration for both storage clients. A custom endpoint
/// (LocalStack, MinIO-compatible stores) overrides the regional default.
pub async fn sdk_config(config: &AppConfig) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.aws_region.clone()));

    if let Some(endpoint) = &config.aws_endpoint_url {
        loader = loader.endpoint_url(endpoint);
    }

    loader.load().await
}
