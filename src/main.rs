use actix_cors::Cors;
use actix_web::{middleware::NormalizePath, web, App, HttpServer};
use imagehost_backend::{
    aws::{dynamodb::DynamoMetadataStore, s3::S3BlobStore},
    graceful_shutdown::shutdown_signal,
    routes::configure_routes,
    settings::AppConfig,
    AppState,
};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match AppConfig::new() {
        Ok(cfg) => {
            tracing::info!("Loaded configuration: {:?}", cfg);
            cfg
        }
        Err(e) => {
            tracing::error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let blob_store = S3BlobStore::new(&config).await;
    let metadata_store = match DynamoMetadataStore::new(&config).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Metadata store initialization failed: {}", e);
            std::process::exit(1);
        }
    };

    let app_state = web::Data::new(AppState::new(&config, blob_store, metadata_store));

    let server_addr = format!("{}:{}", config.host, config.port);

    tracing::info!(
        "🚀 Starting {} v{} on {}",
        config.name,
        env!("CARGO_PKG_VERSION"),
        server_addr
    );

    let cors_origins = config.cors_origins();

    let server = HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "DELETE"])
            .allow_any_header()
            .max_age(3600);
        for origin in &cors_origins {
            cors = if origin == "*" {
                cors.allow_any_origin()
            } else {
                cors.allowed_origin(origin)
            };
        }

        App::new()
            .app_data(app_state.clone())
            .wrap(NormalizePath::trim())
            .wrap(TracingLogger::default())
            .wrap(cors)
            .configure(configure_routes)
    })
    .workers(config.worker_count)
    .bind(server_addr)?
    .run();

    tokio::select! {
        res = server => res,
        _ = shutdown_signal() => Ok(()),
    }
}
