use anyhow::{Context, Result};
use std::{io::ErrorKind, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use video_catalog::{
    build_router,
    config::{AppConfig, StorageBackend},
    db,
    services::{
        local_storage::LocalStorage, object_storage::ObjectStorage, s3_storage::S3Storage,
        video_repository::SqliteVideoRepository, video_service::VideoService,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Parse config + migrate flag ---
    let (cfg, migrate) = AppConfig::from_env_and_args()?;

    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting video-catalog with config: {:?}", cfg);

    // --- Metadata repository ---
    let pool = db::connect(&cfg.database_url).await?;
    db::run_migrations(&pool).await?;
    if migrate {
        tracing::info!("Database migration complete.");
        pool.close().await;
        return Ok(()); // exit after migration
    }

    // --- Object storage ---
    let storage: Arc<dyn ObjectStorage> = match cfg.storage_backend {
        StorageBackend::S3 => Arc::new(S3Storage::new(cfg.s3_settings())?),
        StorageBackend::Local => Arc::new(
            LocalStorage::new(&cfg.local_storage_dir, cfg.local_base_url.clone()).await?,
        ),
    };
    storage
        .head_bucket()
        .await
        .with_context(|| format!("object store bucket `{}` is not reachable", storage.bucket()))?;
    tracing::info!(bucket = %storage.bucket(), "Object store reachable");

    // --- Initialize core service ---
    let repository = Arc::new(SqliteVideoRepository::new(pool.clone()));
    let service = VideoService::new(storage, repository);

    // --- Build router ---
    let app = build_router(service, cfg.max_upload_bytes);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // --- Teardown ---
    pool.close().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        _ = terminate => tracing::info!("Received terminate signal"),
    }

    tracing::info!("Shutting down gracefully...");
}
