mod core;
mod features;
mod modules;
mod shared;

use crate::core::config::Config;
use crate::core::openapi::{ApiDoc, SwaggerInfoModifier};
use crate::core::{database, middleware};
use crate::features::categories::{routes as categories_routes, CategoryService};
use crate::features::items::{routes as items_routes, CatalogQueryService, ItemService};
use crate::modules::storage::{
    import_snapshot, AssetKind, AssetStore, RecordStore, SqliteRecordStore,
};
use axum::middleware::from_fn_with_state;
use axum::Router;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Catalog service: public catalog, downloads and the admin API
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Replace the catalog with a flat-file snapshot (`database.json`) and exit
    #[arg(long, value_name = "PATH")]
    import: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Build Tokio runtime with configurable worker threads
    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .max_blocking_threads(worker_threads * 4)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(worker_threads, args))
}

async fn async_main(worker_threads: usize, args: Args) -> anyhow::Result<()> {
    // Load .env file BEFORE initializing logger so RUST_LOG is available
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!(
        "System info: tokio_worker_threads={}, pid={}",
        worker_threads,
        std::process::id()
    );
    tracing::info!("Configuration loaded successfully");

    // Open the record store; a corrupt file is quarantined and replaced
    let pool = database::create_pool(&config.database).await?;
    let record_store: Arc<dyn RecordStore> = Arc::new(SqliteRecordStore::new(pool));
    tracing::info!("Record store ready at {}", config.database.url);

    if let Some(path) = args.import {
        let report = import_snapshot(record_store.as_ref(), &path)
            .await
            .map_err(|e| anyhow::anyhow!("Import failed: {}", e))?;
        tracing::info!(
            "Import complete ({} categories, {} items); start the server without --import",
            report.categories,
            report.items
        );
        return Ok(());
    }

    // Prepare the asset directories
    let asset_store = Arc::new(AssetStore::new(config.storage.public_root.clone()));
    asset_store
        .ensure_layout()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to prepare asset directories: {}", e))?;
    tracing::info!(
        "Asset store ready at {}",
        asset_store.public_root().display()
    );

    let item_service = Arc::new(ItemService::new(
        Arc::clone(&record_store),
        Arc::clone(&asset_store),
    ));
    let catalog_service = Arc::new(CatalogQueryService::new(Arc::clone(&record_store)));
    let category_service = Arc::new(CategoryService::new(Arc::clone(&record_store)));
    tracing::info!("Catalog services initialized");

    // Build application router with dynamic swagger config
    let swagger_modifier = SwaggerInfoModifier {
        title: config.swagger.title.clone(),
        version: config.swagger.version.clone(),
        description: config.swagger.description.clone(),
    };

    let mut openapi = ApiDoc::openapi();
    swagger_modifier.modify(&mut openapi);
    let swagger =
        Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi));

    // Admin surface (HTTP Basic); only mounted when credentials are configured
    let (admin_routes, swagger) = if let Some(credentials) = config.admin.credentials() {
        let credentials = Arc::new(credentials);
        let admin_routes = Router::new()
            .merge(items_routes::admin_routes(
                Arc::clone(&item_service),
                config.storage.max_upload_size,
            ))
            .merge(categories_routes::admin_routes(Arc::clone(&category_service)))
            .layer(from_fn_with_state(
                Arc::clone(&credentials),
                middleware::admin_auth_middleware,
            ));
        let swagger = swagger.layer(from_fn_with_state(
            credentials,
            middleware::admin_auth_middleware,
        ));
        tracing::info!("Admin routes enabled (HTTP Basic)");
        (admin_routes, swagger)
    } else {
        tracing::warn!(
            "ADMIN_USERNAME/ADMIN_PASSWORD not set; admin routes are disabled and Swagger UI is public"
        );
        (Router::new(), swagger)
    };

    // Simple health check endpoint (no auth required)
    async fn health_check() -> axum::http::StatusCode {
        axum::http::StatusCode::OK
    }
    let health_route = Router::new().route("/health", axum::routing::get(health_check));

    // Public routes (no auth required)
    let public_routes = Router::new()
        .merge(items_routes::routes(
            catalog_service,
            Arc::clone(&item_service),
            config.catalog.items_per_page,
        ))
        .merge(categories_routes::routes(category_service))
        // Images are static; product files only leave through the download route
        .nest_service(
            AssetKind::Image.url_prefix(),
            ServeDir::new(asset_store.dir(AssetKind::Image)),
        );

    let app = Router::new()
        .merge(swagger)
        .merge(admin_routes)
        .merge(public_routes)
        .merge(health_route)
        .layer(middleware::cors_layer(
            config.app.cors_allowed_origins.clone(),
        ))
        // Propagate X-Request-Id to response headers
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(middleware::MakeSpanWithRequestId)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Generate X-Request-Id using UUID v7 (or use client-provided one)
        .layer(SetRequestIdLayer::x_request_id(middleware::MakeRequestUuid));

    // Start server
    let addr = config.app.server_address();
    let socket_addr: std::net::SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

    // Use socket2 for TCP listener configuration
    let socket = socket2::Socket::new(
        socket2::Domain::for_address(socket_addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nodelay(true)?;

    #[cfg(target_os = "linux")]
    {
        let keepalive = socket2::TcpKeepalive::new()
            .with_time(std::time::Duration::from_secs(60))
            .with_interval(std::time::Duration::from_secs(10))
            .with_retries(3);
        socket.set_tcp_keepalive(&keepalive)?;
    }
    #[cfg(not(target_os = "linux"))]
    {
        let keepalive = socket2::TcpKeepalive::new().with_time(std::time::Duration::from_secs(60));
        socket.set_tcp_keepalive(&keepalive)?;
    }

    socket.set_nonblocking(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(1024)?;

    let listener = tokio::net::TcpListener::from_std(socket.into())?;
    tracing::info!("Server listening on {}", format!("http://{}", addr));
    tracing::info!(
        "Swagger UI available at {}",
        format!("http://{}/swagger-ui/", addr)
    );

    axum::serve(listener, app).await?;

    Ok(())
}
