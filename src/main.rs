mod config;
mod flush;
mod geometry;
mod image_ops;
mod openapi;
mod processing;
mod routes;
mod store;
mod utils;

use crate::config::Config;
use crate::store::persistent_store::PersistFlusher;
use crate::utils::background::spawn_background;
use aide::axum::ApiRouter;
use aide::axum::routing::{get_with, post_with};
use aide::openapi::OpenApi;
use aide::swagger::Swagger;
use axum::Extension;
use axum::routing::get;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::prelude::__tracing_subscriber_SubscriberExt;
use tracing_subscriber::registry;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() {
    registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=debug", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env());
    if let Some(store) = config.persistent_store.clone() {
        spawn_background(PersistFlusher::new(store));
    }

    let mut api = OpenApi::default();
    let mut app = ApiRouter::new()
        .api_route(
            "/images",
            post_with(routes::images::upload_image, routes::images::upload_image_docs),
        )
        .api_route(
            "/images/search",
            get_with(routes::images::search_images, routes::images::search_images_docs),
        )
        .api_route(
            "/images/{id}",
            get_with(routes::images::image_detail, routes::images::image_detail_docs)
                .patch_with(routes::images::patch_image, routes::images::patch_image_docs),
        )
        .api_route(
            "/images/{id}/selections/{ratio}",
            post_with(
                routes::images::update_selection,
                routes::images::update_selection_docs,
            ),
        )
        .api_route(
            "/images/{id}/{ratio}/{filename}",
            get_with(routes::images::serve_crop, routes::images::serve_crop_docs),
        );

    if config.enable_docs {
        app = app
            .route("/docs/openapi.json", get(routes::openapi::openapi_json))
            .route("/docs", get(Swagger::new("/docs/openapi.json").axum_handler()));
    }

    let addr = format!("{}:{}", config.host, config.port);
    let persistent_store = config.persistent_store.clone();
    let router = app
        .finish_api(&mut api)
        .layer(Extension(Arc::new(api)))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(60)))
        .with_state(config);

    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    if let Some(store) = persistent_store {
        info!("Flushing stores before exit");
        if let Err(err) = store.persist() {
            warn!("Failed to flush data to disk, got error: {}", err)
        }
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
}
