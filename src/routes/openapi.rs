use aide::openapi::OpenApi;
use axum::Extension;
use axum::http::header;
use axum::response::IntoResponse;
use std::sync::Arc;

/// Serve the schema the router finished at startup.
pub async fn openapi_json(Extension(api): Extension<Arc<OpenApi>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/json")],
        serde_json::to_string(api.as_ref()).expect("generated schema serializes"),
    )
}
