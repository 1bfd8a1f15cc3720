use std::sync::Arc;

use crate::config::Config;
use crate::image_ops::image_types::OutputFormat;
use crate::openapi::MultipartUpload;
use crate::routes::errors::{CropApiErrorType, CropErrorResponse};
use crate::routes::responses::{ApiError, CropResponse, ok_json};
use crate::store::records::{ImageId, ImageRecord, ImageRecordUpdate};
use aide::transform::TransformOperation;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use log::{debug, info};
use sanitize_filename::sanitize;
use schemars::JsonSchema;
use serde::Deserialize;

#[derive(Deserialize, JsonSchema)]
pub struct ImagePath {
    /// Image identifier.
    pub id: String,
}

#[derive(Deserialize, JsonSchema)]
pub struct SelectionPath {
    /// Image identifier.
    pub id: String,
    /// Ratio slug the selection applies to, e.g. `16x9`.
    pub ratio: String,
}

#[derive(Deserialize, JsonSchema)]
pub struct CropPath {
    /// Image identifier.
    pub id: String,
    /// Ratio slug, e.g. `16x9`, or `original`.
    pub ratio: String,
    /// `{width}.{extension}`, e.g. `200.jpg`.
    pub filename: String,
}

#[derive(Deserialize, JsonSchema)]
pub struct SelectionPayload {
    pub x0: i64,
    pub y0: i64,
    pub x1: i64,
    pub y1: i64,
}

#[derive(Deserialize, JsonSchema)]
pub struct SearchParams {
    pub q: Option<String>,
}

/// Non-numeric ids behave like unknown images, they are not a request error.
fn parse_image_id(raw: &str) -> Result<ImageId, ApiError<CropApiErrorType>> {
    raw.parse().map_err(|_| ApiError {
        status: StatusCode::NOT_FOUND,
        detail: "No such image!".to_string(),
        error_type: Some(CropApiErrorType::NotFound),
    })
}

fn bad_request(detail: String) -> ApiError<CropApiErrorType> {
    ApiError {
        status: StatusCode::BAD_REQUEST,
        detail,
        error_type: Some(CropApiErrorType::Validation),
    }
}

fn bad_crop_name(filename: &str) -> ApiError<CropApiErrorType> {
    bad_request(format!("Expected \"{{width}}.{{ext}}\", got {}", filename))
}

/// Serve a crop at `/images/{id}/{ratio}/{width}.{ext}`.
pub async fn serve_crop(
    Path(path): Path<CropPath>,
    State(state): State<Arc<Config>>,
) -> Result<CropResponse, ApiError<CropApiErrorType>> {
    info!("Getting crop {}/{}/{}", path.id, path.ratio, path.filename);

    let image_id = parse_image_id(&path.id)?;
    let (width, extension) = path
        .filename
        .rsplit_once('.')
        .ok_or_else(|| bad_crop_name(&path.filename))?;
    let width: u32 = width.parse().map_err(|_| bad_crop_name(&path.filename))?;
    let format =
        OutputFormat::from_extension(extension).ok_or_else(|| bad_crop_name(&path.filename))?;

    let crop = state
        .processor
        .resolve_crop(image_id, &path.ratio, width, format)
        .await?;
    debug!("resolved crop for image {}. Generating response", image_id);

    Ok(CropResponse {
        crop,
        max_age: state.client_cache_ttl,
    })
}

pub fn serve_crop_docs(op: TransformOperation) -> TransformOperation {
    op.description("Serve the image cropped to a ratio and resized to a width, from cache when possible.")
}

/// Register an uploaded image: dimensions are probed from the decoded bytes.
pub async fn upload_image(
    State(state): State<Arc<Config>>,
    MultipartUpload(mut multipart): MultipartUpload,
) -> Result<Json<ImageRecord>, ApiError<CropApiErrorType>> {
    let mut name = None;
    let mut credit = None;
    let mut file: Option<(String, Vec<u8>)> = None;

    let bad_body =
        |err: axum::extract::multipart::MultipartError| bad_request(format!("Bad upload: {}", err));
    while let Some(field) = multipart.next_field().await.map_err(bad_body)? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("image") => {
                let filename = sanitize(field.file_name().unwrap_or("image"));
                let data = field.bytes().await.map_err(bad_body)?;
                file = Some((filename, data.to_vec()));
            }
            Some("name") => name = Some(field.text().await.map_err(bad_body)?),
            Some("credit") => credit = Some(field.text().await.map_err(bad_body)?),
            _ => {}
        }
    }

    let (filename, data) = file.ok_or_else(|| bad_request("No image!".to_string()))?;
    info!("Uploading image {}", filename);

    let record = state
        .processor
        .create_image(name, credit, filename, data)
        .await?;
    Ok(Json(record))
}

pub fn upload_image_docs(op: TransformOperation) -> TransformOperation {
    op.description("Upload a source image and create its record.")
}

/// Store an editor selection for one ratio and flush its cached crops.
/// Missing or non-integer coordinates are a bad request, not a 422.
pub async fn update_selection(
    Path(path): Path<SelectionPath>,
    State(state): State<Arc<Config>>,
    payload: Result<Json<SelectionPayload>, JsonRejection>,
) -> Result<Json<CropErrorResponse>, ApiError<CropApiErrorType>> {
    let image_id = parse_image_id(&path.id)?;
    let Json(payload) = payload.map_err(|_| bad_request("Bad selection".to_string()))?;
    info!("Updating selection {} for image {}", path.ratio, image_id);

    state
        .processor
        .update_selection(
            image_id, &path.ratio, payload.x0, payload.y0, payload.x1, payload.y1,
        )
        .await?;
    Ok(ok_json("Selection updated".to_string()))
}

pub fn update_selection_docs(op: TransformOperation) -> TransformOperation {
    op.description("Replace the editor selection for one ratio. Invalid rectangles are rejected.")
}

pub async fn image_detail(
    Path(path): Path<ImagePath>,
    State(state): State<Arc<Config>>,
) -> Result<Json<ImageRecord>, ApiError<CropApiErrorType>> {
    let image_id = parse_image_id(&path.id)?;
    let record = state.processor.get_image(image_id).await?;
    Ok(Json(record))
}

pub fn image_detail_docs(op: TransformOperation) -> TransformOperation {
    op.description("Image metadata by id.")
}

pub async fn patch_image(
    Path(path): Path<ImagePath>,
    State(state): State<Arc<Config>>,
    update: Result<Json<ImageRecordUpdate>, JsonRejection>,
) -> Result<Json<ImageRecord>, ApiError<CropApiErrorType>> {
    let image_id = parse_image_id(&path.id)?;
    let Json(update) = update.map_err(|_| bad_request("Bad request body".to_string()))?;
    info!("Patching image {}", image_id);

    let record = state.processor.update_image(image_id, update).await?;
    Ok(Json(record))
}

pub fn patch_image_docs(op: TransformOperation) -> TransformOperation {
    op.description("Update name, credit or the selections map. Absent fields are left untouched.")
}

pub async fn search_images(
    Query(params): Query<SearchParams>,
    State(state): State<Arc<Config>>,
) -> Result<Json<Vec<ImageRecord>>, ApiError<CropApiErrorType>> {
    let results = match params.q.as_deref().filter(|q| !q.is_empty()) {
        None => Vec::new(),
        Some(query) => state.processor.search_images(query).await?,
    };
    Ok(Json(results))
}

pub fn search_images_docs(op: TransformOperation) -> TransformOperation {
    op.description("Search images by name, at most 20 results.")
}
