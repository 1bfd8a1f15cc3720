use crate::image_ops::image_types::MimeType;
use crate::processing::{CropError, CropErrorType};
use crate::routes::errors::{CropApiErrorType, ErrorResponse};
use crate::store::crop_cache::CachedCrop;
use aide::OperationOutput;
use aide::generate::GenContext;
use aide::openapi::{MediaType, Operation, Response as OpenApiResponse};
use axum::Json;
use axum::body::Body;
use axum::response::IntoResponse;
use http::{Response, StatusCode, header};
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// JSON error reply, its HTTP status paired with the wire error type.
pub(crate) struct ApiError<T> {
    pub status: StatusCode,
    pub detail: String,
    pub error_type: Option<T>,
}

impl<T: Serialize> IntoResponse for ApiError<T> {
    fn into_response(self) -> axum::response::Response {
        let payload = ErrorResponse {
            detail: self.detail,
            error_type: self.error_type,
        };
        (self.status, Json(payload)).into_response()
    }
}

impl<T> OperationOutput for ApiError<T> {
    type Inner = ();

    fn operation_response(
        _ctx: &mut GenContext,
        _operation: &mut Operation,
    ) -> Option<OpenApiResponse> {
        None
    }

    fn inferred_responses(
        _ctx: &mut GenContext,
        _operation: &mut Operation,
    ) -> Vec<(Option<u16>, OpenApiResponse)> {
        Vec::new()
    }
}

impl From<CropError> for ApiError<CropApiErrorType> {
    fn from(err: CropError) -> Self {
        let (status, error_type) = match err.err_type {
            CropErrorType::Validation => (StatusCode::BAD_REQUEST, CropApiErrorType::Validation),
            CropErrorType::UnknownRatio => {
                (StatusCode::BAD_REQUEST, CropApiErrorType::UnknownRatio)
            }
            CropErrorType::InvalidSelection => {
                (StatusCode::BAD_REQUEST, CropApiErrorType::InvalidSelection)
            }
            CropErrorType::NotFound => (StatusCode::NOT_FOUND, CropApiErrorType::NotFound),
            CropErrorType::Decode => (StatusCode::INTERNAL_SERVER_ERROR, CropApiErrorType::Decode),
            CropErrorType::Storage => {
                (StatusCode::INTERNAL_SERVER_ERROR, CropApiErrorType::Storage)
            }
        };
        ApiError {
            status,
            detail: err.detail,
            error_type: Some(error_type),
        }
    }
}

/// A rendered crop plus the client caching policy it is served under. Crops
/// are immutable until the selection changes, so the max age is long.
pub(crate) struct CropResponse {
    pub crop: Arc<CachedCrop>,
    pub max_age: usize,
}

impl IntoResponse for CropResponse {
    fn into_response(self) -> axum::response::Response {
        let expires = SystemTime::now() + Duration::from_secs(self.max_age as u64);
        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, self.crop.format.mime_type())
            .header(
                header::CACHE_CONTROL,
                format!("public, max-age={}", self.max_age),
            )
            .header(header::EXPIRES, httpdate::fmt_http_date(expires))
            .body(Body::from(self.crop.data.clone()))
            .unwrap()
    }
}

impl OperationOutput for CropResponse {
    type Inner = ();

    fn operation_response(
        _ctx: &mut GenContext,
        _operation: &mut Operation,
    ) -> Option<OpenApiResponse> {
        Some(OpenApiResponse {
            description: "Binary crop response.".to_string(),
            content: IndexMap::from_iter([(
                "image/*".to_string(),
                MediaType {
                    schema: None,
                    ..Default::default()
                },
            )]),
            ..Default::default()
        })
    }

    fn inferred_responses(
        _ctx: &mut GenContext,
        _operation: &mut Operation,
    ) -> Vec<(Option<u16>, OpenApiResponse)> {
        Vec::new()
    }
}

pub fn ok_json<T>(detail: String) -> Json<ErrorResponse<T>> {
    Json(ErrorResponse {
        detail,
        error_type: None,
    })
}
