use schemars::JsonSchema;
use serde::Serialize;

/// Wire form of the crop error taxonomy.
#[derive(Debug, Serialize, JsonSchema, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum CropApiErrorType {
    Validation,
    UnknownRatio,
    InvalidSelection,
    NotFound,
    Decode,
    Storage,
}

#[derive(Debug, Serialize, JsonSchema)]
#[schemars(bound = "T: JsonSchema")]
#[serde(bound = "T: Serialize")]
pub struct ErrorResponse<T> {
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<T>,
}

pub type CropErrorResponse = ErrorResponse<CropApiErrorType>;
